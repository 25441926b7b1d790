//! Versioned ticket snapshots.
//!
//! Readers always see one complete snapshot. Every refresh takes a sequence
//! number before fetching; its result is installed only if that number is
//! newer than the installed version, so a slow refresh can never overwrite
//! a later one.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::TicketSource;
use crate::error::SourceError;
use crate::processing::{RowLayout, RowNormalizer};
use crate::types::TicketRecord;

#[derive(Debug, Clone)]
pub struct TicketSnapshot {
    /// Sequence number of the refresh that produced this snapshot; 0 before
    /// the first successful load.
    pub version: u64,
    pub records: Vec<TicketRecord>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl TicketSnapshot {
    fn empty() -> Self {
        Self { version: 0, records: Vec::new(), fetched_at: None }
    }
}

pub struct TicketStore {
    current: RwLock<Arc<TicketSnapshot>>,
    next_seq: AtomicU64,
    last_error: RwLock<Option<String>>,
    normalizer: Box<dyn RowNormalizer>,
}

impl TicketStore {
    pub fn new(layout: RowLayout) -> Self {
        Self {
            current: RwLock::new(Arc::new(TicketSnapshot::empty())),
            next_seq: AtomicU64::new(1),
            last_error: RwLock::new(None),
            normalizer: layout.normalizer(),
        }
    }

    /// Current snapshot. Cheap; holds no lock after returning.
    pub fn snapshot(&self) -> Arc<TicketSnapshot> {
        self.current.read().clone()
    }

    /// Message of the most recent failed refresh, cleared on success.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn begin(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst)
    }

    /// Install `records` as version `seq` unless a newer snapshot is
    /// already in place. Returns whether it was installed.
    fn install(&self, seq: u64, records: Vec<TicketRecord>) -> bool {
        let mut current = self.current.write();
        if seq <= current.version {
            return false;
        }
        *current = Arc::new(TicketSnapshot {
            version: seq,
            records,
            fetched_at: Some(Utc::now()),
        });
        true
    }

    /// Fetch and normalize from `source`, then install the result.
    ///
    /// On failure the previous snapshot stays in place and the error is
    /// recorded, unless a newer refresh has already been installed. Returns the snapshot visible after this refresh, which is
    /// a newer one when this result arrived stale.
    pub async fn refresh(&self, source: &dyn TicketSource) -> Result<Arc<TicketSnapshot>, SourceError> {
        let seq = self.begin();
        let rows = match source.fetch_rows().await {
            Ok(rows) => rows,
            Err(e) => {
                if seq > self.current.read().version {
                    tracing::warn!(source = %source.describe(), seq, error = %e, "Ticket refresh failed");
                    *self.last_error.write() = Some(e.to_string());
                } else {
                    tracing::debug!(seq, error = %e, "Stale refresh failed after a newer one succeeded");
                }
                return Err(e);
            }
        };

        let records = self.normalizer.normalize(&rows);
        let count = records.len();
        if self.install(seq, records) {
            *self.last_error.write() = None;
            tracing::info!(source = %source.describe(), seq, records = count, "Tickets refreshed");
        } else {
            tracing::debug!(seq, "Discarding stale refresh result");
        }
        Ok(self.snapshot())
    }
}

/// Refresh `store` from `source` every `interval` until the handle is aborted.
/// The first refresh runs one interval after spawning; callers load the
/// initial snapshot themselves.
pub fn spawn_auto_refresh(
    store: Arc<TicketStore>,
    source: Arc<dyn TicketSource>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            // Failures are already logged and recorded on the store.
            let _ = store.refresh(source.as_ref()).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;

    struct StaticSource {
        rows: Vec<Vec<String>>,
        delay: Duration,
    }

    impl StaticSource {
        fn with_id(id: &str, delay_ms: u64) -> Self {
            Self {
                rows: vec![vec![id.to_string(), String::new(), String::new(), "Aberto".to_string()]],
                delay: Duration::from_millis(delay_ms),
            }
        }
    }

    #[async_trait]
    impl TicketSource for StaticSource {
        async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SourceError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.rows.clone())
        }

        fn describe(&self) -> String {
            "static".to_string()
        }
    }

    struct FailingSource {
        delay: Duration,
    }

    #[async_trait]
    impl TicketSource for FailingSource {
        async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SourceError> {
            tokio::time::sleep(self.delay).await;
            Err(SourceError::Transport {
                endpoint: "sheet".to_string(),
                message: "timed out".to_string(),
            })
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    /// Succeeds once, then fails.
    struct FlakySource {
        calls: AtomicU32,
    }

    #[async_trait]
    impl TicketSource for FlakySource {
        async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SourceError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(vec![vec!["42".to_string()]])
            } else {
                Err(SourceError::Status { status: 503, body: "unavailable".to_string() })
            }
        }

        fn describe(&self) -> String {
            "flaky".to_string()
        }
    }

    #[tokio::test]
    async fn test_refresh_installs_snapshot() {
        let store = TicketStore::new(RowLayout::Positional);
        assert_eq!(store.snapshot().version, 0);
        assert!(store.snapshot().fetched_at.is_none());

        let snapshot = store.refresh(&StaticSource::with_id("7", 0)).await.unwrap();
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].id, "7");
        assert_eq!(snapshot.records[0].status, "Aberto");
        assert!(snapshot.fetched_at.is_some());
    }

    #[tokio::test]
    async fn test_stale_refresh_is_discarded() {
        let store = TicketStore::new(RowLayout::Positional);
        let slow = StaticSource::with_id("old", 80);
        let fast = StaticSource::with_id("new", 0);

        let (slow_result, fast_result) = tokio::join!(store.refresh(&slow), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            store.refresh(&fast).await
        });

        assert_eq!(fast_result.unwrap().version, 2);
        // The slow refresh started first and finished last; it must not win.
        let after_slow = slow_result.unwrap();
        assert_eq!(after_slow.version, 2);
        assert_eq!(after_slow.records[0].id, "new");
        assert_eq!(store.snapshot().records[0].id, "new");
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let store = TicketStore::new(RowLayout::Positional);
        let source = FlakySource { calls: AtomicU32::new(0) };

        store.refresh(&source).await.unwrap();
        assert!(store.last_error().is_none());

        let err = store.refresh(&source).await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 503, .. }));
        assert_eq!(store.snapshot().records[0].id, "42");
        assert_eq!(store.snapshot().version, 1);
        assert!(store.last_error().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_install_rejects_older_versions() {
        let store = TicketStore::new(RowLayout::Positional);
        assert!(store.install(3, Vec::new()));
        assert!(!store.install(2, vec![TicketRecord::default()]));
        assert!(!store.install(3, vec![TicketRecord::default()]));
        assert!(store.snapshot().records.is_empty());
    }

    #[tokio::test]
    async fn test_stale_failure_does_not_set_last_error() {
        let store = TicketStore::new(RowLayout::Positional);
        let slow = FailingSource { delay: Duration::from_millis(80) };
        let fast = StaticSource::with_id("new", 0);

        let (slow_result, fast_result) = tokio::join!(store.refresh(&slow), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            store.refresh(&fast).await
        });

        assert!(fast_result.is_ok());
        assert!(matches!(slow_result, Err(SourceError::Transport { .. })));
        assert!(store.last_error().is_none());
        assert_eq!(store.snapshot().records[0].id, "new");
    }

    #[tokio::test]
    async fn test_auto_refresh_waits_one_interval() {
        let store = Arc::new(TicketStore::new(RowLayout::Positional));
        let source: Arc<dyn TicketSource> = Arc::new(StaticSource::with_id("1", 0));
        let handle = spawn_auto_refresh(store.clone(), source, Duration::from_millis(150));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.snapshot().version, 0);

        for _ in 0..100 {
            if store.snapshot().version > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();
        assert_eq!(store.snapshot().version, 1);
    }
}
