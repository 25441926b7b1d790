//! Ticket data sources and the shared snapshot store.

use async_trait::async_trait;

use crate::error::SourceError;

pub mod sheets;
pub mod ticket_store;

pub use sheets::SheetsSource;
pub use ticket_store::{spawn_auto_refresh, TicketSnapshot, TicketStore};

/// Anything that yields raw rows of ticket cells.
#[async_trait]
pub trait TicketSource: Send + Sync {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SourceError>;

    /// Short human-readable label for logs.
    fn describe(&self) -> String;
}
