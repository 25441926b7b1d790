//! Pure aggregate functions over a ticket collection.
//!
//! Nothing here fails: unparsable dates and numbers are excluded from the
//! metric being computed and never reported upward.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::dates::{parse_minutes, parse_ticket_date};
use crate::types::{PriorityBucket, StatusBucket, TicketField, TicketRecord};

/// Bucket key used for empty field values.
pub const UNKNOWN_BUCKET: &str = "Unknown";

/// Count records per distinct value of `field`. Empty values count as `"Unknown"`.
pub fn count_by_field(records: &[TicketRecord], field: &TicketField) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        let value = record.field(field);
        let key = if value.is_empty() { UNKNOWN_BUCKET } else { value };
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }
    counts
}

pub fn status_counts(records: &[TicketRecord]) -> BTreeMap<String, usize> {
    count_by_field(records, &TicketField::Status)
}

pub fn priority_counts(records: &[TicketRecord]) -> BTreeMap<String, usize> {
    count_by_field(records, &TicketField::Priority)
}

/// Per-calendar-month mean of a numeric field, January first.
///
/// Records with an unparsable date are skipped entirely; records with an
/// unparsable number are skipped for this metric only. Means are rounded to
/// one decimal and empty months are `0.0`.
pub fn monthly_average(
    records: &[TicketRecord],
    date_field: &TicketField,
    numeric_field: &TicketField,
) -> [f64; 12] {
    use chrono::Datelike;

    let mut sums = [0.0_f64; 12];
    let mut counts = [0_usize; 12];

    for record in records {
        let Some(date) = parse_ticket_date(record.field(date_field)) else {
            continue;
        };
        let Some(value) = parse_minutes(record.field(numeric_field)) else {
            continue;
        };
        let month = date.month0() as usize;
        sums[month] += value;
        counts[month] += 1;
    }

    let mut averages = [0.0_f64; 12];
    for month in 0..12 {
        if counts[month] > 0 {
            averages[month] = (sums[month] / counts[month] as f64 * 10.0).round() / 10.0;
        }
    }
    averages
}

/// Most recently updated records first, at most `limit` of them.
///
/// The sort is stable; records with an unparsable `updated_at` rank last.
pub fn recent_activity(records: &[TicketRecord], limit: usize) -> Vec<&TicketRecord> {
    let mut keyed: Vec<_> = records
        .iter()
        .map(|r| (parse_ticket_date(&r.updated_at), r))
        .collect();
    // None < Some(_), so a descending sort leaves unparsable dates at the end
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    keyed.into_iter().take(limit).map(|(_, r)| r).collect()
}

/// Headline numbers for the overview cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub closed: usize,
}

impl DashboardStats {
    pub fn from_records(records: &[TicketRecord]) -> Self {
        let mut stats = Self {
            total: records.len(),
            ..Self::default()
        };
        for record in records {
            match StatusBucket::classify(&record.status) {
                Some(StatusBucket::Open) => stats.open += 1,
                Some(StatusBucket::InProgress) => stats.in_progress += 1,
                Some(StatusBucket::Closed) => stats.closed += 1,
                None => {}
            }
        }
        stats
    }
}

/// Status and priority bucket tallies for a record set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketCounts {
    pub open: usize,
    pub in_progress: usize,
    pub closed: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl BucketCounts {
    pub fn tally<'a>(records: impl IntoIterator<Item = &'a TicketRecord>) -> Self {
        let mut counts = Self::default();
        for record in records {
            match StatusBucket::classify(&record.status) {
                Some(StatusBucket::Open) => counts.open += 1,
                Some(StatusBucket::InProgress) => counts.in_progress += 1,
                Some(StatusBucket::Closed) => counts.closed += 1,
                None => {}
            }
            match PriorityBucket::classify(&record.priority) {
                Some(PriorityBucket::High) => counts.high += 1,
                Some(PriorityBucket::Medium) => counts.medium += 1,
                Some(PriorityBucket::Low) => counts.low += 1,
                _ => {}
            }
        }
        counts
    }
}

/// Status a ticket with a blank status is listed under.
pub const DEFAULT_STATUS: &str = "Aberto";
/// Priority a ticket with a blank priority is listed under.
pub const DEFAULT_PRIORITY: &str = "Média";

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}

/// Ticket list filter: exact matches on status, priority and assignee plus a
/// free-text query over title, description, requester and assignee. Blank
/// status and priority compare as [`DEFAULT_STATUS`] and [`DEFAULT_PRIORITY`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketFilter {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub query: Option<String>,
}

impl TicketFilter {
    pub fn matches(&self, record: &TicketRecord) -> bool {
        let exact = |wanted: &Option<String>, value: &str| {
            wanted.as_deref().map_or(true, |w| w.is_empty() || w == value)
        };
        let status = or_default(&record.status, DEFAULT_STATUS);
        let priority = or_default(&record.priority, DEFAULT_PRIORITY);
        if !exact(&self.status, status)
            || !exact(&self.priority, priority)
            || !exact(&self.assignee, &record.assignee)
        {
            return false;
        }

        match self.query.as_deref().map(str::to_lowercase) {
            Some(q) if !q.is_empty() => [
                &record.title,
                &record.description,
                &record.requester,
                &record.assignee,
            ]
            .iter()
            .any(|text| text.to_lowercase().contains(&q)),
            _ => true,
        }
    }

    pub fn apply<'a>(&self, records: &'a [TicketRecord]) -> Vec<&'a TicketRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Distinct non-empty assignees, sorted.
pub fn distinct_assignees(records: &[TicketRecord]) -> Vec<String> {
    records
        .iter()
        .filter(|r| !r.assignee.is_empty())
        .map(|r| r.assignee.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
