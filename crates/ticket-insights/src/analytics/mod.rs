//! Dashboard analytics: grouped counts, monthly averages and recency.

pub mod aggregator;
pub mod dates;

pub use aggregator::{
    count_by_field, distinct_assignees, monthly_average, priority_counts, recent_activity,
    status_counts, BucketCounts, DashboardStats, TicketFilter, DEFAULT_PRIORITY, DEFAULT_STATUS,
    UNKNOWN_BUCKET,
};
pub use dates::{parse_br_date, parse_generic_date, parse_minutes, parse_ticket_date};
