use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Canonical support ticket, independent of the source column layout.
///
/// Every field is a plain string and defaults to empty. Dates and numbers are
/// kept textual and parsed at the point of use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    pub status: String,
    pub priority: String,
    pub title: String,
    pub description: String,
    pub requester: String,
    pub assignee: String,
    pub department: String,
    /// Mean time to resolve, minutes. May use a comma decimal separator.
    pub tma: String,
    /// First response time, minutes.
    pub frt: String,
    pub satisfaction: String,
    /// Original header -> value mapping. Empty for positional sources.
    #[serde(default)]
    pub raw: HashMap<String, String>,
}

impl TicketRecord {
    /// Value of a field, or the empty string when it is absent.
    pub fn field(&self, field: &TicketField) -> &str {
        match field {
            TicketField::Id => &self.id,
            TicketField::CreatedAt => &self.created_at,
            TicketField::UpdatedAt => &self.updated_at,
            TicketField::Status => &self.status,
            TicketField::Priority => &self.priority,
            TicketField::Title => &self.title,
            TicketField::Description => &self.description,
            TicketField::Requester => &self.requester,
            TicketField::Assignee => &self.assignee,
            TicketField::Department => &self.department,
            TicketField::Tma => &self.tma,
            TicketField::Frt => &self.frt,
            TicketField::Satisfaction => &self.satisfaction,
            TicketField::Raw(name) => self.raw.get(name).map(String::as_str).unwrap_or(""),
        }
    }
}

/// Addressable ticket field. `Raw` looks the name up in the original row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketField {
    Id,
    CreatedAt,
    UpdatedAt,
    Status,
    Priority,
    Title,
    Description,
    Requester,
    Assignee,
    Department,
    Tma,
    Frt,
    Satisfaction,
    Raw(String),
}

impl TicketField {
    /// Resolve a field name. Unknown names address the raw row.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "id" => Self::Id,
            "created_at" | "createdat" => Self::CreatedAt,
            "updated_at" | "updatedat" => Self::UpdatedAt,
            "status" => Self::Status,
            "priority" => Self::Priority,
            "title" => Self::Title,
            "description" => Self::Description,
            "requester" => Self::Requester,
            "assignee" => Self::Assignee,
            "department" => Self::Department,
            "tma" => Self::Tma,
            "frt" => Self::Frt,
            "satisfaction" => Self::Satisfaction,
            _ => Self::Raw(name.to_string()),
        }
    }
}

/// Inclusive date window extracted from a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalWindow {
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
}

impl TemporalWindow {
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        at >= self.from && at <= self.to
    }
}

/// Coarse status bucket for free-text status values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusBucket {
    Open,
    InProgress,
    Closed,
}

impl StatusBucket {
    pub fn classify(status: &str) -> Option<Self> {
        let s = status.trim().to_lowercase();
        if s.contains("fechado") || s.contains("closed") {
            Some(Self::Closed)
        } else if s.contains("andamento") || s.contains("progress") {
            Some(Self::InProgress)
        } else if s.contains("aberto") || s.contains("open") {
            Some(Self::Open)
        } else {
            None
        }
    }
}

/// Coarse priority bucket for free-text priority values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriorityBucket {
    Low,
    Medium,
    High,
    Urgent,
}

impl PriorityBucket {
    pub fn classify(priority: &str) -> Option<Self> {
        match priority.trim().to_lowercase().as_str() {
            "baixa" | "low" => Some(Self::Low),
            "média" | "media" | "medium" => Some(Self::Medium),
            "alta" | "high" => Some(Self::High),
            "urgente" | "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}
