pub mod analytics;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod processing;
pub mod query;
pub mod storage;
pub mod types;

// Re-export primary types for convenience
pub use config::{InsightsConfig, LlmSettings, RefreshConfig, SheetsConfig};
pub use error::{ConfigError, GatewayError, SourceError};
pub use types::{PriorityBucket, StatusBucket, TemporalWindow, TicketField, TicketRecord};

pub use analytics::{BucketCounts, DashboardStats, TicketFilter};
pub use chat::{AnswerOrchestrator, ChatMessage, ChatSession, Sender};
pub use llm::{GeminiProvider, GenerationConfig, LLMProvider, ProviderInfo, TicketAnalysis};
pub use processing::{FileSource, RowLayout, RowNormalizer};
pub use query::{answer_locally, detect_period};
pub use storage::{SheetsSource, TicketSnapshot, TicketSource, TicketStore};

// Re-export common types
pub use anyhow::{Error, Result};
pub use uuid::Uuid;
