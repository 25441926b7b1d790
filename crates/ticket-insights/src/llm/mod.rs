//! LLM Module - remote text generation behind a provider trait
//! Supports the Google Gemini API; tests plug in their own providers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmSettings;
use crate::error::GatewayError;

pub mod analysis;
pub mod external;

pub use analysis::{analysis_prompt, analyze_tickets, parse_analysis, TicketAnalysis};
pub use external::{GeminiProvider, ModelDescriptor};

/// Core trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion. An empty completion is an error, never `Ok("")`.
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, GatewayError>;

    /// Get provider info
    fn info(&self) -> ProviderInfo;
}

/// Generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.7,
            top_p: 0.95,
            top_k: 40,
        }
    }
}

impl From<&LlmSettings> for GenerationConfig {
    fn from(settings: &LlmSettings) -> Self {
        Self {
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    pub model: String,
}
