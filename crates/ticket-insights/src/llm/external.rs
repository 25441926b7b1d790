//! Google Gemini provider
//! Text generation plus model discovery over the public REST API

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::LazyLock;
use std::time::Duration;

use super::{GenerationConfig, LLMProvider, ProviderInfo};
use crate::config::LlmSettings;
use crate::error::GatewayError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1";

static MODEL_UNAVAILABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)not found|NOT_FOUND|is not supported").expect("model-unavailable regex is valid")
});

/// External Gemini provider
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiProvider {
    /// Create a provider for a fixed model.
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| GatewayError::Transport {
                endpoint: DEFAULT_BASE_URL.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        })
    }

    /// Build from settings. A pinned model skips discovery; otherwise the
    /// first preferred model the key can use is selected.
    ///
    /// Returns `Ok(None)` when no api key is configured.
    pub async fn from_settings(settings: &LlmSettings) -> Result<Option<Self>, GatewayError> {
        let Some(api_key) = settings.api_key.clone().filter(|k| !k.trim().is_empty()) else {
            return Ok(None);
        };
        let timeout = Duration::from_secs(settings.request_timeout_secs);
        let mut provider = Self::new(api_key, settings.fallback_model.clone(), timeout)?;

        provider.model = match &settings.model {
            Some(pinned) => pinned.clone(),
            None => {
                provider
                    .pick_model(&settings.preferred_models, &settings.fallback_model)
                    .await
            }
        };
        Ok(Some(provider))
    }

    /// Point requests at a different API root (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn models_endpoint(&self) -> String {
        format!("{}/models", self.base_url)
    }

    /// Parse a response body as JSON, returning a clear error if the server returned HTML.
    async fn parse_json_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        endpoint: &str,
    ) -> Result<T, GatewayError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| GatewayError::Transport {
            endpoint: endpoint.to_string(),
            message: format!("failed to read response body: {}", e),
        })?;
        let trimmed = body.trim_start();
        if trimmed.starts_with('<') {
            let preview: String = trimmed.chars().take(200).collect();
            return Err(GatewayError::Parse(format!(
                "{} returned HTML instead of JSON (HTTP {}): {}",
                endpoint, status, preview
            )));
        }
        serde_json::from_str::<T>(&body).map_err(|e| {
            let preview: String = body.chars().take(300).collect();
            GatewayError::Parse(format!(
                "invalid JSON from {} (HTTP {}): {}. Body: {}",
                endpoint, status, e, preview
            ))
        })
    }

    fn transport_error(endpoint: &str, e: reqwest::Error) -> GatewayError {
        let message = if e.is_timeout() {
            "request timed out".to_string()
        } else if e.is_connect() {
            format!("connection failed: {}", e)
        } else {
            e.to_string()
        };
        GatewayError::Transport {
            endpoint: endpoint.to_string(),
            message,
        }
    }

    /// List models visible to this key.
    pub async fn list_models(&self) -> Result<Vec<ModelDescriptor>, GatewayError> {
        let endpoint = self.models_endpoint();
        let response = self
            .client
            .get(&endpoint)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| Self::transport_error(&endpoint, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status { status, body });
        }

        let listing: ModelListResponse = Self::parse_json_response(response, &endpoint).await?;
        Ok(listing.models)
    }

    /// First preferred model that supports `generateContent`, else `fallback`.
    pub async fn pick_model(&self, preferred: &[String], fallback: &str) -> String {
        match self.list_models().await {
            Ok(models) => select_model(&models, preferred).unwrap_or_else(|| fallback.to_string()),
            Err(e) => {
                tracing::debug!(error = %e, "Model discovery failed, using fallback model");
                fallback.to_string()
            }
        }
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, GatewayError> {
        let endpoint = self.generate_endpoint();
        let request = json!({
            "contents": [{
                "parts": [{"text": prompt}]
            }],
            "generationConfig": {
                "temperature": config.temperature,
                "topP": config.top_p,
                "topK": config.top_k,
                "maxOutputTokens": config.max_tokens,
            }
        });

        let response = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::transport_error(&endpoint, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(&self.model, status, body));
        }

        let result: GoogleResponse = Self::parse_json_response(response, &endpoint).await?;
        extract_text(&result)
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "Google".to_string(),
            model: self.model.clone(),
        }
    }
}

/// Map a non-success response to the matching gateway error.
fn classify_failure(model: &str, status: u16, body: String) -> GatewayError {
    if status == 404 || MODEL_UNAVAILABLE_RE.is_match(&body) {
        GatewayError::ModelUnavailable {
            model: model.to_string(),
            message: body,
        }
    } else {
        GatewayError::Status { status, body }
    }
}

fn extract_text(response: &GoogleResponse) -> Result<String, GatewayError> {
    let text: String = response
        .candidates
        .first()
        .map(|c| c.content.parts.iter().map(|p| p.text.as_str()).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        Err(GatewayError::EmptyResponse)
    } else {
        Ok(text)
    }
}

fn select_model(models: &[ModelDescriptor], preferred: &[String]) -> Option<String> {
    preferred
        .iter()
        .find(|name| {
            models.iter().any(|m| {
                m.name.ends_with(name.as_str())
                    && m.supported_generation_methods
                        .iter()
                        .any(|method| method == "generateContent")
            })
        })
        .cloned()
}

/// Entry of the model listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    pub name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

#[derive(Deserialize)]
struct ModelListResponse {
    #[serde(default)]
    models: Vec<ModelDescriptor>,
}

/// Response structures
#[derive(Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
}

#[derive(Deserialize)]
struct GoogleCandidate {
    content: GoogleContent,
}

#[derive(Deserialize)]
struct GoogleContent {
    #[serde(default)]
    parts: Vec<GooglePart>,
}

#[derive(Deserialize)]
struct GooglePart {
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, methods: &[&str]) -> ModelDescriptor {
        ModelDescriptor {
            name: name.to_string(),
            supported_generation_methods: methods.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn preferred() -> Vec<String> {
        LlmSettings::default().preferred_models
    }

    #[test]
    fn test_select_model_respects_preference_and_methods() {
        let models = vec![
            descriptor("models/gemini-pro", &["generateContent"]),
            descriptor("models/gemini-1.5-flash-latest", &["embedContent"]),
            descriptor("models/gemini-1.5-pro", &["generateContent", "countTokens"]),
        ];
        assert_eq!(select_model(&models, &preferred()), Some("gemini-1.5-pro".to_string()));
        assert_eq!(select_model(&[], &preferred()), None);
    }

    #[test]
    fn test_model_listing_deserializes() {
        let listing: ModelListResponse = serde_json::from_str(
            r#"{"models": [{"name": "models/gemini-pro", "supportedGenerationMethods": ["generateContent"]}, {"name": "models/x"}]}"#,
        )
        .unwrap();
        assert_eq!(listing.models.len(), 2);
        assert!(listing.models[1].supported_generation_methods.is_empty());
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GoogleResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "Olá"}, {"text": ", mundo"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(&response).unwrap(), "Olá, mundo");
    }

    #[test]
    fn test_extract_text_empty_is_error() {
        let response: GoogleResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(matches!(extract_text(&response), Err(GatewayError::EmptyResponse)));

        let response: GoogleResponse =
            serde_json::from_str(r#"{"candidates": [{"content": {"parts": [{"text": "  "}]}}]}"#)
                .unwrap();
        assert!(matches!(extract_text(&response), Err(GatewayError::EmptyResponse)));
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(
            classify_failure("m", 400, "model m is not supported for generateContent".into()),
            GatewayError::ModelUnavailable { .. }
        ));
        assert!(matches!(
            classify_failure("m", 404, String::new()),
            GatewayError::ModelUnavailable { .. }
        ));
        assert!(matches!(
            classify_failure("m", 500, "internal".into()),
            GatewayError::Status { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn test_from_settings_without_key() {
        let settings = LlmSettings::default();
        assert!(GeminiProvider::from_settings(&settings).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pinned_model_skips_discovery() {
        let settings = LlmSettings {
            api_key: Some("key".to_string()),
            model: Some("gemini-pro".to_string()),
            ..LlmSettings::default()
        };
        let provider = GeminiProvider::from_settings(&settings).await.unwrap().unwrap();
        assert_eq!(provider.model(), "gemini-pro");
        assert_eq!(
            provider.with_base_url("http://localhost:9/v1/").generate_endpoint(),
            "http://localhost:9/v1/models/gemini-pro:generateContent"
        );
    }

    #[tokio::test]
    async fn test_discovery_failure_uses_fallback() {
        let provider = GeminiProvider::new("key".into(), "x".into(), Duration::from_secs(2))
            .unwrap()
            .with_base_url("http://127.0.0.1:9/v1");
        let model = provider.pick_model(&preferred(), "gemini-1.5-flash-latest").await;
        assert_eq!(model, "gemini-1.5-flash-latest");
    }
}
