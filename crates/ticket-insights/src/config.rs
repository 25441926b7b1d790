use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::processing::RowLayout;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    pub sheets: SheetsConfig,
    pub llm: LlmSettings,
    pub refresh: RefreshConfig,
    pub recent_activity_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub spreadsheet_id: Option<String>,
    /// A1 range, e.g. `A2:M` for a header-less positional sheet.
    pub range: String,
    pub api_key: Option<String>,
    /// Column layout of the sheet. Chosen here, never detected from data.
    pub layout: RowLayout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    /// Pin a model and skip discovery.
    pub model: Option<String>,
    pub preferred_models: Vec<String>,
    pub fallback_model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub auto_refresh: bool,
    pub interval_secs: u64,
}

impl InsightsConfig {
    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sheets.range.trim().is_empty() {
            return Err(ConfigError::Invalid("sheets.range must not be empty".into()));
        }
        if self.refresh.interval_secs == 0 {
            return Err(ConfigError::Invalid("refresh.interval_secs must be > 0".into()));
        }
        if self.llm.fallback_model.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.fallback_model must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid("llm.temperature must be in [0.0, 2.0]".into()));
        }
        if self.llm.max_tokens == 0 {
            return Err(ConfigError::Invalid("llm.max_tokens must be > 0".into()));
        }
        if self.recent_activity_limit == 0 {
            return Err(ConfigError::Invalid("recent_activity_limit must be > 0".into()));
        }
        Ok(())
    }

    /// Load config from a JSON file, falling back to defaults for missing fields.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Default location: `<config dir>/ticket-insights/config.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ticket-insights")
            .join("config.json")
    }

    /// Overlay credentials and identifiers from the environment.
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("SHEETS_SPREADSHEET_ID") {
            self.sheets.spreadsheet_id = Some(v);
        }
        if let Some(v) = non_empty("SHEETS_RANGE") {
            self.sheets.range = v;
        }
        if let Some(v) = non_empty("SHEETS_API_KEY") {
            self.sheets.api_key = Some(v);
        }
        if let Some(v) = non_empty("GEMINI_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = non_empty("GEMINI_MODEL") {
            self.llm.model = Some(v);
        }
    }
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            sheets: SheetsConfig::default(),
            llm: LlmSettings::default(),
            refresh: RefreshConfig::default(),
            recent_activity_limit: 5,
        }
    }
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            range: "A2:M".to_string(),
            api_key: None,
            layout: RowLayout::Positional,
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: None,
            preferred_models: vec![
                "gemini-1.5-flash-latest".to_string(),
                "gemini-1.5-flash".to_string(),
                "gemini-1.5-pro".to_string(),
                "gemini-pro".to_string(),
            ],
            fallback_model: "gemini-1.5-flash-latest".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            request_timeout_secs: 60,
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            auto_refresh: true,
            interval_secs: 60,
        }
    }
}
