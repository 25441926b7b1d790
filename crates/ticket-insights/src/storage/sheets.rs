//! Google Sheets values API as a ticket row source.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;

use super::TicketSource;
use crate::config::SheetsConfig;
use crate::error::{ConfigError, SourceError};

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4";

pub struct SheetsSource {
    spreadsheet_id: String,
    range: String,
    api_key: String,
    base_url: String,
    client: Client,
}

impl SheetsSource {
    /// Build from config. Missing identifiers or credentials are a
    /// configuration error; there is no fallback data source.
    pub fn from_config(config: &SheetsConfig) -> Result<Self, ConfigError> {
        let present = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        let spreadsheet_id =
            present(&config.spreadsheet_id).ok_or(ConfigError::MissingField("sheets.spreadsheet_id"))?;
        let api_key = present(&config.api_key).ok_or(ConfigError::MissingField("sheets.api_key"))?;
        if config.range.trim().is_empty() {
            return Err(ConfigError::MissingField("sheets.range"));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("http client: {}", e)))?;

        Ok(Self {
            spreadsheet_id,
            range: config.range.clone(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn values_url(&self) -> Result<Url, SourceError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SourceError::Parse(format!("invalid base url {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::Parse(format!("invalid base url {}", self.base_url)))?
            .extend([
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                self.range.as_str(),
            ]);
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }
}

#[async_trait]
impl TicketSource for SheetsSource {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SourceError> {
        let url = self.values_url()?;
        let endpoint = format!("{}/spreadsheets/{}", self.base_url, self.spreadsheet_id);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Transport {
                endpoint: endpoint.clone(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status { status, body });
        }

        let body = response.text().await.map_err(|e| SourceError::Transport {
            endpoint,
            message: format!("failed to read response body: {}", e),
        })?;
        parse_values(&body)
    }

    fn describe(&self) -> String {
        format!("sheet {} ({})", self.spreadsheet_id, self.range)
    }
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<JsonValue>>,
}

fn parse_values(body: &str) -> Result<Vec<Vec<String>>, SourceError> {
    let range: ValueRange =
        serde_json::from_str(body).map_err(|e| SourceError::Parse(e.to_string()))?;
    Ok(range
        .values
        .into_iter()
        .map(|row| row.into_iter().map(cell_text).collect())
        .collect())
}

fn cell_text(cell: JsonValue) -> String {
    match cell {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SheetsConfig {
        SheetsConfig {
            spreadsheet_id: Some("sheet-id".to_string()),
            api_key: Some("secret".to_string()),
            range: "Chamados!A2:M".to_string(),
            ..SheetsConfig::default()
        }
    }

    #[test]
    fn test_missing_credentials_are_config_errors() {
        let mut missing_id = config();
        missing_id.spreadsheet_id = None;
        assert!(matches!(
            SheetsSource::from_config(&missing_id),
            Err(ConfigError::MissingField("sheets.spreadsheet_id"))
        ));

        let mut blank_key = config();
        blank_key.api_key = Some(" ".to_string());
        assert!(matches!(
            SheetsSource::from_config(&blank_key),
            Err(ConfigError::MissingField("sheets.api_key"))
        ));
    }

    #[test]
    fn test_values_url() {
        let source = SheetsSource::from_config(&config()).unwrap();
        let url = source.values_url().unwrap();
        assert!(url
            .as_str()
            .starts_with("https://sheets.googleapis.com/v4/spreadsheets/sheet-id/values/Chamados!A2:M"));
        assert!(url.as_str().ends_with("?key=secret"));
    }

    #[test]
    fn test_parse_values() {
        let rows = parse_values(r#"{"range": "A2:M", "values": [["1", "Aberto", 3, null], []]}"#).unwrap();
        assert_eq!(rows, vec![vec!["1", "Aberto", "3", ""], vec![]]);

        assert!(parse_values(r#"{"range": "A2:M"}"#).unwrap().is_empty());
        assert!(matches!(parse_values("<html>"), Err(SourceError::Parse(_))));
    }
}
