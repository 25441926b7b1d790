use thiserror::Error;

/// Failure of a remote text-generation call.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no remote provider configured")]
    NotConfigured,

    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("remote returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("remote returned an empty response")]
    EmptyResponse,

    #[error("model {model} is unavailable: {message}")]
    ModelUnavailable { model: String, message: String },

    #[error("failed to parse remote response: {0}")]
    Parse(String),
}

/// Configuration problems. These are surfaced to the caller.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    MissingField(&'static str),

    #[error("invalid setting: {0}")]
    Invalid(String),

    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure of a tabular source fetch.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("sheet fetch failed with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse source data: {0}")]
    Parse(String),

    #[error("failed to read source file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to open workbook: {0}")]
    Workbook(String),
}
