//! Error types for loading specifications

use thiserror::Error;

/// Result type alias for spec operations
pub type SpecResult<T> = std::result::Result<T, SpecError>;

/// Errors raised while acquiring credentials or loading a spec
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Failed to fetch spec: {0}")]
    FetchError(String),

    #[error("Failed to acquire token: {0}")]
    TokenError(String),

    #[error("Invalid spec format: {0}")]
    InvalidFormat(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unsupported spec version: {0}")]
    UnsupportedVersion(String),
}

impl SpecError {
    /// Whether the document itself could not be understood
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            SpecError::InvalidFormat(_)
                | SpecError::MissingField(_)
                | SpecError::YamlError(_)
                | SpecError::JsonError(_)
                | SpecError::UnsupportedVersion(_)
        )
    }
}
