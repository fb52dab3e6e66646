//! Error types for crawler-core

use openapi_parser::SpecError;
use thiserror::Error;

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Crawl error types
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Unable to resolve placeholder {{{placeholder}}} of {path}")]
    UnresolvableParameter { path: String, placeholder: String },

    #[error("Unable to retrieve endpoint, response code {status}, key {key}")]
    UnexpectedResponse { status: u16, key: String },

    #[error("Request to {url} failed: {message}")]
    TransportError { url: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CrawlError {
    /// Whether the error aborts the whole crawl rather than one endpoint
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CrawlError::UnresolvableParameter { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unresolvable_is_local() {
        let local = CrawlError::UnresolvableParameter {
            path: "/users/{id}".to_string(),
            placeholder: "id".to_string(),
        };
        assert!(!local.is_fatal());
        assert_eq!(local.to_string(), "Unable to resolve placeholder {id} of /users/{id}");

        let fatal = CrawlError::UnexpectedResponse {
            status: 418,
            key: "/teapot".to_string(),
        };
        assert!(fatal.is_fatal());
        assert!(CrawlError::Spec(SpecError::FetchError("down".to_string())).is_fatal());
    }
}
