//! Crawl recipe configuration
//!
//! A recipe is a YAML or JSON file naming the API, where its spec lives, how
//! to authenticate and how to handle parameterized endpoints.

use std::path::Path;
use std::time::Duration;

use indexmap::IndexMap;
use openapi_parser::{Credentials, SpecError, SpecSource, TokenRequest};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{CrawlError, Result};

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_fetches() -> usize {
    1
}

/// Operator-supplied placeholder values for one path template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ForcedExample {
    /// Values substituted in placeholder order
    Positional(Vec<Value>),
    /// Values keyed by placeholder name
    Named(IndexMap<String, Value>),
}

/// Crawl configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Source name, prefixed to qualified dataset names
    pub name: String,
    /// Base URL of the API
    pub url: String,
    /// Spec location: absolute URL, local path, or path relative to `url`
    pub swagger_file: String,
    /// Path templates excluded from the crawl
    #[serde(default)]
    pub ignore_endpoints: Vec<String>,
    /// Basic-auth user, also used for token acquisition
    #[serde(default)]
    pub username: String,
    /// Basic-auth password, also used for token acquisition
    #[serde(default)]
    pub password: String,
    /// Pre-supplied bearer token
    #[serde(default)]
    pub token: Option<String>,
    /// How to obtain a bearer token before crawling
    #[serde(default)]
    pub get_token: Option<TokenRequest>,
    /// Explicit placeholder values per path template
    #[serde(default)]
    pub forced_examples: IndexMap<String, ForcedExample>,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Fetches allowed in flight among independent endpoints
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

impl CrawlConfig {
    /// Create a configuration with defaults for everything but the locations
    pub fn new(name: &str, url: &str, swagger_file: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            swagger_file: swagger_file.to_string(),
            ignore_endpoints: Vec::new(),
            username: String::new(),
            password: String::new(),
            token: None,
            get_token: None,
            forced_examples: IndexMap::new(),
            timeout_secs: default_timeout_secs(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }

    /// Load and validate a recipe file (`.json` as JSON, anything else as YAML)
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: CrawlConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&contents)?,
            _ => serde_yaml::from_str(&contents)?,
        };
        debug!("Loaded crawl config from {:?}", path);

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot be crawled
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(CrawlError::ConfigError("url must not be empty".to_string()));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(CrawlError::ConfigError(
                "max_concurrent_fetches must be at least 1".to_string(),
            ));
        }
        if let Some(token_request) = &self.get_token {
            token_request.validate().map_err(config_error)?;
        }
        Ok(())
    }

    /// Where the spec document lives
    pub fn spec_source(&self) -> SpecSource {
        SpecSource::locate(&self.url, &self.swagger_file)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Pick the credential shape: token, acquired token, or basic auth
    pub async fn credentials(&self, client: &Client) -> Result<Credentials> {
        if let Some(token) = &self.token {
            debug!("Using configured bearer token");
            return Ok(Credentials::bearer(token.clone()));
        }

        if let Some(token_request) = &self.get_token {
            info!("Acquiring token for {}", self.username);
            return token_request
                .acquire(client, &self.url, &self.username, &self.password)
                .await
                .map_err(config_error);
        }

        debug!("Using basic authentication");
        Ok(Credentials::basic(self.username.clone(), self.password.clone()))
    }
}

impl std::fmt::Debug for CrawlConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlConfig")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("swagger_file", &self.swagger_file)
            .field("ignore_endpoints", &self.ignore_endpoints)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("get_token", &self.get_token)
            .field("forced_examples", &self.forced_examples)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .finish()
    }
}

/// Surface descriptor problems as configuration errors
fn config_error(error: SpecError) -> CrawlError {
    match error {
        SpecError::ConfigError(message) => CrawlError::ConfigError(message),
        other => CrawlError::Spec(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const RECIPE: &str = r#"
name: petstore
url: https://petstore.example.com/
swagger_file: /v2/swagger.json
ignore_endpoints:
  - /store/inventory
username: ada
password: secret
get_token:
  request_type: post
  url_complement: /api/authenticate/
forced_examples:
  "/pet/{petId}": [42]
  "/user/{username}/orders/{orderId}":
    username: ada
    orderId: "7"
"#;

    #[test]
    fn test_load_yaml_recipe() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        file.write_all(RECIPE.as_bytes()).unwrap();

        let config = CrawlConfig::load(file.path()).unwrap();

        assert_eq!(config.name, "petstore");
        assert_eq!(config.ignore_endpoints, vec!["/store/inventory"]);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_concurrent_fetches, 1);
        assert_eq!(
            config.forced_examples["/pet/{petId}"],
            ForcedExample::Positional(vec![serde_json::json!(42)])
        );
        assert!(matches!(
            config.forced_examples["/user/{username}/orders/{orderId}"],
            ForcedExample::Named(_)
        ));
        assert_eq!(
            config.spec_source(),
            SpecSource::Url("https://petstore.example.com/v2/swagger.json".to_string())
        );
    }

    #[test]
    fn test_validate_token_method() {
        let mut config = CrawlConfig::new("api", "https://api.example.com", "/swagger.json");
        config.get_token = Some(TokenRequest {
            request_type: "patch".to_string(),
            url_complement: "/token".to_string(),
        });
        assert!(matches!(config.validate(), Err(CrawlError::ConfigError(_))));

        config.get_token = Some(TokenRequest {
            request_type: "get".to_string(),
            url_complement: "/token?user={username}".to_string(),
        });
        assert!(matches!(config.validate(), Err(CrawlError::ConfigError(_))));
    }

    #[test]
    fn test_validate_limits() {
        let mut config = CrawlConfig::new("api", " ", "/swagger.json");
        assert!(config.validate().is_err());

        config.url = "https://api.example.com".to_string();
        config.max_concurrent_fetches = 0;
        assert!(config.validate().is_err());

        config.max_concurrent_fetches = 4;
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_credentials_prefers_token() {
        let mut config = CrawlConfig::new("api", "https://api.example.com", "/swagger.json");
        config.username = "ada".to_string();
        config.token = Some("abc".to_string());

        let credentials = config.credentials(&Client::new()).await.unwrap();
        assert!(matches!(credentials, Credentials::Bearer(ref t) if t.expose() == "abc"));

        config.token = None;
        let credentials = config.credentials(&Client::new()).await.unwrap();
        assert!(matches!(credentials, Credentials::Basic { ref username, .. } if username == "ada"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = CrawlConfig::new("api", "https://api.example.com", "/swagger.json");
        config.password = "hunter2".to_string();
        config.token = Some("tok".to_string());

        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("\"tok\""));
    }
}
