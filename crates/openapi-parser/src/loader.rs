//! Spec loading from local files and remote URLs

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use tracing::info;

use crate::auth::Credentials;
use crate::error::{SpecError, SpecResult};
use crate::parser::OpenApiParser;
use crate::types::Specification;

/// Where a spec document lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSource {
    /// Remote document
    Url(String),
    /// Local document
    File(PathBuf),
}

impl SpecSource {
    /// Locate a spec given the API base URL and the configured spec file.
    ///
    /// Absolute `http(s)://` locations are used as-is, `file://` locations and
    /// existing paths are read from disk, anything else is joined to `base_url`.
    pub fn locate(base_url: &str, swagger_file: &str) -> Self {
        if swagger_file.starts_with("http://") || swagger_file.starts_with("https://") {
            return SpecSource::Url(swagger_file.to_string());
        }
        if let Some(path) = swagger_file.strip_prefix("file://") {
            return SpecSource::File(PathBuf::from(path));
        }
        if Path::new(swagger_file).is_file() {
            return SpecSource::File(PathBuf::from(swagger_file));
        }
        SpecSource::Url(join_url(base_url, swagger_file))
    }
}

impl std::fmt::Display for SpecSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecSource::Url(url) => f.write_str(url),
            SpecSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Loads and normalizes spec documents
pub struct SpecLoader {
    client: Client,
}

impl SpecLoader {
    /// Create a loader whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> SpecResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SpecError::HttpError(e.to_string()))?;

        Ok(Self { client })
    }

    /// Create a loader sharing an existing HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Load a spec, authenticating remote fetches with `credentials`
    pub async fn load(&self, source: &SpecSource, credentials: &Credentials) -> SpecResult<Specification> {
        match source {
            SpecSource::Url(url) => self.fetch_and_parse(url, credentials).await,
            SpecSource::File(path) => Self::read_and_parse(path),
        }
    }

    async fn fetch_and_parse(&self, url: &str, credentials: &Credentials) -> SpecResult<Specification> {
        info!("Fetching spec from: {}", url);

        let response = credentials
            .apply(self.client.get(url))
            .send()
            .await
            .map_err(|e| SpecError::FetchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SpecError::FetchError(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_default();

        let content = response
            .text()
            .await
            .map_err(|e| SpecError::FetchError(e.to_string()))?;

        if content_type.contains("yaml") || url.ends_with(".yaml") || url.ends_with(".yml") {
            OpenApiParser::parse_yaml(&content)
        } else {
            OpenApiParser::parse(&content)
        }
    }

    fn read_and_parse(path: &Path) -> SpecResult<Specification> {
        info!("Reading spec from: {}", path.display());

        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => OpenApiParser::parse_yaml(&content),
            Some("json") => OpenApiParser::parse_json(&content),
            _ => OpenApiParser::parse(&content),
        }
    }
}

/// Concatenate a base URL and a path, then clean the result
pub fn join_url(base: &str, path: &str) -> String {
    clean_url(&format!("{}{}", base, path))
}

/// Collapse repeated `/` in a URL, leaving the scheme separator intact
pub fn clean_url(url: &str) -> String {
    let (scheme, rest) = match url.find("://") {
        Some(idx) => url.split_at(idx + 3),
        None => ("", url),
    };

    let mut cleaned = String::with_capacity(url.len());
    cleaned.push_str(scheme);
    let mut previous_slash = false;
    for c in rest.chars() {
        if c == '/' && previous_slash {
            continue;
        }
        previous_slash = c == '/';
        cleaned.push(c);
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MINIMAL_SPEC: &str = r#"{"swagger": "2.0", "info": {"title": "Mini", "version": "1"}, "paths": {"/ping": {"get": {"responses": {}}}}}"#;

    #[test]
    fn test_clean_url() {
        assert_eq!(clean_url("https://api.example.com//v1//users"), "https://api.example.com/v1/users");
        assert_eq!(clean_url("http://host/a///b/"), "http://host/a/b/");
        assert_eq!(clean_url("//a//b"), "/a/b");
    }

    #[test]
    fn test_locate_sources() {
        assert_eq!(
            SpecSource::locate("https://api.example.com", "https://other.example.com/spec.json"),
            SpecSource::Url("https://other.example.com/spec.json".to_string())
        );
        assert_eq!(
            SpecSource::locate("https://api.example.com/", "/swagger.json"),
            SpecSource::Url("https://api.example.com/swagger.json".to_string())
        );
        assert_eq!(
            SpecSource::locate("https://api.example.com", "file:///tmp/spec.yaml"),
            SpecSource::File(PathBuf::from("/tmp/spec.yaml"))
        );
    }

    #[test]
    fn test_read_local_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(MINIMAL_SPEC.as_bytes()).unwrap();

        let source = SpecSource::locate("https://unused.example.com", file.path().to_str().unwrap());
        assert!(matches!(source, SpecSource::File(_)));

        let spec = SpecLoader::read_and_parse(file.path()).unwrap();
        assert_eq!(spec.title, "Mini");
        assert!(spec.paths.contains_key("/ping"));
    }

    #[tokio::test]
    async fn test_fetch_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/swagger.json"))
            .and(header("authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string(MINIMAL_SPEC))
            .mount(&server)
            .await;

        let loader = SpecLoader::new(Duration::from_secs(5)).unwrap();
        let source = SpecSource::locate(&server.uri(), "/swagger.json");
        let spec = loader.load(&source, &Credentials::bearer("abc")).await.unwrap();

        assert_eq!(spec.paths.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let loader = SpecLoader::new(Duration::from_secs(5)).unwrap();
        let source = SpecSource::locate(&server.uri(), "/swagger.json");
        let err = loader
            .load(&source, &Credentials::basic("ada", "wrong"))
            .await
            .unwrap_err();

        assert!(matches!(err, SpecError::FetchError(ref msg) if msg.contains("401")));
    }

    #[tokio::test]
    async fn test_fetch_yaml_by_extension() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/openapi.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "openapi: 3.0.0\ninfo:\n  title: Yaml\n  version: '1'\npaths:\n  /items:\n    get:\n      responses: {}\n",
            ))
            .mount(&server)
            .await;

        let loader = SpecLoader::new(Duration::from_secs(5)).unwrap();
        let source = SpecSource::Url(format!("{}/openapi.yaml", server.uri()));
        let spec = loader.load(&source, &Credentials::basic("", "")).await.unwrap();

        assert_eq!(spec.title, "Yaml");
    }
}
