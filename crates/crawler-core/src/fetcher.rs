//! HTTP access to the crawled API
//!
//! The [`Fetcher`] trait keeps the orchestrator independent of the HTTP
//! client so crawls can be driven against mock servers or canned responses.

use std::time::Duration;

use async_trait::async_trait;
use openapi_parser::{Credentials, SpecError};
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{CrawlError, Result};

/// Status reported when a request exceeds its timeout
pub const TIMEOUT_STATUS: u16 = 504;

/// Raw response of one endpoint fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

/// Performs one GET request per call, without retries
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` with `credentials`.
    ///
    /// Non-2xx statuses are returned, not raised. A timeout is reported as a
    /// 504 response with an empty body.
    async fn fetch(&self, url: &str, credentials: &Credentials) -> Result<FetchResponse>;
}

/// [`Fetcher`] backed by a shared reqwest client
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    /// Create a fetcher whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SpecError::HttpError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// The underlying client, shared with spec loading and token acquisition
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn timed_out(url: &str) -> FetchResponse {
        warn!("Request to {} timed out", url);
        FetchResponse {
            status: TIMEOUT_STATUS,
            body: String::new(),
        }
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, credentials: &Credentials) -> Result<FetchResponse> {
        debug!("GET {}", url);

        let response = match credentials.apply(self.client.get(url)).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Ok(Self::timed_out(url)),
            Err(e) => {
                return Err(CrawlError::TransportError {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return Ok(Self::timed_out(url)),
            Err(e) => {
                return Err(CrawlError::TransportError {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
        };

        debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(FetchResponse { status, body })
    }
}

/// Outcome class of a fetched status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// Any 2xx
    Success,
    BadRequest,
    Forbidden,
    NotFound,
    ServerError,
    Timeout,
    /// Anything else aborts the crawl
    Unexpected(u16),
}

impl ResponseClass {
    pub fn classify(status: u16) -> Self {
        match status {
            200..=299 => ResponseClass::Success,
            400 => ResponseClass::BadRequest,
            403 => ResponseClass::Forbidden,
            404 => ResponseClass::NotFound,
            500 => ResponseClass::ServerError,
            504 => ResponseClass::Timeout,
            other => ResponseClass::Unexpected(other),
        }
    }

    /// Warning reason for statuses that skip the endpoint
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            ResponseClass::BadRequest => Some("Unknown error for reaching endpoint"),
            ResponseClass::Forbidden => Some("Not authorised to get endpoint"),
            ResponseClass::NotFound => Some(
                "Unable to find an example for endpoint. Please add it to the list of forced examples.",
            ),
            ResponseClass::ServerError => Some("Server error for reaching endpoint"),
            ResponseClass::Timeout => Some("Timeout for reaching endpoint"),
            ResponseClass::Success | ResponseClass::Unexpected(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_classification_is_total() {
        for status in [200, 201, 204, 299] {
            assert_eq!(ResponseClass::classify(status), ResponseClass::Success);
        }

        let recoverable = [400, 403, 404, 500, 504];
        let mut reasons: Vec<&str> = recoverable
            .iter()
            .map(|s| ResponseClass::classify(*s).reason().unwrap())
            .collect();
        reasons.sort();
        reasons.dedup();
        assert_eq!(reasons.len(), recoverable.len());

        for status in [100, 301, 401, 418, 429, 502, 503] {
            let class = ResponseClass::classify(status);
            assert_eq!(class, ResponseClass::Unexpected(status));
            assert!(class.reason().is_none());
        }
    }

    #[tokio::test]
    async fn test_fetch_returns_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(header("Authorization", "Bearer abc"))
            .and(header("Accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"id":1}]"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = ReqwestFetcher::new(Duration::from_secs(5)).unwrap();
        let credentials = Credentials::bearer("abc");

        let response = fetcher
            .fetch(&format!("{}/users", server.uri()), &credentials)
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"[{"id":1}]"#);

        let response = fetcher
            .fetch(&format!("{}/missing", server.uri()), &credentials)
            .await
            .unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_timeout_reported_as_504() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let fetcher = ReqwestFetcher::new(Duration::from_millis(200)).unwrap();
        let response = fetcher
            .fetch(&format!("{}/slow", server.uri()), &Credentials::basic("u", "p"))
            .await
            .unwrap();

        assert_eq!(response.status, TIMEOUT_STATUS);
        assert!(response.body.is_empty());
        assert_eq!(ResponseClass::classify(response.status), ResponseClass::Timeout);
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        let fetcher = ReqwestFetcher::new(Duration::from_secs(1)).unwrap();
        let err = fetcher
            .fetch("http://127.0.0.1:1/users", &Credentials::basic("u", "p"))
            .await
            .unwrap_err();

        assert!(matches!(err, CrawlError::TransportError { .. }));
        assert!(err.is_fatal());
    }
}
