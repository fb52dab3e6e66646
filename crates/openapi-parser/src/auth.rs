//! Credentials and token acquisition

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{SpecError, SpecResult};
use crate::loader::join_url;

/// Secret value - automatically zeroed when dropped
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    /// Create a new secret string
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Get the secret value (use carefully)
    pub fn expose(&self) -> &str {
        &self.value
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretString")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Credentials attached to every spec and endpoint request
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Bearer token (Authorization: Bearer <token>)
    Bearer(SecretString),
    /// Basic authentication
    Basic {
        username: String,
        password: SecretString,
    },
}

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Credentials::Bearer(SecretString::new(token))
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Basic {
            username: username.into(),
            password: SecretString::new(password),
        }
    }

    /// Attach the credential and the JSON `Accept` header to a request
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(ACCEPT, "application/json");
        match self {
            Credentials::Bearer(token) => {
                request.header(AUTHORIZATION, Self::bearer_header(token.expose()))
            }
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password.expose()))
            }
        }
    }

    /// Format the authorization header value; tokens already prefixed are kept as-is
    fn bearer_header(token: &str) -> String {
        let token = token.trim();
        if token.get(..7).is_some_and(|prefix| prefix.eq_ignore_ascii_case("bearer ")) {
            token.to_string()
        } else {
            format!("Bearer {}", token)
        }
    }
}

/// HTTP method used to acquire a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenMethod {
    /// Credentials are embedded in the URL template
    Get,
    /// Credentials are posted as a JSON body
    Post,
}

/// Token-acquisition descriptor from the crawl recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
    /// `get` or `post`
    pub request_type: String,
    /// Path (relative to the API base URL) of the token endpoint
    pub url_complement: String,
}

impl TokenRequest {
    /// Check the descriptor, returning the acquisition method
    pub fn validate(&self) -> SpecResult<TokenMethod> {
        match self.request_type.to_ascii_lowercase().as_str() {
            "get" => {
                for placeholder in ["{username}", "{password}"] {
                    if !self.url_complement.contains(placeholder) {
                        return Err(SpecError::ConfigError(format!(
                            "get_token url_complement must contain {}",
                            placeholder
                        )));
                    }
                }
                Ok(TokenMethod::Get)
            }
            "post" => Ok(TokenMethod::Post),
            other => Err(SpecError::ConfigError(format!(
                "get_token request_type must be 'get' or 'post', got '{}'",
                other
            ))),
        }
    }

    /// Build the token endpoint URL for the given user
    pub fn request_url(&self, base_url: &str, username: &str, password: &str) -> SpecResult<String> {
        let complement = match self.validate()? {
            TokenMethod::Get => self
                .url_complement
                .replace("{username}", username)
                .replace("{password}", password),
            TokenMethod::Post => self.url_complement.clone(),
        };
        Ok(join_url(base_url, &complement))
    }

    /// Call the token endpoint and return bearer credentials
    pub async fn acquire(
        &self,
        client: &Client,
        base_url: &str,
        username: &str,
        password: &str,
    ) -> SpecResult<Credentials> {
        let method = self.validate()?;
        let url = self.request_url(base_url, username, password)?;

        info!("Requesting token ({:?}) from {}", method, join_url(base_url, &self.url_complement));

        let request = match method {
            TokenMethod::Get => client.get(&url),
            TokenMethod::Post => client.post(&url).json(&json!({
                "username": username,
                "password": password,
                "maxDuration": true,
            })),
        };

        let response = request
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| SpecError::TokenError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SpecError::TokenError(e.to_string()))?;

        if status != StatusCode::OK {
            return Err(SpecError::TokenError(format!("HTTP {}: {}", status, body)));
        }

        let content: Value = serde_json::from_str(&body)
            .map_err(|e| SpecError::TokenError(format!("token response is not JSON: {}", e)))?;

        let token = Self::extract_token(&content).ok_or_else(|| {
            SpecError::TokenError("no token found in response".to_string())
        })?;

        debug!("Token acquired");
        Ok(Credentials::bearer(token))
    }

    /// `token`, else `tokens.access`, else `access_token`
    fn extract_token(content: &Value) -> Option<String> {
        content
            .get("token")
            .or_else(|| content.get("tokens").and_then(|t| t.get("access")))
            .or_else(|| content.get("access_token"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token_request(request_type: &str, url_complement: &str) -> TokenRequest {
        TokenRequest {
            request_type: request_type.to_string(),
            url_complement: url_complement.to_string(),
        }
    }

    #[test]
    fn test_validate_rejects_unknown_method() {
        let err = token_request("put", "/auth").validate().unwrap_err();
        assert!(matches!(err, SpecError::ConfigError(_)));
    }

    #[test]
    fn test_validate_get_requires_placeholders() {
        let err = token_request("get", "/auth?user={username}").validate().unwrap_err();
        assert!(err.to_string().contains("{password}"));

        let method = token_request("GET", "/auth/{username}/{password}").validate().unwrap();
        assert_eq!(method, TokenMethod::Get);
    }

    #[test]
    fn test_request_url_substitutes_credentials() {
        let url = token_request("get", "/auth?u={username}&p={password}")
            .request_url("https://api.example.com/", "ada", "secret")
            .unwrap();
        assert_eq!(url, "https://api.example.com/auth?u=ada&p=secret");
    }

    #[test]
    fn test_bearer_header_keeps_existing_prefix() {
        assert_eq!(Credentials::bearer_header("abc"), "Bearer abc");
        assert_eq!(Credentials::bearer_header("Bearer abc"), "Bearer abc");
    }

    #[test]
    fn test_debug_redacted() {
        let credentials = Credentials::basic("ada", "hunter2");
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_acquire_with_post() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/authenticate/"))
            .and(body_json(serde_json::json!({
                "username": "ada",
                "password": "secret",
                "maxDuration": true
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"tokens": {"access": "abc123"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let credentials = token_request("post", "/api/authenticate/")
            .acquire(&Client::new(), &server.uri(), "ada", "secret")
            .await
            .unwrap();

        match credentials {
            Credentials::Bearer(token) => assert_eq!(token.expose(), "abc123"),
            _ => panic!("Expected bearer credentials"),
        }
    }

    #[tokio::test]
    async fn test_acquire_with_get() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/token/ada/secret"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "t0k"})))
            .mount(&server)
            .await;

        let credentials = token_request("get", "/token/{username}/{password}")
            .acquire(&Client::new(), &server.uri(), "ada", "secret")
            .await
            .unwrap();

        assert!(matches!(credentials, Credentials::Bearer(ref t) if t.expose() == "t0k"));
    }

    #[tokio::test]
    async fn test_acquire_fails_on_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .mount(&server)
            .await;

        let err = token_request("post", "/login")
            .acquire(&Client::new(), &server.uri(), "ada", "wrong")
            .await
            .unwrap_err();

        assert!(matches!(err, SpecError::TokenError(ref msg) if msg.contains("bad credentials")));
    }
}
