//! HTTP client shared foundation
//!
//! This module provides a shared HTTP client for the GitHub REST API with:
//! - Configurable base URL, timeout and User-Agent
//! - Bearer token authentication and GitHub API headers
//! - Exponential backoff retry logic (max 3 retries)
//! - Status code classification into gateway errors

use crate::error::GatewayError;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default GitHub API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default timeout for HTTP requests (30 seconds)
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default User-Agent header
const DEFAULT_USER_AGENT: &str = concat!("workflow-sync/", env!("CARGO_PKG_VERSION"));

/// Media type requested from the GitHub API
const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// Header pinning the REST API version
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";

/// REST API version sent with every request
const API_VERSION: &str = "2022-11-28";

/// Maximum number of retry attempts
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (in milliseconds)
const BASE_DELAY_MS: u64 = 100;

/// HTTP client wrapper with retry logic
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    max_retries: u32,
}

impl HttpClient {
    /// Create a new HTTP client against the public GitHub API
    pub fn new() -> Result<Self, GatewayError> {
        Self::with_config(DEFAULT_API_URL, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(
        base_url: &str,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                GatewayError::transport(base_url, format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            max_retries: MAX_RETRIES,
        })
    }

    /// Create a client for the given base URL with default timeout and User-Agent
    pub fn for_base_url(base_url: &str) -> Result<Self, GatewayError> {
        Self::with_config(base_url, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Set the access token sent as a bearer credential
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the maximum number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Get the API base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an absolute URL for an API path
    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, GatewayError> {
        let raw = format!("{}{}", self.base_url, path);
        let parsed = if query.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, query)
        };
        parsed.map_err(|e| GatewayError::transport(&raw, format!("invalid URL: {}", e)))
    }

    /// Perform a GET request and parse the JSON response
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        resource: &str,
    ) -> Result<T, GatewayError> {
        let url = self.url(path, query)?;
        let response = self.send(Method::GET, url.clone(), resource, None).await?;
        Self::parse_json(response, &url).await
    }

    /// Perform a request with a JSON body and parse the JSON response
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &serde_json::Value,
        resource: &str,
    ) -> Result<T, GatewayError> {
        let url = self.url(path, &[])?;
        let response = self.send(method, url.clone(), resource, Some(body)).await?;
        Self::parse_json(response, &url).await
    }

    async fn parse_json<T: DeserializeOwned>(
        response: Response,
        url: &Url,
    ) -> Result<T, GatewayError> {
        response.json::<T>().await.map_err(|e| {
            GatewayError::invalid_response(url.as_str(), format!("failed to parse JSON: {}", e))
        })
    }

    /// Send a request with retry logic.
    ///
    /// Rate-limited responses are retried for every method. Transport errors
    /// and 5xx responses are only retried for GET, since a write may have
    /// been applied before the failure surfaced.
    async fn send(
        &self,
        method: Method,
        url: Url,
        resource: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, GatewayError> {
        let idempotent = method == Method::GET;
        let mut last_error = None;
        let mut delay = BASE_DELAY_MS;

        for attempt in 0..=self.max_retries {
            let mut request = self
                .client
                .request(method.clone(), url.clone())
                .header(ACCEPT, GITHUB_ACCEPT)
                .header(API_VERSION_HEADER, API_VERSION);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let retryable = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(GatewayError::RateLimitExceeded {
                            url: url.to_string(),
                        });
                        true
                    } else if status.is_server_error() {
                        last_error = Some(GatewayError::transport(
                            url.as_str(),
                            format!("HTTP {}", status),
                        ));
                        idempotent
                    } else {
                        return Self::check_status(response, &url, resource).await;
                    }
                }
                Err(e) => {
                    let message = if e.is_timeout() {
                        "request timed out".to_string()
                    } else {
                        e.to_string()
                    };
                    last_error = Some(GatewayError::transport(url.as_str(), message));
                    idempotent
                }
            };

            if !retryable || attempt == self.max_retries {
                break;
            }
            // Wait before retrying with exponential backoff
            tokio::time::sleep(Duration::from_millis(delay)).await;
            delay *= 2;
        }

        Err(last_error.unwrap_or_else(|| GatewayError::transport(url.as_str(), "unknown error")))
    }

    /// Map a non-retryable response status to a gateway error
    async fn check_status(
        response: Response,
        url: &Url,
        resource: &str,
    ) -> Result<Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let rate_limited = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "0")
            .unwrap_or(false);

        match status {
            StatusCode::NOT_FOUND => Err(GatewayError::not_found(resource)),
            StatusCode::FORBIDDEN if rate_limited => Err(GatewayError::RateLimitExceeded {
                url: url.to_string(),
            }),
            StatusCode::UNAUTHORIZED => Err(GatewayError::AuthFailure {
                message: error_message(response).await,
            }),
            StatusCode::FORBIDDEN => Err(GatewayError::PermissionDenied {
                message: error_message(response).await,
            }),
            _ => Err(GatewayError::transport(
                url.as_str(),
                format!("HTTP {}: {}", status, error_message(response).await),
            )),
        }
    }
}

/// Extract GitHub's `message` field from an error body, falling back to the raw text
async fn error_message(response: Response) -> String {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_creation() {
        let client = HttpClient::new();
        assert!(client.is_ok());
    }

    #[test]
    fn test_http_client_with_config_trims_trailing_slash() {
        let client = HttpClient::with_config(
            "https://github.example.com/api/v3/",
            Duration::from_secs(60),
            "test-agent/1.0",
        )
        .unwrap();
        assert_eq!(client.base_url(), "https://github.example.com/api/v3");
    }

    #[test]
    fn test_http_client_with_max_retries() {
        let client = HttpClient::new().unwrap().with_max_retries(5);
        assert_eq!(client.max_retries, 5);
    }

    #[test]
    fn test_http_client_with_token() {
        let client = HttpClient::new().unwrap().with_token("ghp_secret");
        assert_eq!(client.token.as_deref(), Some("ghp_secret"));
    }

    #[test]
    fn test_url_with_query() {
        let client = HttpClient::new().unwrap();
        let url = client
            .url("/repos/org/repo/contents/composer.json", &[("ref", "2.x")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/org/repo/contents/composer.json?ref=2.x"
        );
    }

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(30));
        assert!(DEFAULT_USER_AGENT.starts_with("workflow-sync/"));
        assert_eq!(MAX_RETRIES, 3);
        assert_eq!(BASE_DELAY_MS, 100);
    }
}
