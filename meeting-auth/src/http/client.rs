//! Authenticated HTTP client builder with middleware.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest_middleware::ClientBuilder;
use reqwest_retry::RetryTransientMiddleware;
use secrecy::{ExposeSecret, SecretString};

use super::BackoffPolicy;
use crate::error::{Error, ErrorKind, HttpErrorKind};

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum number of retries for transient failures. Zero disables the retry middleware.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub retry_base_delay: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            user_agent: format!("meeting-auth/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Authenticated HTTP client with middleware.
pub type AuthenticatedClient = reqwest_middleware::ClientWithMiddleware;

/// Builder for creating authenticated HTTP clients with middleware.
///
/// Provides a fluent API for constructing HTTP clients with:
/// - `Authorization: Bearer <token>` plus JSON content negotiation
/// - Retry logic with exponential backoff
/// - Timeout configuration
pub struct AuthenticatedClientBuilder {
    config: HttpClientConfig,
    bearer_token: Option<SecretString>,
}

impl AuthenticatedClientBuilder {
    /// Create a new client builder with default configuration.
    pub fn new() -> Self {
        Self::from_config(HttpClientConfig::default())
    }

    /// Create a new client builder from an explicit configuration.
    pub fn from_config(config: HttpClientConfig) -> Self {
        Self {
            config,
            bearer_token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` on every request.
    pub fn with_bearer_token(mut self, token: SecretString) -> Self {
        self.bearer_token = Some(token);
        self
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Build the configured HTTP client.
    pub fn build(self) -> Result<AuthenticatedClient, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &self.bearer_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| Error {
                    source: Some(Box::new(e)),
                    error_kind: ErrorKind::Http(HttpErrorKind::BuilderFailed),
                })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent)
            .default_headers(headers)
            .build()?;

        let mut builder = ClientBuilder::new(client);
        if self.config.max_retries > 0 {
            let retry_policy = BackoffPolicy::new(self.config.max_retries)
                .with_base_delay(self.config.retry_base_delay);
            builder = builder.with(RetryTransientMiddleware::new_with_policy(retry_policy));
        }

        Ok(builder.build())
    }
}

impl Default for AuthenticatedClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_default() {
        let builder = AuthenticatedClientBuilder::new();
        assert_eq!(builder.config.timeout, Duration::from_secs(30));
        assert_eq!(builder.config.max_retries, 3);
        assert!(builder.bearer_token.is_none());
    }

    #[test]
    fn test_builder_with_max_retries() {
        let builder = AuthenticatedClientBuilder::new().with_max_retries(0);
        assert_eq!(builder.config.max_retries, 0);
    }

    #[test]
    fn test_invalid_token_fails_to_build() {
        let result = AuthenticatedClientBuilder::new()
            .with_bearer_token(SecretString::new("bad\ntoken".to_string()))
            .build();
        assert_eq!(
            result.unwrap_err().error_kind,
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        );
    }

    #[tokio::test]
    async fn test_bearer_and_json_headers_are_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/users/me")
            .match_header("authorization", "Bearer AT1")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = AuthenticatedClientBuilder::new()
            .with_bearer_token(SecretString::new("AT1".to_string()))
            .build()
            .unwrap();
        let response = client
            .get(format!("{}/v2/users/me", server.url()))
            .send()
            .await
            .unwrap();

        assert!(response.status().is_success());
        mock.assert_async().await;
    }
}
