//! Zoom OAuth provider implementation.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::header::AUTHORIZATION;
use secrecy::ExposeSecret;
use tracing::{debug, info, warn};

use crate::credentials::ClientIdentity;
use crate::error::{oauth_error, provider_error, Error, OAuthErrorKind, ProviderErrorKind};
use crate::http::{AuthenticatedClient, AuthenticatedClientBuilder, HttpClientConfig};
use crate::oauth::token::{RefreshResult, TokenPair, Tokens};
use crate::oauth::ProviderKind;

/// Production Zoom host serving both the OAuth and REST endpoints.
pub const DEFAULT_BASE_URL: &str = "https://zoom.us";

/// Scopes needed to read the user profile and create meetings.
pub const DEFAULT_SCOPES: &str = "meeting:read meeting:write";

/// Static settings for the Zoom provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL of the Zoom OAuth host, without trailing slash.
    pub base_url: String,
    /// Redirect URI registered with the Zoom app.
    pub redirect_uri: String,
    /// Space separated scopes requested on the consent screen.
    pub scopes: String,
    /// Subtracted from the provider's `expires_in` when computing the stored expiry.
    pub expiry_margin: Duration,
    /// HTTP settings for the token endpoint. Retries are always disabled.
    pub http: HttpClientConfig,
}

impl ProviderConfig {
    pub fn new(redirect_uri: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            redirect_uri: redirect_uri.into(),
            scopes: DEFAULT_SCOPES.to_string(),
            expiry_margin: Duration::seconds(60),
            http: HttpClientConfig::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Zoom OAuth provider.
///
/// Handles OAuth 2.0 flows for Zoom accounts, including:
/// - Authorization URL generation
/// - Authorization code exchange
/// - Rotating refresh token exchange
pub struct Provider {
    identity: ClientIdentity,
    config: ProviderConfig,
    http_client: AuthenticatedClient,
}

impl Provider {
    /// Create a new Zoom OAuth provider.
    ///
    /// # Arguments
    ///
    /// * `identity` - Zoom OAuth client id and secret
    /// * `config` - Endpoints, redirect URI and token settings
    pub fn new(identity: ClientIdentity, config: ProviderConfig) -> Result<Self, Error> {
        // Grants are single-use, so the token endpoint client never retries.
        let http_client = AuthenticatedClientBuilder::from_config(config.http.clone())
            .with_max_retries(0)
            .build()?;

        Ok(Self {
            identity,
            config,
            http_client,
        })
    }

    /// Get the provider configuration.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn token_url(&self) -> String {
        format!("{}/oauth/token", self.config.base_url)
    }

    /// POST a grant to the token endpoint and parse the token pair.
    async fn request_tokens(
        &self,
        params: &[(&str, &str)],
        rejected: OAuthErrorKind,
    ) -> Result<Tokens, Error> {
        let response = self
            .http_client
            .post(self.token_url())
            .query(params)
            .header(AUTHORIZATION, self.identity.basic_auth_header())
            .send()
            .await
            .inspect_err(|e| warn!("Zoom token endpoint unreachable: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Zoom token endpoint returned {}: {}", status, error_text);
            return Err(oauth_error(
                rejected,
                &format!("Zoom token endpoint returned {}: {}", status, error_text),
            ));
        }

        let pair: TokenPair = response
            .json()
            .await
            .inspect_err(|e| warn!("Failed to parse Zoom token response: {}", e))?;

        if pair.access_token.expose_secret().is_empty()
            || pair.refresh_token.expose_secret().is_empty()
        {
            return Err(provider_error(
                ProviderErrorKind::InvalidResponse,
                "Zoom token response is missing a token",
            ));
        }

        Ok(Tokens::from_pair(pair, Utc::now(), self.config.expiry_margin))
    }
}

#[async_trait]
impl crate::oauth::Provider for Provider {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Zoom
    }

    fn authorization_url(&self, state: Option<&str>) -> String {
        let mut url = format!(
            "{}/oauth/authorize?\
            response_type=code&\
            client_id={}&\
            scope={}&\
            redirect_uri={}",
            self.config.base_url,
            urlencoding::encode(self.identity.client_id()),
            urlencoding::encode(&self.config.scopes),
            urlencoding::encode(&self.config.redirect_uri),
        );
        if let Some(state) = state {
            url.push_str("&state=");
            url.push_str(&urlencoding::encode(state));
        }
        url
    }

    async fn exchange_code(&self, code: &str) -> Result<Tokens, Error> {
        debug!("Exchanging Zoom OAuth code for tokens");

        let tokens = self
            .request_tokens(
                &[
                    ("grant_type", "authorization_code"),
                    ("code", code),
                    ("redirect_uri", self.config.redirect_uri.as_str()),
                ],
                OAuthErrorKind::TokenExchangeFailed,
            )
            .await?;

        info!("Successfully exchanged Zoom OAuth code for tokens");
        Ok(tokens)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshResult, Error> {
        debug!("Refreshing Zoom access token");

        let tokens = self
            .request_tokens(
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                ],
                OAuthErrorKind::TokenRefreshFailed,
            )
            .await?;

        info!("Successfully refreshed Zoom access token");
        Ok(RefreshResult::with_rotation(tokens))
    }
}
