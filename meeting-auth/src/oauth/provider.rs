//! OAuth provider trait and types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::token::{RefreshResult, Tokens};
use crate::error::Error;

/// Known OAuth providers for video meetings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Zoom,
}

impl ProviderKind {
    /// Get the provider identifier string, also used as the metadata key.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Zoom => "zoom",
        }
    }
}

/// Trait for OAuth 2.0 providers.
///
/// Implementations own all direct token endpoint traffic:
/// - Authorization URL generation
/// - Authorization code exchange for tokens
/// - Token refresh (including rotating refresh tokens for Zoom)
///
/// Neither grant is ever retried: codes are single-use and a failed refresh
/// means the stored grant is gone.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider kind.
    fn provider(&self) -> ProviderKind;

    /// Build the consent screen URL. Pure string construction.
    ///
    /// # Arguments
    ///
    /// * `state` - Optional CSRF state parameter echoed back on the callback
    fn authorization_url(&self, state: Option<&str>) -> String;

    /// Exchange authorization code for access and refresh tokens.
    ///
    /// # Arguments
    ///
    /// * `code` - Authorization code from OAuth callback
    ///
    /// # Returns
    ///
    /// OAuth tokens including access token, refresh token, and expiry.
    async fn exchange_code(&self, code: &str) -> Result<Tokens, Error>;

    /// Refresh an access token using a refresh token.
    ///
    /// # Arguments
    ///
    /// * `refresh_token` - The refresh token
    ///
    /// # Returns
    ///
    /// Refresh result with new tokens and indication if refresh token rotated.
    async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshResult, Error>;
}
