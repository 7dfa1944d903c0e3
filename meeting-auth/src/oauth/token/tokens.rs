//! OAuth token types.

use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use serde::Deserialize;

/// Raw token endpoint response: `{access_token, refresh_token, expires_in, token_type, scope}`.
#[derive(Debug, Deserialize)]
pub struct TokenPair {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// OAuth tokens with metadata.
#[derive(Debug, Clone)]
pub struct Tokens {
    /// Access token for API requests.
    pub access_token: SecretString,
    /// Refresh token for obtaining new access tokens.
    pub refresh_token: SecretString,
    /// Instant from which the access token must no longer be used.
    pub expires_at: DateTime<Utc>,
    /// Token type (usually "Bearer").
    pub token_type: String,
    /// Granted scopes.
    pub scopes: Vec<String>,
}

impl Tokens {
    /// Build tokens from a token endpoint response received at `now`.
    ///
    /// The stored expiry is `now + expires_in - margin` so the token is retired
    /// before the provider stops accepting it.
    pub fn from_pair(pair: TokenPair, now: DateTime<Utc>, margin: Duration) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_at: now + Duration::seconds(pair.expires_in) - margin,
            token_type: pair.token_type,
            scopes: pair.scope.split_whitespace().map(String::from).collect(),
        }
    }

    /// Check whether the access token is unusable at the given instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Check whether the access token is unusable now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Get the remaining time until expiration.
    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at - Utc::now()
    }
}

/// Result of a token refresh operation.
#[derive(Debug, Clone)]
pub struct RefreshResult {
    /// The new tokens.
    pub tokens: Tokens,
    /// True if the refresh token was rotated (Zoom behavior).
    pub refresh_token_rotated: bool,
}

impl RefreshResult {
    /// Create a refresh result with rotation.
    pub fn with_rotation(tokens: Tokens) -> Self {
        Self {
            tokens,
            refresh_token_rotated: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn tokens_expiring_at(expires_at: DateTime<Utc>) -> Tokens {
        Tokens {
            access_token: SecretString::new("test".to_string()),
            refresh_token: SecretString::new("refresh".to_string()),
            expires_at,
            token_type: "bearer".to_string(),
            scopes: vec![],
        }
    }

    #[test]
    fn test_token_not_expired() {
        let tokens = tokens_expiring_at(Utc::now() + Duration::hours(1));
        assert!(!tokens.is_expired());
    }

    #[test]
    fn test_token_expired() {
        let tokens = tokens_expiring_at(Utc::now() - Duration::hours(1));
        assert!(tokens.is_expired());
        assert!(tokens.time_until_expiry() <= -Duration::hours(1));
    }

    #[test]
    fn test_token_expired_exactly_at_boundary() {
        let now = Utc::now();
        let tokens = tokens_expiring_at(now);
        assert!(tokens.is_expired_at(now));
        assert!(!tokens.is_expired_at(now - Duration::seconds(1)));
    }

    #[test]
    fn test_from_pair_points_expiry_into_the_future() {
        let pair: TokenPair = serde_json::from_value(serde_json::json!({
            "access_token": "AT1",
            "refresh_token": "RT1",
            "expires_in": 3600,
            "token_type": "bearer",
            "scope": "meeting:read meeting:write"
        }))
        .unwrap();
        let now = Utc::now();

        let tokens = Tokens::from_pair(pair, now, Duration::seconds(60));

        assert_eq!(tokens.access_token.expose_secret(), "AT1");
        assert_eq!(tokens.refresh_token.expose_secret(), "RT1");
        assert_eq!(tokens.expires_at, now + Duration::seconds(3540));
        assert_eq!(tokens.scopes, vec!["meeting:read", "meeting:write"]);
        assert!(!tokens.is_expired_at(now));
    }

    #[test]
    fn test_token_pair_requires_refresh_token() {
        let result: Result<TokenPair, _> = serde_json::from_value(serde_json::json!({
            "access_token": "AT1",
            "expires_in": 3600
        }));
        assert!(result.is_err());
    }
}
