//! The Zoom credential record kept in a user's `backend_metadata["zoom"]`.

use std::fmt;

use chrono::{DateTime, Utc};
use meeting_auth::oauth::token::Tokens;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key of the credential record inside a profile's backend metadata.
pub const BACKEND_NAME: &str = "zoom";

/// Persisted Zoom credentials of one user.
///
/// `access_token_expires` is unix seconds and already includes the safety margin,
/// so the token is usable only while `now < access_token_expires`. Fields written
/// by other parts of the application are carried through `extra` untouched.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct CredentialRecord {
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expires: i64,
    /// Zoom's id for the user, learned from `/v2/users/me` during the callback.
    #[serde(rename = "user_id", default, skip_serializing_if = "Option::is_none")]
    pub provider_user_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CredentialRecord {
    pub fn from_tokens(tokens: &Tokens, provider_user_id: Option<String>) -> Self {
        Self {
            access_token: tokens.access_token.expose_secret().clone(),
            refresh_token: tokens.refresh_token.expose_secret().clone(),
            access_token_expires: tokens.expires_at.timestamp(),
            provider_user_id,
            extra: Map::new(),
        }
    }

    /// Overwrite the token fields, keeping the provider user id and foreign fields.
    pub fn apply_tokens(&mut self, tokens: &Tokens) {
        self.access_token = tokens.access_token.expose_secret().clone();
        self.refresh_token = tokens.refresh_token.expose_secret().clone();
        self.access_token_expires = tokens.expires_at.timestamp();
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        // An unrepresentable timestamp is treated as long expired.
        DateTime::from_timestamp(self.access_token_expires, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn to_tokens(&self) -> Tokens {
        Tokens {
            access_token: SecretString::new(self.access_token.clone()),
            refresh_token: SecretString::new(self.refresh_token.clone()),
            expires_at: self.expires_at(),
            token_type: "bearer".to_string(),
            scopes: vec![],
        }
    }

    /// A record is usable only if both tokens are present.
    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("access_token_expires", &self.access_token_expires)
            .field("provider_user_id", &self.provider_user_id)
            .finish()
    }
}
