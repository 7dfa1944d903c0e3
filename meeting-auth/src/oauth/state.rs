//! CSRF state management for the consent redirect.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::error::{oauth_error, Error, OAuthErrorKind};

/// State data stored between the consent redirect and the callback.
#[derive(Debug, Clone)]
pub struct StateData {
    /// The application user who started the flow.
    pub user_id: String,
    /// When this state expires.
    pub expires_at: DateTime<Utc>,
}

/// Manager for OAuth state parameters with expiration.
///
/// Each state is bound to the user that requested the consent screen and can be
/// redeemed once, by that same user.
#[derive(Clone)]
pub struct StateManager {
    states: Arc<Mutex<HashMap<String, StateData>>>,
    ttl: Duration,
}

impl StateManager {
    /// Create a new state manager with default TTL of 10 minutes.
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(10))
    }

    /// Create a new state manager with custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Generate a new state token bound to `user_id`.
    pub fn generate(&self, user_id: &str) -> String {
        let state = Self::generate_token();
        let data = StateData {
            user_id: user_id.to_string(),
            expires_at: Utc::now() + self.ttl,
        };

        self.lock().insert(state.clone(), data);

        state
    }

    /// Validate and consume a state token for `user_id`.
    ///
    /// The state is removed whether or not validation succeeds.
    pub fn redeem(&self, state: &str, user_id: &str) -> Result<StateData, Error> {
        let data = self
            .lock()
            .remove(state)
            .ok_or_else(|| oauth_error(OAuthErrorKind::InvalidState, "Unknown OAuth state"))?;

        if Utc::now() > data.expires_at {
            return Err(oauth_error(OAuthErrorKind::InvalidState, "OAuth state expired"));
        }
        if data.user_id != user_id {
            return Err(oauth_error(
                OAuthErrorKind::InvalidState,
                "OAuth state belongs to another user",
            ));
        }
        Ok(data)
    }

    /// Clean up expired states.
    ///
    /// Should be called periodically to prevent memory leaks.
    pub fn cleanup_expired(&self) -> usize {
        let mut states = self.lock();
        let before = states.len();
        let now = Utc::now();
        states.retain(|_, data| data.expires_at > now);
        before - states.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StateData>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Generate a cryptographically random state token.
    fn generate_token() -> String {
        let random_bytes: [u8; 32] = rand::thread_rng().gen();
        hex::encode(random_bytes)
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}
