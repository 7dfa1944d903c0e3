//! Token manager with per-user refresh locking.

use std::sync::Arc;

use dashmap::DashMap;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::Storage;
use crate::error::{token_error, Error, ErrorKind, StorageErrorKind, TokenErrorKind};
use crate::oauth::Provider;

/// Token manager that coordinates token retrieval and refresh with per-user locking.
///
/// The per-user locking prevents race conditions when multiple concurrent requests
/// for the same user trigger token refreshes. Without locking, both requests would
/// try to refresh, one would succeed, and the other would fail with an invalid refresh token.
///
/// One manager must be shared by every request of the process for the locks to hold.
pub struct Manager<S: Storage> {
    storage: S,
    refresh_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<S: Storage> Manager<S> {
    /// Create a new token manager with the given storage backend.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            refresh_locks: DashMap::new(),
        }
    }

    /// Get the storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Get a valid access token for a user, refreshing if needed.
    ///
    /// This method:
    /// 1. Retrieves the stored tokens
    /// 2. Checks if the access token is expired
    /// 3. If expired, refreshes the token (with locking to prevent races)
    /// 4. Returns the valid access token
    ///
    /// A refresh rejected by the provider removes the stored record, so the
    /// caller is sent back through the consent flow. Transport failures leave
    /// the record untouched.
    pub async fn get_valid_token<P: Provider + ?Sized>(
        &self,
        provider: &P,
        user_id: &str,
    ) -> Result<SecretString, Error> {
        let provider_id = provider.provider().as_str();

        // Get stored tokens
        let tokens = self
            .storage
            .get(user_id, provider_id)
            .await?
            .ok_or_else(|| token_error(TokenErrorKind::NotFound, "No tokens found for user"))?;

        if !tokens.is_expired() {
            return Ok(tokens.access_token);
        }

        debug!(
            "Token for user {} expired {}s ago, refreshing",
            user_id,
            -tokens.time_until_expiry().num_seconds()
        );

        let lock = self
            .refresh_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.refresh_under_lock(provider, user_id, provider_id).await
        };

        // Drop the lock once no other request holds or awaits it.
        self.refresh_locks
            .remove_if(user_id, |_, entry| Arc::strong_count(entry) == 2);

        result
    }

    /// Refresh the user's token. Callers hold the user's refresh lock.
    async fn refresh_under_lock<P: Provider + ?Sized>(
        &self,
        provider: &P,
        user_id: &str,
        provider_id: &str,
    ) -> Result<SecretString, Error> {
        // Double-check if token is still expired (another request might have refreshed it)
        let tokens = self
            .storage
            .get(user_id, provider_id)
            .await?
            .ok_or_else(|| {
                token_error(TokenErrorKind::NotFound, "Tokens disappeared during refresh")
            })?;

        if !tokens.is_expired() {
            debug!("Token was refreshed by another request");
            return Ok(tokens.access_token);
        }

        let refresh_result = match provider
            .refresh_token(tokens.refresh_token.expose_secret())
            .await
        {
            Ok(result) => result,
            Err(e) if e.requires_reauthorization() => {
                warn!(
                    "Refresh rejected for user {} on {}, dropping stored credentials",
                    user_id, provider_id
                );
                self.storage.delete(user_id, provider_id).await?;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        if refresh_result.refresh_token_rotated {
            // For rotating refresh tokens (Zoom), use atomic update
            debug!("Using atomic update for rotating refresh token");
            let stored = self
                .storage
                .update_atomic(
                    user_id,
                    provider_id,
                    tokens.refresh_token.expose_secret(),
                    refresh_result.tokens.clone(),
                )
                .await;

            match stored {
                Ok(()) => {}
                Err(Error {
                    error_kind: ErrorKind::Storage(StorageErrorKind::AtomicUpdateFailed),
                    ..
                }) => return self.token_rotated_elsewhere(user_id, provider_id).await,
                Err(e) => return Err(e),
            }
        } else {
            self.storage
                .store(user_id, provider_id, refresh_result.tokens.clone())
                .await?;
        }

        info!("Token refreshed successfully for user {}", user_id);

        Ok(refresh_result.tokens.access_token)
    }

    /// Another process rotated the refresh token first; use its result if still fresh.
    async fn token_rotated_elsewhere(
        &self,
        user_id: &str,
        provider_id: &str,
    ) -> Result<SecretString, Error> {
        warn!(
            "Refresh token for user {} was rotated concurrently, re-reading",
            user_id
        );
        match self.storage.get(user_id, provider_id).await? {
            Some(tokens) if !tokens.is_expired() => Ok(tokens.access_token),
            _ => Err(token_error(
                TokenErrorKind::Refresh,
                "Refresh token rotated concurrently and no fresh token is stored",
            )),
        }
    }

}
