//! Token storage trait for persisting OAuth tokens.

use async_trait::async_trait;

use super::Tokens;
use crate::error::Error;

/// Trait for storing and retrieving OAuth tokens.
///
/// CRITICAL: Implementations must support atomic updates for Zoom's rotating refresh tokens.
/// The `update_atomic` method ensures that concurrent refresh attempts don't cause race conditions.
///
/// Implementations should:
/// - Treat every write as read-modify-write of the provider-scoped record
/// - Leave fields they do not own (e.g. the provider-side user id) untouched
/// - Handle concurrent access safely
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store tokens for a user and provider, creating the record if needed.
    ///
    /// # Arguments
    ///
    /// * `user_id` - Unique user identifier
    /// * `provider_id` - Provider identifier (e.g., "zoom")
    /// * `tokens` - The tokens to store
    async fn store(&self, user_id: &str, provider_id: &str, tokens: Tokens) -> Result<(), Error>;

    /// Retrieve tokens for a user and provider.
    ///
    /// # Returns
    ///
    /// `Some(Tokens)` if found, `None` if not found.
    async fn get(&self, user_id: &str, provider_id: &str) -> Result<Option<Tokens>, Error>;

    /// Atomically update tokens if the stored refresh token still equals `old_refresh`.
    ///
    /// # Returns
    ///
    /// `Ok(())` if update succeeded, `Err` with `StorageErrorKind::AtomicUpdateFailed`
    /// if the refresh token was already rotated by someone else.
    async fn update_atomic(
        &self,
        user_id: &str,
        provider_id: &str,
        old_refresh: &str,
        new_tokens: Tokens,
    ) -> Result<(), Error>;

    /// Drop the credential record so the user is treated as unauthorized again.
    async fn delete(&self, user_id: &str, provider_id: &str) -> Result<(), Error>;
}
