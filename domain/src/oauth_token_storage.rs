//! Profile-backed OAuth token storage.
//!
//! Implements `meeting_auth::oauth::token::Storage` on top of the host application's
//! profile store. Every write is a read-modify-write of the provider's metadata
//! entry, conditional on the version that was read.

use std::sync::Arc;

use async_trait::async_trait;
use log::*;
use meeting_auth::{
    error::{Error, ErrorKind, StorageErrorKind},
    oauth::token::{Storage, Tokens},
};

use crate::credential::CredentialRecord;
use crate::error::{
    DomainErrorKind, Error as DomainError, InternalErrorKind,
    StorageErrorKind as DomainStorageErrorKind,
};
use crate::profile::{Id, ProfileStore, Versioned};

/// Token storage that keeps each user's credentials inside their profile.
#[derive(Clone)]
pub struct ProfileTokenStorage {
    profiles: Arc<dyn ProfileStore>,
}

impl ProfileTokenStorage {
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }

    pub fn profiles(&self) -> &Arc<dyn ProfileStore> {
        &self.profiles
    }

    /// Read the credential record of a user together with its version.
    pub async fn get_record(
        &self,
        user_id: Id,
        provider_id: &str,
    ) -> Result<Option<Versioned<CredentialRecord>>, DomainError> {
        let Some(stored) = self.profiles.backend_metadata(user_id, provider_id).await? else {
            return Ok(None);
        };
        let record: CredentialRecord = serde_json::from_value(stored.value)?;
        Ok(Some(Versioned {
            value: record,
            version: stored.version,
        }))
    }

    /// Write a full credential record if the stored entry is still at `expected_version`.
    pub async fn put_record(
        &self,
        user_id: Id,
        provider_id: &str,
        record: &CredentialRecord,
        expected_version: Option<u64>,
    ) -> Result<u64, DomainError> {
        let value = serde_json::to_value(record)?;
        self.profiles
            .put_backend_metadata(user_id, provider_id, value, expected_version)
            .await
    }
}

fn parse_user_id(user_id: &str) -> Result<Id, Error> {
    Id::parse_str(user_id).map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: ErrorKind::Storage(StorageErrorKind::Backend),
    })
}

fn storage_err(err: DomainError) -> Error {
    let kind = match err.error_kind {
        DomainErrorKind::Internal(InternalErrorKind::Storage(DomainStorageErrorKind::Conflict)) => {
            StorageErrorKind::AtomicUpdateFailed
        }
        DomainErrorKind::Internal(InternalErrorKind::Storage(DomainStorageErrorKind::NotFound)) => {
            StorageErrorKind::NotFound
        }
        _ => StorageErrorKind::Backend,
    };
    Error {
        source: Some(Box::new(err)),
        error_kind: ErrorKind::Storage(kind),
    }
}

fn rotated_elsewhere(message: &str) -> Error {
    meeting_auth::error::storage_error(StorageErrorKind::AtomicUpdateFailed, message)
}

#[async_trait]
impl Storage for ProfileTokenStorage {
    async fn store(&self, user_id: &str, provider_id: &str, tokens: Tokens) -> Result<(), Error> {
        let id = parse_user_id(user_id)?;

        let current = self.get_record(id, provider_id).await.map_err(storage_err)?;
        let (record, expected_version) = match current {
            Some(Versioned { mut value, version }) => {
                value.apply_tokens(&tokens);
                (value, Some(version))
            }
            None => (CredentialRecord::from_tokens(&tokens, None), None),
        };

        self.put_record(id, provider_id, &record, expected_version)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn get(&self, user_id: &str, provider_id: &str) -> Result<Option<Tokens>, Error> {
        let id = parse_user_id(user_id)?;
        let record = self.get_record(id, provider_id).await.map_err(storage_err)?;
        Ok(record
            .filter(|stored| stored.value.is_complete())
            .map(|stored| stored.value.to_tokens()))
    }

    async fn update_atomic(
        &self,
        user_id: &str,
        provider_id: &str,
        old_refresh: &str,
        new_tokens: Tokens,
    ) -> Result<(), Error> {
        let id = parse_user_id(user_id)?;

        let Some(Versioned { mut value, version }) =
            self.get_record(id, provider_id).await.map_err(storage_err)?
        else {
            return Err(rotated_elsewhere("Credential record removed during refresh"));
        };

        if value.refresh_token != old_refresh {
            debug!(
                "Stored refresh token for user {} no longer matches, skipping write",
                user_id
            );
            return Err(rotated_elsewhere("Refresh token was already rotated"));
        }

        value.apply_tokens(&new_tokens);
        self.put_record(id, provider_id, &value, Some(version))
            .await
            .map_err(storage_err)?;

        debug!("Persisted rotated tokens for user {}", user_id);
        Ok(())
    }

    async fn delete(&self, user_id: &str, provider_id: &str) -> Result<(), Error> {
        let id = parse_user_id(user_id)?;
        self.profiles
            .remove_backend_metadata(id, provider_id)
            .await
            .map_err(storage_err)
    }
}
