//! User profiles and their per-backend metadata.
//!
//! The profile store is owned by the host application. This layer only reads and
//! writes the metadata sub-map of one backend (e.g. `"zoom"`) at a time, and every
//! write is conditional on the version it read.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{storage_error, Error, StorageErrorKind};

pub type Id = uuid::Uuid;

/// The application-level identity of a user, passed explicitly into every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: Id,
    pub email: String,
}

/// A value together with the store version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_by_id(&self, id: Id) -> Result<Option<UserRef>, Error>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRef>, Error>;

    /// Look up a user by email, creating an empty profile on first sight.
    async fn find_or_create(&self, email: &str) -> Result<UserRef, Error>;

    /// Read the metadata stored for one backend.
    async fn backend_metadata(
        &self,
        user_id: Id,
        backend: &str,
    ) -> Result<Option<Versioned<Value>>, Error>;

    /// Write the metadata of one backend if it is still at `expected_version`.
    ///
    /// `None` means the entry must not exist yet. Returns the new version, or a
    /// `StorageErrorKind::Conflict` error if another writer got there first.
    async fn put_backend_metadata(
        &self,
        user_id: Id,
        backend: &str,
        value: Value,
        expected_version: Option<u64>,
    ) -> Result<u64, Error>;

    async fn remove_backend_metadata(&self, user_id: Id, backend: &str) -> Result<(), Error>;
}

#[derive(Debug)]
struct ProfileEntry {
    user: UserRef,
    backend_metadata: HashMap<String, Versioned<Value>>,
}

#[derive(Debug, Default)]
struct Profiles {
    users: HashMap<Id, ProfileEntry>,
    by_email: HashMap<String, Id>,
    // Versions are unique across the store so a removed and recreated entry never
    // matches a stale expected version.
    last_version: u64,
}

/// In-process profile store used by the development server and tests.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    inner: RwLock<Profiles>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn find_by_id(&self, id: Id) -> Result<Option<UserRef>, Error> {
        let profiles = self.inner.read().await;
        Ok(profiles.users.get(&id).map(|entry| entry.user.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRef>, Error> {
        let profiles = self.inner.read().await;
        Ok(profiles
            .by_email
            .get(&normalize_email(email))
            .and_then(|id| profiles.users.get(id))
            .map(|entry| entry.user.clone()))
    }

    async fn find_or_create(&self, email: &str) -> Result<UserRef, Error> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(storage_error(StorageErrorKind::Invalid, "Email is empty"));
        }

        let mut profiles = self.inner.write().await;
        if let Some(entry) = profiles
            .by_email
            .get(&email)
            .and_then(|id| profiles.users.get(id))
        {
            return Ok(entry.user.clone());
        }

        let user = UserRef {
            id: Id::new_v4(),
            email: email.clone(),
        };
        profiles.by_email.insert(email, user.id);
        profiles.users.insert(
            user.id,
            ProfileEntry {
                user: user.clone(),
                backend_metadata: HashMap::new(),
            },
        );
        Ok(user)
    }

    async fn backend_metadata(
        &self,
        user_id: Id,
        backend: &str,
    ) -> Result<Option<Versioned<Value>>, Error> {
        let profiles = self.inner.read().await;
        let entry = profiles
            .users
            .get(&user_id)
            .ok_or_else(|| storage_error(StorageErrorKind::NotFound, "Unknown user"))?;
        Ok(entry.backend_metadata.get(backend).cloned())
    }

    async fn put_backend_metadata(
        &self,
        user_id: Id,
        backend: &str,
        value: Value,
        expected_version: Option<u64>,
    ) -> Result<u64, Error> {
        let mut guard = self.inner.write().await;
        let profiles = &mut *guard;
        let entry = profiles
            .users
            .get_mut(&user_id)
            .ok_or_else(|| storage_error(StorageErrorKind::NotFound, "Unknown user"))?;

        let current = entry.backend_metadata.get(backend).map(|v| v.version);
        if current != expected_version {
            return Err(storage_error(
                StorageErrorKind::Conflict,
                &format!(
                    "{} metadata is at version {:?}, expected {:?}",
                    backend, current, expected_version
                ),
            ));
        }

        profiles.last_version += 1;
        let version = profiles.last_version;
        entry
            .backend_metadata
            .insert(backend.to_string(), Versioned { value, version });
        Ok(version)
    }

    async fn remove_backend_metadata(&self, user_id: Id, backend: &str) -> Result<(), Error> {
        let mut profiles = self.inner.write().await;
        if let Some(entry) = profiles.users.get_mut(&user_id) {
            entry.backend_metadata.remove(backend);
        }
        Ok(())
    }
}
