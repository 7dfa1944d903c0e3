//! Idempotent Zoom meeting provisioning for scheduling assignments.
//!
//! An assignment's metadata is the only record that a meeting exists. A meeting is
//! created only when the metadata has no `meeting_id`, and the merged metadata is
//! persisted before success is reported.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use log::*;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::error::{storage_error, DomainErrorKind, Error, InternalErrorKind, StorageErrorKind};
use crate::gateway::zoom::ZoomMeeting;
use crate::profile::UserRef;
use crate::zoom_connection::ZoomBackend;

pub type Metadata = Map<String, Value>;

/// Persistence of per-assignment metadata, owned by the scheduling domain.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Metadata of an assignment, `None` if nothing was stored yet.
    async fn metadata(&self, assignment_id: &str) -> Result<Option<Metadata>, Error>;

    async fn save_metadata(&self, assignment_id: &str, metadata: Metadata) -> Result<(), Error>;
}

#[derive(Debug, Default)]
pub struct MemoryAssignmentStore {
    assignments: DashMap<String, Metadata>,
}

impl MemoryAssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssignmentStore for MemoryAssignmentStore {
    async fn metadata(&self, assignment_id: &str) -> Result<Option<Metadata>, Error> {
        Ok(self
            .assignments
            .get(assignment_id)
            .map(|entry| entry.value().clone()))
    }

    async fn save_metadata(&self, assignment_id: &str, metadata: Metadata) -> Result<(), Error> {
        self.assignments.insert(assignment_id.to_string(), metadata);
        Ok(())
    }
}

/// A meeting was created but the assignment metadata naming it could not be saved.
///
/// Carried as the source of a `Reconciliation` error so the caller can retry the
/// save with `metadata` instead of creating a second meeting.
#[derive(Debug)]
pub struct UnsavedMeeting {
    pub assignment_id: String,
    pub metadata: Metadata,
    cause: Error,
}

impl UnsavedMeeting {
    /// The unsaved meeting behind a `Reconciliation` error, if any.
    pub fn from_error(err: &Error) -> Option<&UnsavedMeeting> {
        err.source
            .as_ref()
            .and_then(|source| source.downcast_ref::<UnsavedMeeting>())
    }
}

impl fmt::Display for UnsavedMeeting {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "meeting {} for assignment {} was created but not saved",
            self.metadata.get("meeting_id").unwrap_or(&Value::Null),
            self.assignment_id
        )
    }
}

impl StdError for UnsavedMeeting {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.cause)
    }
}

/// True if the metadata already names a meeting.
pub fn has_meeting(metadata: &Metadata) -> bool {
    match metadata.get("meeting_id") {
        None | Some(Value::Null) => false,
        Some(Value::String(id)) => !id.is_empty(),
        Some(_) => true,
    }
}

/// Merge the identifiers of a created meeting into assignment metadata.
pub fn merge_meeting(mut metadata: Metadata, meeting: &ZoomMeeting) -> Metadata {
    metadata.insert("user_id".into(), Value::from(meeting.host_id.clone()));
    metadata.insert("meeting_id".into(), Value::from(meeting.id));
    metadata.insert("numeric_meeting_id".into(), Value::from(meeting.id));
    metadata.insert("meeting_url".into(), Value::from(meeting.join_url.clone()));
    metadata
}

/// Ensure the assignment described by `metadata` has a meeting.
///
/// Metadata that already has a `meeting_id` is returned unchanged without calling
/// Zoom. Otherwise the meeting is hosted by the user named in `user_email`, or by
/// the assignee when no host is named.
pub async fn provision_meeting_for_assignment(
    backend: &ZoomBackend,
    metadata: Option<Metadata>,
    assignee: &UserRef,
) -> Result<Metadata, Error> {
    let metadata = metadata.unwrap_or_default();
    if has_meeting(&metadata) {
        debug!("Assignment already has meeting {}", metadata["meeting_id"]);
        return Ok(metadata);
    }

    let host = match metadata.get("user_email").and_then(Value::as_str) {
        Some(email) if !email.is_empty() => backend
            .profiles()
            .find_by_email(email)
            .await?
            .ok_or_else(|| {
                storage_error(StorageErrorKind::NotFound, "No user found for meeting host")
            })?,
        _ => assignee.clone(),
    };

    let meeting = backend.create_meeting(&host).await?;
    Ok(merge_meeting(metadata, &meeting))
}

/// Provisions meetings for stored assignments, one at a time per assignment.
///
/// Metadata of a meeting that was created but not saved is held until a later
/// call for the same assignment saves it, so a retry never creates a second meeting.
/// The held metadata lives only as long as the process.
pub struct MeetingProvisioner {
    backend: Arc<ZoomBackend>,
    assignments: Arc<dyn AssignmentStore>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    unsaved: DashMap<String, Metadata>,
}

impl MeetingProvisioner {
    pub fn new(backend: Arc<ZoomBackend>, assignments: Arc<dyn AssignmentStore>) -> Self {
        Self {
            backend,
            assignments,
            locks: DashMap::new(),
            unsaved: DashMap::new(),
        }
    }

    pub fn assignments(&self) -> &Arc<dyn AssignmentStore> {
        &self.assignments
    }

    /// Load, provision and save an assignment's metadata.
    ///
    /// Returns a `Reconciliation` error carrying [`UnsavedMeeting`] if the meeting
    /// was created but the save failed. The next call for the assignment retries
    /// the save without calling Zoom.
    pub async fn provision_and_persist(
        &self,
        assignment_id: &str,
        assignee: &UserRef,
    ) -> Result<Metadata, Error> {
        let lock = self
            .locks
            .entry(assignment_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.provision_under_lock(assignment_id, assignee).await
        };

        // Drop the lock once no other call holds or awaits it.
        self.locks
            .remove_if(assignment_id, |_, entry| Arc::strong_count(entry) == 2);

        result
    }

    async fn provision_under_lock(
        &self,
        assignment_id: &str,
        assignee: &UserRef,
    ) -> Result<Metadata, Error> {
        let pending = self
            .unsaved
            .get(assignment_id)
            .map(|entry| entry.value().clone());

        let provisioned = match pending {
            Some(metadata) => {
                info!(
                    "Retrying save of meeting {} for assignment {}",
                    metadata.get("meeting_id").unwrap_or(&Value::Null),
                    assignment_id
                );
                metadata
            }
            None => {
                let metadata = self.assignments.metadata(assignment_id).await?;
                if metadata.as_ref().is_some_and(has_meeting) {
                    return Ok(metadata.unwrap_or_default());
                }
                provision_meeting_for_assignment(&self.backend, metadata, assignee).await?
            }
        };

        if let Err(cause) = self
            .assignments
            .save_metadata(assignment_id, provisioned.clone())
            .await
        {
            error!(
                "Meeting created for assignment {} but metadata was not saved: {}",
                assignment_id, cause
            );
            self.unsaved
                .insert(assignment_id.to_string(), provisioned.clone());
            return Err(Error {
                source: Some(Box::new(UnsavedMeeting {
                    assignment_id: assignment_id.to_string(),
                    metadata: provisioned,
                    cause,
                })),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Reconciliation),
            });
        }
        self.unsaved.remove(assignment_id);

        info!(
            "Provisioned meeting {} for assignment {}",
            provisioned["meeting_id"], assignment_id
        );
        Ok(provisioned)
    }
}
