//! Error types for the `domain` layer.
use meeting_auth::error::{
    Error as MeetingAuthError, ErrorKind as MeetingAuthErrorKind, HttpErrorKind,
    ProviderErrorKind, StorageErrorKind as AuthStorageErrorKind,
};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. The intent is to translate errors between layers while maintaining
/// layer boundaries. Ex. `domain` is dependent on `meeting-auth`, and `web` is dependent on `domain`,
/// but `web` should not be dependent, directly, on `meeting-auth`. Ultimately the various
/// `error_kind`s are used by `web` to return appropriate HTTP status codes and messages to the client.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Storage(StorageErrorKind),
    Config,
    /// A meeting exists at the provider but its identifiers were not persisted.
    Reconciliation,
    Other(String),
}

/// Failures of the profile and assignment stores.
#[derive(Debug, PartialEq)]
pub enum StorageErrorKind {
    NotFound,
    /// The record changed between read and write.
    Conflict,
    Invalid,
    Other,
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    /// The provider rejected a grant, or the user never authorized. Send them to the consent prompt.
    Auth,
    /// Non-2xx status from a provider data endpoint.
    Provider(u16),
    /// A provider response did not have the expected shape.
    InvalidResponse,
    Network,
    Timeout,
}

impl Error {
    pub fn requires_reauthorization(&self) -> bool {
        self.error_kind == DomainErrorKind::External(ExternalErrorKind::Auth)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where we translate errors from the `meeting-auth` layer to the `domain` layer.
impl From<MeetingAuthError> for Error {
    fn from(err: MeetingAuthError) -> Self {
        let error_kind = match &err.error_kind {
            MeetingAuthErrorKind::OAuth(_) | MeetingAuthErrorKind::Token(_) => {
                DomainErrorKind::External(ExternalErrorKind::Auth)
            }
            MeetingAuthErrorKind::Provider(ProviderErrorKind::Status(status)) => {
                DomainErrorKind::External(ExternalErrorKind::Provider(*status))
            }
            MeetingAuthErrorKind::Provider(ProviderErrorKind::InvalidResponse) => {
                DomainErrorKind::External(ExternalErrorKind::InvalidResponse)
            }
            MeetingAuthErrorKind::Http(HttpErrorKind::Timeout) => {
                DomainErrorKind::External(ExternalErrorKind::Timeout)
            }
            MeetingAuthErrorKind::Http(HttpErrorKind::Network) => {
                DomainErrorKind::External(ExternalErrorKind::Network)
            }
            MeetingAuthErrorKind::Http(HttpErrorKind::BuilderFailed) => DomainErrorKind::Internal(
                InternalErrorKind::Other("Failed to build HTTP client".to_string()),
            ),
            MeetingAuthErrorKind::Storage(AuthStorageErrorKind::AtomicUpdateFailed) => {
                DomainErrorKind::Internal(InternalErrorKind::Storage(StorageErrorKind::Conflict))
            }
            MeetingAuthErrorKind::Storage(AuthStorageErrorKind::NotFound) => {
                DomainErrorKind::Internal(InternalErrorKind::Storage(StorageErrorKind::NotFound))
            }
            MeetingAuthErrorKind::Storage(AuthStorageErrorKind::Backend) => {
                DomainErrorKind::Internal(InternalErrorKind::Storage(StorageErrorKind::Other))
            }
            MeetingAuthErrorKind::Config => DomainErrorKind::Internal(InternalErrorKind::Config),
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Storage(
                StorageErrorKind::Invalid,
            )),
        }
    }
}

/// Helper function to create storage errors.
pub fn storage_error(kind: StorageErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Storage(kind)),
    }
}

/// Helper function to create errors that send the user back to the consent prompt.
pub fn auth_error(message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: DomainErrorKind::External(ExternalErrorKind::Auth),
    }
}

/// Helper function to create configuration errors.
pub fn config_error(message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meeting_auth::error::{oauth_error, provider_error, token_error, OAuthErrorKind, TokenErrorKind};

    #[test]
    fn test_rejected_grant_requires_reauthorization() {
        let err: Error = oauth_error(OAuthErrorKind::TokenExchangeFailed, "bad code").into();
        assert!(err.requires_reauthorization());

        let err: Error = token_error(TokenErrorKind::NotFound, "no tokens").into();
        assert!(err.requires_reauthorization());
    }

    #[test]
    fn test_provider_status_is_preserved() {
        let err: Error = provider_error(ProviderErrorKind::Status(404), "missing").into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Provider(404))
        );
        assert!(!err.requires_reauthorization());
    }

    #[test]
    fn test_atomic_update_failure_is_conflict() {
        let err: Error = meeting_auth::error::storage_error(
            AuthStorageErrorKind::AtomicUpdateFailed,
            "rotated",
        )
        .into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Storage(StorageErrorKind::Conflict))
        );
    }
}
