//! Error types for the `meeting-auth` crate.
//!
//! Follows the same pattern as domain::error with a root Error struct and error kind enums.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for meeting-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in meeting-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// The provider refused a grant. Never retried, the user must consent again.
    OAuth(OAuthErrorKind),
    /// A data call returned a non-2xx status or an unexpected body.
    Provider(ProviderErrorKind),
    Token(TokenErrorKind),
    Storage(StorageErrorKind),
    /// Network failure or timeout before a status was received.
    Http(HttpErrorKind),
    Config,
}

/// Errors from OAuth grant operations.
#[derive(Debug, PartialEq)]
pub enum OAuthErrorKind {
    TokenExchangeFailed,
    TokenRefreshFailed,
    InvalidState,
}

/// Errors from provider data endpoints.
#[derive(Debug, PartialEq)]
pub enum ProviderErrorKind {
    Status(u16),
    InvalidResponse,
}

/// Errors from token management operations.
#[derive(Debug, PartialEq)]
pub enum TokenErrorKind {
    NotFound,
    Refresh,
}

/// Errors from token storage operations.
#[derive(Debug, PartialEq)]
pub enum StorageErrorKind {
    NotFound,
    AtomicUpdateFailed,
    Backend,
}

/// Errors from HTTP client operations.
#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    Timeout,
    Network,
}

impl Error {
    /// True for failures where repeating an idempotent read may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.error_kind,
            ErrorKind::Http(HttpErrorKind::Timeout) | ErrorKind::Http(HttpErrorKind::Network)
        )
    }

    /// True when the stored grant is unusable and the consent prompt must be shown again.
    pub fn requires_reauthorization(&self) -> bool {
        matches!(
            self.error_kind,
            ErrorKind::OAuth(_) | ErrorKind::Token(TokenErrorKind::NotFound)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::OAuth(kind) => write!(f, "OAuth error: {:?}", kind),
            ErrorKind::Provider(kind) => write!(f, "Provider error: {:?}", kind),
            ErrorKind::Token(kind) => write!(f, "Token error: {:?}", kind),
            ErrorKind::Storage(kind) => write!(f, "Storage error: {:?}", kind),
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind),
            ErrorKind::Config => write!(f, "Configuration error"),
        }?;
        if let Some(source) = &self.source {
            write!(f, " ({})", source)?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_timeout() {
            ErrorKind::Http(HttpErrorKind::Timeout)
        } else if err.is_decode() {
            ErrorKind::Provider(ProviderErrorKind::InvalidResponse)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<reqwest_middleware::Error> for Error {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(err) => err.into(),
            reqwest_middleware::Error::Middleware(err) => Error {
                source: Some(err.into()),
                error_kind: ErrorKind::Http(HttpErrorKind::Network),
            },
        }
    }
}

/// Helper function to create OAuth errors.
pub fn oauth_error(kind: OAuthErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::OAuth(kind),
    }
}

/// Helper function to create provider errors.
pub fn provider_error(kind: ProviderErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Provider(kind),
    }
}

/// Helper function to create token errors.
pub fn token_error(kind: TokenErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Token(kind),
    }
}

/// Helper function to create storage errors.
pub fn storage_error(kind: StorageErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Storage(kind),
    }
}

/// Helper function to create configuration errors.
pub fn config_error(message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Config,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_errors_require_reauthorization() {
        let err = oauth_error(OAuthErrorKind::TokenRefreshFailed, "revoked");
        assert!(err.requires_reauthorization());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_network_errors_are_retryable() {
        let err = Error {
            source: None,
            error_kind: ErrorKind::Http(HttpErrorKind::Timeout),
        };
        assert!(err.is_retryable());
        assert!(!err.requires_reauthorization());
    }

    #[test]
    fn test_provider_status_is_not_retryable() {
        let err = provider_error(ProviderErrorKind::Status(404), "no such user");
        assert!(!err.is_retryable());
        assert!(!err.requires_reauthorization());
    }

    #[test]
    fn test_display_includes_source_message() {
        let err = config_error("ZOOM_CLIENT_ID is not set");
        assert_eq!(
            err.to_string(),
            "Configuration error (ZOOM_CLIENT_ID is not set)"
        );
    }
}
