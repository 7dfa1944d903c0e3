use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::*;
use serde_json::json;

use domain::error::{
    DomainErrorKind, Error as DomainError, ExternalErrorKind, InternalErrorKind, StorageErrorKind,
};
use domain::meeting::UnsavedMeeting;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Domain(DomainError),
    Web(WebErrorKind),
}

/// Failures that originate in the web layer itself.
#[derive(Debug, PartialEq)]
pub enum WebErrorKind {
    /// The user is not logged in, or the provider redirected back with an error.
    Auth,
    /// Required request parameters are missing or malformed.
    Input,
    /// The session store failed.
    Session,
}

/// Response extension marking an answer caused by lost Zoom authorization.
///
/// The authorization gate turns such responses into a redirect to the consent prompt.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReauthorizationRequired;

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Web(web_error_kind) => match web_error_kind {
                WebErrorKind::Auth => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED").into_response(),
                WebErrorKind::Input => (StatusCode::BAD_REQUEST, "BAD REQUEST").into_response(),
                WebErrorKind::Session => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
                }
            },
            Error::Domain(domain_error) => domain_error_response(domain_error),
        }
    }
}

fn domain_error_response(err: DomainError) -> Response {
    match &err.error_kind {
        DomainErrorKind::Internal(internal_error_kind) => match internal_error_kind {
            InternalErrorKind::Storage(storage_error_kind) => match storage_error_kind {
                StorageErrorKind::NotFound => {
                    debug!("Not found: {err}");
                    (StatusCode::NOT_FOUND, "NOT FOUND").into_response()
                }
                StorageErrorKind::Conflict => {
                    warn!("Write conflict: {err}");
                    (StatusCode::CONFLICT, "CONFLICT").into_response()
                }
                StorageErrorKind::Invalid => {
                    warn!("Invalid stored data: {err}");
                    (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE ENTITY").into_response()
                }
                StorageErrorKind::Other => {
                    error!("Storage failure: {err}");
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
                }
            },
            InternalErrorKind::Reconciliation => {
                error!("Meeting needs reconciliation: {err}");
                match UnsavedMeeting::from_error(&err) {
                    Some(unsaved) => (
                        StatusCode::CONFLICT,
                        Json(json!({
                            "error": "meeting created but not saved",
                            "assignment_id": unsaved.assignment_id,
                            "metadata": unsaved.metadata,
                        })),
                    )
                        .into_response(),
                    None => (StatusCode::CONFLICT, "CONFLICT").into_response(),
                }
            }
            InternalErrorKind::Config => {
                error!("Configuration error: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
            }
            InternalErrorKind::Other(_) => {
                error!("Internal error: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
            }
        },
        DomainErrorKind::External(external_error_kind) => match external_error_kind {
            ExternalErrorKind::Auth => {
                warn!("Zoom authorization failed: {err}");
                let mut response = (StatusCode::UNAUTHORIZED, "UNAUTHORIZED").into_response();
                response.extensions_mut().insert(ReauthorizationRequired);
                response
            }
            ExternalErrorKind::Provider(_)
            | ExternalErrorKind::InvalidResponse
            | ExternalErrorKind::Network => {
                warn!("Zoom request failed: {err}");
                (StatusCode::BAD_GATEWAY, "BAD GATEWAY").into_response()
            }
            ExternalErrorKind::Timeout => {
                warn!("Zoom request timed out: {err}");
                (StatusCode::GATEWAY_TIMEOUT, "GATEWAY TIMEOUT").into_response()
            }
        },
    }
}

impl From<DomainError> for Error {
    fn from(err: DomainError) -> Self {
        Error::Domain(err)
    }
}

impl From<tower_sessions::session::Error> for Error {
    fn from(err: tower_sessions::session::Error) -> Self {
        error!("Session store error: {err:?}");
        Error::Web(WebErrorKind::Session)
    }
}
