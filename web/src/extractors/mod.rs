pub(crate) mod current_user;

use axum::http::StatusCode;

type RejectionType = (StatusCode, String);
