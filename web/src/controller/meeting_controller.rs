use crate::controller::ApiResponse;
use crate::extractors::current_user::CurrentUser;
use crate::{AppState, Error};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use log::*;

/// POST /assignments/{id}/meeting
///
/// Ensures the assignment has a Zoom meeting and returns its metadata. Calling it
/// again returns the same meeting.
pub async fn provision(
    CurrentUser(user): CurrentUser,
    State(app_state): State<AppState>,
    Path(assignment_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    debug!("Provisioning meeting for assignment {assignment_id}");

    let metadata = app_state
        .meetings
        .provision_and_persist(&assignment_id, &user)
        .await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), metadata)))
}
