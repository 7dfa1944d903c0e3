use crate::controller::ApiResponse;
use crate::extractors::current_user::CurrentUser;
use crate::{AppState, Error};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

/// GET /zoom/me
///
/// The Zoom profile connected to the logged-in user.
pub async fn me(
    CurrentUser(user): CurrentUser,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    let zoom_user = app_state.zoom.fetch_current_user(&user).await?;
    Ok(Json(ApiResponse::new(StatusCode::OK.into(), zoom_user)))
}
