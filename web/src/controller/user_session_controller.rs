//! Session login stand-in.
//!
//! The host application owns real authentication. These endpoints only bind a
//! profile to the session so the Zoom flow can be exercised end to end.

use crate::controller::ApiResponse;
use crate::error::Result as WebResult;
use crate::extractors::current_user::USER_SESSION_KEY;
use crate::params::user::LoginParams;
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Form, Json};
use log::*;
use tower_sessions::Session;

/// Logs the user in and returns a new session cookie.
///
/// Successful login will return a session cookie with id, e.g.:
/// set-cookie: id=07bbbe54-bd35-425f-8e63-618a8d8612df; HttpOnly; SameSite=Strict; Path=/; Max-Age=86399
///
/// Pass the cookie back on every following request, e.g.:
/// curl -v --header "Cookie: id=07bbbe54-bd35-425f-8e63-618a8d8612df" --request GET http://localhost:8003/zoom/me
pub async fn login(
    State(app_state): State<AppState>,
    session: Session,
    Form(params): Form<LoginParams>,
) -> WebResult<impl IntoResponse> {
    let user = app_state.zoom.profiles().find_or_create(&params.email).await?;

    // New session id on login so a pre-login cookie cannot be reused.
    session.cycle_id().await?;
    session.insert(USER_SESSION_KEY, &user).await?;

    info!("User {} logged in", user.id);

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), user)))
}

/// Logs the user out by destroying their session.
pub async fn delete(session: Session) -> WebResult<impl IntoResponse> {
    trace!("UserSessionController::delete()");
    session.flush().await?;
    Ok(StatusCode::OK)
}
