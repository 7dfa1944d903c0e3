//! Controller for the Zoom consent prompt and callback.
//!
//! Both paths stay reachable for users without credentials; the authorization gate
//! sends everyone else here.

use crate::extractors::current_user::CurrentUser;
use crate::params::oauth::CallbackParams;
use crate::response::found;
use crate::{AppState, Error};

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use log::*;

use crate::error::WebErrorKind;

/// GET /auth/zoom/
///
/// Redirects to the Zoom consent screen with a CSRF state bound to the user.
pub async fn authorize(
    CurrentUser(user): CurrentUser,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    found(&app_state.zoom.authorize_url(&user))
}

/// GET /callback/zoom/
///
/// Exchanges the authorization code, stores the credential record and sends the
/// user back to the application root.
pub async fn callback(
    CurrentUser(user): CurrentUser,
    State(app_state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, Error> {
    if let Some(error) = params.error {
        warn!("User {} declined Zoom authorization: {}", user.id, error);
        return Err(Error::Web(WebErrorKind::Auth));
    }

    let code = params.code.ok_or(Error::Web(WebErrorKind::Input))?;
    let state = params.state.ok_or(Error::Web(WebErrorKind::Input))?;

    app_state
        .zoom
        .exchange_and_store_tokens(&user, &code, &state)
        .await?;

    Ok(found("/"))
}
