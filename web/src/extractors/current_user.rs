use crate::extractors::RejectionType;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use domain::UserRef;
use log::*;
use tower_sessions::Session;

/// Session key holding the logged-in [`UserRef`].
pub(crate) const USER_SESSION_KEY: &str = "user";

/// The application user of the current request.
pub(crate) struct CurrentUser(pub UserRef);

/// Read the logged-in user from the session, if any.
pub(crate) async fn session_user(
    session: &Session,
) -> Result<Option<UserRef>, tower_sessions::session::Error> {
    session.get::<UserRef>(USER_SESSION_KEY).await
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = RejectionType;

    // Resolves the user from the tower-sessions session. Requests without a logged-in
    // user are rejected with 401.
    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(status, msg)| (status, msg.to_string()))?;

        match session_user(&session).await {
            Ok(Some(user)) => Ok(CurrentUser(user)),
            Ok(None) => Err((StatusCode::UNAUTHORIZED, "Unauthorized".to_string())),
            Err(e) => {
                error!("Failed to read user from session: {e:?}");
                Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                ))
            }
        }
    }
}
