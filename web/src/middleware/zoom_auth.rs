//! Authorization gate: send logged-in users without Zoom credentials to the consent prompt.
//!
//! The policy is the pure function [`decide`]; [`require_zoom_credentials`] applies
//! it to every request.

use axum::{
    extract::{Request, State},
    http::Uri,
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::error::{config_error, Error as DomainError};
use log::*;
use tower_sessions::Session;

use crate::error::{Error, ReauthorizationRequired};
use crate::extractors::current_user::session_user;
use crate::response::found;
use crate::AppState;

pub const DEFAULT_PROMPT_PATH: &str = "/auth/zoom/";
pub const DEFAULT_CALLBACK_PATH: &str = "/callback/zoom/";

/// Paths that must stay reachable while a user has no credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatePaths {
    pub prompt: String,
    pub callback: String,
    /// Application paths outside the Zoom flow, e.g. logout and health checks.
    pub exempt: Vec<String>,
}

impl GatePaths {
    /// Default paths with the callback taken from the OAuth redirect URI, so the
    /// route Zoom redirects to is the one that is served and allowed through.
    pub fn from_redirect_uri(redirect_uri: &str) -> Result<Self, DomainError> {
        let uri: Uri = redirect_uri.parse().map_err(|e| {
            warn!("Invalid Zoom redirect URI {redirect_uri}: {e}");
            config_error("ZOOM_REDIRECT_URI is not a valid URI")
        })?;

        let callback = uri.path();
        let defaults = Self::default();
        if callback.len() < 2
            || callback.contains(['{', '}', '*'])
            || callback == defaults.prompt
            || defaults.exempt.iter().any(|p| p == callback)
        {
            return Err(config_error(
                "ZOOM_REDIRECT_URI must name a dedicated callback path",
            ));
        }

        Ok(Self {
            callback: callback.to_string(),
            ..defaults
        })
    }

    fn is_reachable(&self, path: &str) -> bool {
        path == self.prompt || path == self.callback || self.exempt.iter().any(|p| p == path)
    }
}

impl Default for GatePaths {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT_PATH.to_string(),
            callback: DEFAULT_CALLBACK_PATH.to_string(),
            exempt: vec!["/health".to_string(), "/login".to_string()],
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Decision {
    Passthrough,
    Redirect(String),
}

/// Decide what happens to a request.
///
/// Anonymous requests and users with a credential record pass. The prompt and
/// callback paths always pass so the consent flow can complete, as do the exempt
/// paths. Everything else is redirected to the prompt.
pub fn decide(
    path: &str,
    is_authenticated: bool,
    has_credential: bool,
    paths: &GatePaths,
) -> Decision {
    if !is_authenticated || has_credential {
        return Decision::Passthrough;
    }
    if paths.is_reachable(path) {
        return Decision::Passthrough;
    }
    Decision::Redirect(paths.prompt.clone())
}

/// Axum middleware applying [`decide`] with the session user and the credential store.
///
/// A failing store lookup is answered with an error response, never a pass.
pub async fn require_zoom_credentials(
    State(app_state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    let user = match session_user(&session).await {
        Ok(user) => user,
        Err(e) => return Error::from(e).into_response(),
    };

    let has_credential = match &user {
        Some(user) => match app_state.zoom.has_credentials(user).await {
            Ok(has_credential) => has_credential,
            Err(e) => {
                warn!("Credential lookup failed for user {}: {e}", user.id);
                return Error::from(e).into_response();
            }
        },
        None => false,
    };

    let path = request.uri().path().to_string();
    match decide(&path, user.is_some(), has_credential, &app_state.gate_paths) {
        Decision::Passthrough => {
            let response = next.run(request).await;
            // A failed callback stays a visible failure; elsewhere lost authorization re-prompts.
            if user.is_some()
                && path != app_state.gate_paths.callback
                && response.extensions().get::<ReauthorizationRequired>().is_some()
            {
                info!("Zoom authorization lost for {path}, redirecting to consent prompt");
                return found(&app_state.gate_paths.prompt);
            }
            response
        }
        Decision::Redirect(prompt) => {
            debug!("No Zoom credentials for {path}, redirecting to {prompt}");
            found(&prompt)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_requests_pass() {
        let paths = GatePaths::default();
        assert_eq!(
            decide("/queue/1", false, false, &paths),
            Decision::Passthrough
        );
    }

    #[test]
    fn test_users_with_credentials_pass() {
        let paths = GatePaths::default();
        assert_eq!(decide("/queue/1", true, true, &paths), Decision::Passthrough);
    }

    #[test]
    fn test_users_without_credentials_are_redirected() {
        let paths = GatePaths::default();
        assert_eq!(
            decide("/queue/1", true, false, &paths),
            Decision::Redirect("/auth/zoom/".to_string())
        );
        assert_eq!(
            decide("/", true, false, &paths),
            Decision::Redirect("/auth/zoom/".to_string())
        );
    }

    #[test]
    fn test_prompt_and_callback_are_always_reachable() {
        let paths = GatePaths::default();
        assert_eq!(
            decide("/auth/zoom/", true, false, &paths),
            Decision::Passthrough
        );
        assert_eq!(
            decide("/callback/zoom/", true, false, &paths),
            Decision::Passthrough
        );
    }

    #[test]
    fn test_path_match_is_exact() {
        let paths = GatePaths::default();
        assert_eq!(
            decide("/auth/zoom/extra", true, false, &paths),
            Decision::Redirect("/auth/zoom/".to_string())
        );
        assert_eq!(
            decide("/auth/zoom", true, false, &paths),
            Decision::Redirect("/auth/zoom/".to_string())
        );
    }

    #[test]
    fn test_custom_paths() {
        let paths = GatePaths {
            prompt: "/connect/".to_string(),
            callback: "/connect/done/".to_string(),
            exempt: vec![],
        };
        assert_eq!(
            decide("/connect/done/", true, false, &paths),
            Decision::Passthrough
        );
        assert_eq!(
            decide("/other", true, false, &paths),
            Decision::Redirect("/connect/".to_string())
        );
        assert_eq!(
            decide("/health", true, false, &paths),
            Decision::Redirect("/connect/".to_string())
        );
    }

    #[test]
    fn test_exempt_paths_pass() {
        let paths = GatePaths::default();
        assert_eq!(decide("/health", true, false, &paths), Decision::Passthrough);
        assert_eq!(decide("/login", true, false, &paths), Decision::Passthrough);
    }

    #[test]
    fn test_callback_follows_redirect_uri() {
        let paths =
            GatePaths::from_redirect_uri("https://oh.example.edu/oauth/zoom/complete/").unwrap();
        assert_eq!(paths.callback, "/oauth/zoom/complete/");
        assert_eq!(paths.prompt, DEFAULT_PROMPT_PATH);
        assert_eq!(
            decide("/oauth/zoom/complete/", true, false, &paths),
            Decision::Passthrough
        );
        assert_eq!(
            decide("/callback/zoom/", true, false, &paths),
            Decision::Redirect("/auth/zoom/".to_string())
        );

        let paths = GatePaths::from_redirect_uri("http://localhost:8003/callback/zoom/").unwrap();
        assert_eq!(paths, GatePaths::default());
    }

    #[test]
    fn test_unusable_redirect_uri_is_config_error() {
        for redirect_uri in [
            "not a uri",
            "https://oh.example.edu",
            "https://oh.example.edu/auth/zoom/",
            "https://oh.example.edu/health",
            "https://oh.example.edu/cb/{id}",
        ] {
            let err = GatePaths::from_redirect_uri(redirect_uri).unwrap_err();
            assert_eq!(
                err.error_kind,
                domain::error::DomainErrorKind::Internal(
                    domain::error::InternalErrorKind::Config
                ),
                "{redirect_uri}"
            );
        }
    }
}
