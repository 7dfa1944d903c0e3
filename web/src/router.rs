use crate::{
    controller::{
        health_check_controller, meeting_controller, oauth_controller, user_session_controller,
        zoom_controller,
    },
    middleware::zoom_auth::require_zoom_credentials,
    AppState,
};
use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use time::Duration;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

/// All routes behind the authorization gate and the session layer.
pub fn define_routes(app_state: AppState) -> Router {
    let session_layer = session_layer(&app_state);

    Router::new()
        .merge(health_routes())
        .merge(user_session_routes(app_state.clone()))
        .merge(oauth_routes(app_state.clone()))
        .merge(zoom_routes(app_state.clone()))
        .merge(meeting_routes(app_state.clone()))
        .layer(from_fn_with_state(app_state, require_zoom_credentials))
        .layer(session_layer)
}

fn session_layer(app_state: &AppState) -> SessionManagerLayer<MemoryStore> {
    let expiry_seconds =
        i64::try_from(app_state.config.backend_session_expiry_seconds).unwrap_or(i64::MAX);

    SessionManagerLayer::new(MemoryStore::default())
        .with_secure(app_state.config.is_production())
        .with_expiry(Expiry::OnInactivity(Duration::seconds(expiry_seconds)))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn user_session_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/login", post(user_session_controller::login))
        .route("/login", delete(user_session_controller::delete))
        .with_state(app_state)
}

/// Routes for the Zoom consent prompt and callback
fn oauth_routes(app_state: AppState) -> Router {
    let prompt = app_state.gate_paths.prompt.clone();
    let callback = app_state.gate_paths.callback.clone();

    Router::new()
        .route(&prompt, get(oauth_controller::authorize))
        .route(&callback, get(oauth_controller::callback))
        .with_state(app_state)
}

fn zoom_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/zoom/me", get(zoom_controller::me))
        .with_state(app_state)
}

fn meeting_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/assignments/{id}/meeting",
            post(meeting_controller::provision),
        )
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
        Request, StatusCode,
    };
    use axum::response::Response;
    use clap::Parser;
    use domain::meeting::MemoryAssignmentStore;
    use domain::profile::MemoryProfileStore;
    use mockito::{Matcher, Mock, Server};
    use serde_json::{json, Value};
    use service::config::Config;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(base_url: &str) -> Router {
        app_with_args(base_url, &[])
    }

    fn app_with_args(base_url: &str, args: &[&str]) -> Router {
        let mut argv = vec!["office_hours", "--http-max-retries", "0"];
        argv.extend_from_slice(args);
        let config = Config::parse_from(argv)
            .set_zoom_credentials("client".to_string(), "secret".to_string())
            .set_zoom_base_url(base_url.to_string());
        let app_state = AppState::new(
            config,
            Arc::new(MemoryProfileStore::new()),
            Arc::new(MemoryAssignmentStore::new()),
        )
        .unwrap();
        define_routes(app_state)
    }

    fn request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn location(response: &Response) -> String {
        response.headers()[LOCATION].to_str().unwrap().to_string()
    }

    async fn login(app: &Router) -> String {
        let request = Request::builder()
            .method("POST")
            .uri("/login")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("email=host%40example.com"))
            .unwrap();
        let response = send(app, request).await;
        assert_eq!(response.status(), StatusCode::OK);

        response.headers()[SET_COOKIE]
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    async fn mock_zoom_grant(server: &mut Server, profile_calls: usize) -> (Mock, Mock) {
        mock_zoom_grant_expiring_in(server, profile_calls, 3600).await
    }

    async fn mock_zoom_grant_expiring_in(
        server: &mut Server,
        profile_calls: usize,
        expires_in: i64,
    ) -> (Mock, Mock) {
        let token = server
            .mock("POST", "/oauth/token")
            .match_query(Matcher::UrlEncoded(
                "grant_type".into(),
                "authorization_code".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "access_token": "AT1",
                    "token_type": "bearer",
                    "refresh_token": "RT1",
                    "expires_in": expires_in,
                    "scope": "meeting:read meeting:write"
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let profile = server
            .mock("GET", "/v2/users/me")
            .match_header("authorization", "Bearer AT1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "U1", "email": "host@example.com"}"#)
            .expect(profile_calls)
            .create_async()
            .await;
        (token, profile)
    }

    /// Log in and complete the consent flow, returning the session cookie.
    async fn connect(app: &Router) -> String {
        connect_via(app, "/callback/zoom/").await
    }

    async fn connect_via(app: &Router, callback_path: &str) -> String {
        let cookie = login(app).await;

        let prompt = send(app, request("GET", "/auth/zoom/", Some(&cookie))).await;
        let consent_url = location(&prompt);
        let state = consent_url.split("&state=").nth(1).unwrap();

        let callback = send(
            app,
            request(
                "GET",
                &format!("{callback_path}?code=abc123&state={state}"),
                Some(&cookie),
            ),
        )
        .await;
        assert_eq!(callback.status(), StatusCode::FOUND);
        assert_eq!(location(&callback), "/");

        cookie
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = app("http://127.0.0.1:1");
        let response = send(&app, request("GET", "/health", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_anonymous_request_is_not_redirected() {
        let app = app("http://127.0.0.1:1");
        let response = send(&app, request("GET", "/zoom/me", None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_user_without_credentials_is_sent_to_prompt() {
        let app = app("http://127.0.0.1:1");
        let cookie = login(&app).await;

        let response = send(&app, request("GET", "/zoom/me", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/auth/zoom/");

        let response = send(
            &app,
            request("POST", "/assignments/a1/meeting", Some(&cookie)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/auth/zoom/");
    }

    #[tokio::test]
    async fn test_prompt_redirects_to_consent_screen() {
        let server = Server::new_async().await;
        let app = app(&server.url());
        let cookie = login(&app).await;

        let response = send(&app, request("GET", "/auth/zoom/", Some(&cookie))).await;

        assert_eq!(response.status(), StatusCode::FOUND);
        let consent_url = location(&response);
        assert!(consent_url.starts_with(&format!(
            "{}/oauth/authorize?response_type=code&",
            server.url()
        )));
        assert!(consent_url.contains("client_id=client"));
        assert!(consent_url.contains("&state="));
    }

    #[tokio::test]
    async fn test_callback_connects_zoom_account() {
        let mut server = Server::new_async().await;
        let (token, profile) = mock_zoom_grant(&mut server, 2).await;
        let app = app(&server.url());

        let cookie = connect(&app).await;

        let response = send(&app, request("GET", "/zoom/me", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["id"], "U1");

        token.assert_async().await;
        profile.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_code_is_unauthorized_and_stays_gated() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/oauth/token")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"reason": "Invalid authorization code", "error": "invalid_grant"}"#)
            .expect(1)
            .create_async()
            .await;
        let app = app(&server.url());
        let cookie = login(&app).await;

        let prompt = send(&app, request("GET", "/auth/zoom/", Some(&cookie))).await;
        let consent_url = location(&prompt);
        let state = consent_url.split("&state=").nth(1).unwrap();

        let response = send(
            &app,
            request(
                "GET",
                &format!("/callback/zoom/?code=abc123&state={state}"),
                Some(&cookie),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(&app, request("GET", "/zoom/me", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::FOUND);
    }

    #[tokio::test]
    async fn test_callback_without_code_is_bad_request() {
        let app = app("http://127.0.0.1:1");
        let cookie = login(&app).await;

        let response = send(
            &app,
            request("GET", "/callback/zoom/?state=abc", Some(&cookie)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_declined_consent_is_unauthorized() {
        let app = app("http://127.0.0.1:1");
        let cookie = login(&app).await;

        let response = send(
            &app,
            request("GET", "/callback/zoom/?error=access_denied", Some(&cookie)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_meeting_is_provisioned_once() {
        let mut server = Server::new_async().await;
        mock_zoom_grant(&mut server, 1).await;
        let meeting = server
            .mock("POST", "/v2/users/U1/meetings")
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 123, "host_id": "U1", "join_url": "https://zoom.us/j/123"}"#)
            .expect(1)
            .create_async()
            .await;
        let app = app(&server.url());
        let cookie = connect(&app).await;

        let first = send(
            &app,
            request("POST", "/assignments/a1/meeting", Some(&cookie)),
        )
        .await;
        assert_eq!(first.status(), StatusCode::OK);
        let first = json_body(first).await;
        assert_eq!(first["data"]["meeting_id"], 123);
        assert_eq!(first["data"]["meeting_url"], "https://zoom.us/j/123");

        let second = send(
            &app,
            request("POST", "/assignments/a1/meeting", Some(&cookie)),
        )
        .await;
        assert_eq!(json_body(second).await, first);

        meeting.assert_async().await;
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let app = app("http://127.0.0.1:1");
        let cookie = login(&app).await;

        let response = send(&app, request("DELETE", "/login", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, request("GET", "/zoom/me", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_callback_is_served_at_configured_redirect_uri() {
        let mut server = Server::new_async().await;
        let (token, profile) = mock_zoom_grant(&mut server, 2).await;
        let app = app_with_args(
            &server.url(),
            &[
                "--zoom-redirect-uri",
                "https://oh.example.edu/oauth/zoom/complete/",
            ],
        );

        let cookie = connect_via(&app, "/oauth/zoom/complete/").await;

        let response = send(&app, request("GET", "/zoom/me", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);
        token.assert_async().await;
        profile.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_refresh_sends_user_back_to_prompt() {
        let mut server = Server::new_async().await;
        // Expires within the 60s margin, so the first use needs a refresh.
        mock_zoom_grant_expiring_in(&mut server, 1, 30).await;
        let refresh = server
            .mock("POST", "/oauth/token")
            .match_query(Matcher::UrlEncoded(
                "grant_type".into(),
                "refresh_token".into(),
            ))
            .with_status(401)
            .with_body(r#"{"reason": "Invalid Token!", "error": "invalid_request"}"#)
            .expect(1)
            .create_async()
            .await;
        let app = app(&server.url());
        let cookie = connect(&app).await;

        let response = send(&app, request("GET", "/zoom/me", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/auth/zoom/");

        let response = send(&app, request("GET", "/zoom/me", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/auth/zoom/");

        refresh.assert_async().await;
    }
}
