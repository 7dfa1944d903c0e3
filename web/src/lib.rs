//! HTTP surface of the office-hours Zoom integration.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
};
use domain::error::Error as DomainError;
use domain::meeting::{AssignmentStore, MeetingProvisioner};
use domain::profile::ProfileStore;
use domain::zoom_connection::ZoomBackend;
use log::*;
use service::config::Config;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub use error::{Error, Result, WebErrorKind};
pub use middleware::zoom_auth::{decide, Decision, GatePaths};

mod controller;
mod error;
mod extractors;
mod middleware;
mod params;
mod response;
mod router;

const STATE_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub zoom: Arc<ZoomBackend>,
    pub meetings: Arc<MeetingProvisioner>,
    pub gate_paths: Arc<GatePaths>,
}

impl AppState {
    /// Build the shared state. Fails if the Zoom client credentials are not configured
    /// or the redirect URI has no usable callback path.
    pub fn new(
        config: Config,
        profiles: Arc<dyn ProfileStore>,
        assignments: Arc<dyn AssignmentStore>,
    ) -> core::result::Result<Self, DomainError> {
        let gate_paths = Arc::new(GatePaths::from_redirect_uri(config.zoom_redirect_uri())?);
        let zoom = Arc::new(ZoomBackend::new(&config, profiles)?);
        let meetings = Arc::new(MeetingProvisioner::new(zoom.clone(), assignments));
        Ok(Self {
            config,
            zoom,
            meetings,
            gate_paths,
        })
    }
}

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let host = format!("{}:{}", interface, app_state.config.port);

    let cors_layer = CorsLayer::new()
        .allow_methods([Method::DELETE, Method::GET, Method::POST])
        .allow_credentials(true)
        .allow_headers([ACCEPT, CONTENT_TYPE])
        .allow_origin(AllowOrigin::list(allowed_origins(&app_state.config)));

    spawn_state_cleanup(app_state.zoom.clone());

    let listener = TcpListener::bind(&host).await?;
    info!("Server starting... listening for connections on http://{host}");

    axum::serve(listener, router::define_routes(app_state).layer(cors_layer)).await
}

fn allowed_origins(config: &Config) -> Vec<HeaderValue> {
    config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {origin}: {e}");
                None
            }
        })
        .collect()
}

// Consent states that are never redeemed would otherwise live for the whole process.
fn spawn_state_cleanup(zoom: Arc<ZoomBackend>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(STATE_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = zoom.cleanup_expired_states();
            if removed > 0 {
                debug!("Removed {removed} expired OAuth states");
            }
        }
    });
}
