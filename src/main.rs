use domain::{meeting::MemoryAssignmentStore, profile::MemoryProfileStore};
use log::{error, info};
use service::{config::Config, logging::Logger};
use std::sync::Arc;
use web::AppState;

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to initialize logger: {e}");
    }

    info!("Starting up office hours Zoom integration...");

    let profiles = Arc::new(MemoryProfileStore::new());
    let assignments = Arc::new(MemoryAssignmentStore::new());

    let app_state = match AppState::new(config, profiles, assignments) {
        Ok(app_state) => app_state,
        Err(e) => {
            error!("Failed to initialize Zoom integration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = web::init_server(app_state).await {
        error!("Server exited with error: {e}");
        std::process::exit(1);
    }
}
