use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;

/// Default Zoom host serving both the OAuth and REST endpoints.
pub const DEFAULT_ZOOM_BASE_URL: &str = "https://zoom.us";

/// Default scopes requested on the Zoom consent screen.
pub const DEFAULT_ZOOM_SCOPES: &str = "meeting:read meeting:write";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl fmt::Display for RustEnvParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "expected one of: development, production, staging")
    }
}

impl std::error::Error for RustEnvParseError {}

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

fn parse_level_filter(level: &str) -> Result<LevelFilter, String> {
    level
        .parse::<LevelFilter>()
        .map_err(|_| format!("invalid log level `{level}`, expected OFF, ERROR, WARN, INFO, DEBUG or TRACE"))
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 8003)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value = "INFO",
        value_parser = parse_level_filter,
    )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
        short,
        long,
        env,
        default_value = "development",
        value_parser = RustEnv::from_str,
    )]
    pub runtime_env: RustEnv,

    /// Session expiry duration in seconds (default: 24 hours = 86400 seconds)
    #[arg(long, env, default_value_t = 86400)]
    pub backend_session_expiry_seconds: u64,

    /// The OAuth client ID of the Zoom app.
    #[arg(long, env)]
    zoom_client_id: Option<String>,

    /// The OAuth client secret of the Zoom app.
    #[arg(long, env, hide_env_values = true)]
    zoom_client_secret: Option<String>,

    /// The redirect URI registered with the Zoom app. Must point at the auth callback path.
    #[arg(long, env, default_value = "http://localhost:8003/callback/zoom/")]
    zoom_redirect_uri: String,

    /// The base URL of the Zoom OAuth and REST API host.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_ZOOM_BASE_URL)]
    zoom_base_url: String,

    /// Space separated OAuth scopes requested on the Zoom consent screen.
    #[arg(long, env, default_value = DEFAULT_ZOOM_SCOPES)]
    zoom_scopes: String,

    /// Time zone sent with every created meeting.
    #[arg(long, env, default_value = "America/Detroit")]
    zoom_meeting_timezone: String,

    /// Agenda sent with every created meeting.
    #[arg(long, env, default_value = "Meeting agenda goes here")]
    zoom_meeting_agenda: String,

    /// Seconds subtracted from a token's lifetime so it is refreshed before the provider rejects it.
    #[arg(long, env, default_value_t = 60)]
    pub token_expiry_margin_secs: i64,

    /// Timeout in seconds for every outbound provider request.
    #[arg(long, env, default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Maximum retries for idempotent provider reads. Grants and meeting creation are never retried.
    #[arg(long, env, default_value_t = 3)]
    pub http_max_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn zoom_client_id(&self) -> Option<String> {
        self.zoom_client_id.clone()
    }

    pub fn zoom_client_secret(&self) -> Option<String> {
        self.zoom_client_secret.clone()
    }

    pub fn set_zoom_credentials(mut self, client_id: String, client_secret: String) -> Self {
        self.zoom_client_id = Some(client_id);
        self.zoom_client_secret = Some(client_secret);
        self
    }

    pub fn zoom_redirect_uri(&self) -> &str {
        &self.zoom_redirect_uri
    }

    /// Returns the Zoom host base URL without a trailing slash.
    pub fn zoom_base_url(&self) -> &str {
        self.zoom_base_url.trim_end_matches('/')
    }

    pub fn set_zoom_base_url(mut self, base_url: String) -> Self {
        self.zoom_base_url = base_url;
        self
    }

    pub fn zoom_scopes(&self) -> &str {
        &self.zoom_scopes
    }

    pub fn zoom_meeting_timezone(&self) -> &str {
        &self.zoom_meeting_timezone
    }

    pub fn zoom_meeting_agenda(&self) -> &str {
        &self.zoom_meeting_agenda
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["office_hours"]);
        assert_eq!(config.port, 8003);
        assert_eq!(config.log_level_filter, LevelFilter::Info);
        assert_eq!(config.runtime_env, RustEnv::Development);
        assert_eq!(config.zoom_scopes(), DEFAULT_ZOOM_SCOPES);
        assert_eq!(config.token_expiry_margin_secs, 60);
        assert_eq!(config.http_max_retries, 3);
    }

    #[test]
    fn test_zoom_settings_from_args() {
        let config = Config::parse_from([
            "office_hours",
            "--zoom-client-id",
            "client",
            "--zoom-client-secret",
            "secret",
            "--zoom-base-url",
            "http://127.0.0.1:1234/",
        ]);
        assert_eq!(config.zoom_client_id().as_deref(), Some("client"));
        assert_eq!(config.zoom_client_secret().as_deref(), Some("secret"));
        assert_eq!(config.zoom_base_url(), "http://127.0.0.1:1234");
    }

    #[test]
    fn test_invalid_log_level_is_rejected() {
        let result = Config::try_parse_from(["office_hours", "--log-level-filter", "LOUD"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_runtime_env_parsing() {
        assert_eq!("PRODUCTION".parse::<RustEnv>(), Ok(RustEnv::Production));
        assert_eq!("staging".parse::<RustEnv>(), Ok(RustEnv::Staging));
        assert_eq!("qa".parse::<RustEnv>(), Err(RustEnvParseError));
    }
}
