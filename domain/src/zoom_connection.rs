//! Zoom account connection: consent redirect, callback, token access and meetings.
//!
//! One `ZoomBackend` is built at startup and shared by every request, so the
//! per-user refresh locks inside its token manager serialize all refreshes of
//! the process.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::*;
use meeting_auth::{
    credentials::ClientIdentity,
    http::HttpClientConfig,
    oauth::{
        providers::zoom::{Provider as ZoomProvider, ProviderConfig},
        token::Manager,
        Provider, StateManager,
    },
};
use secrecy::SecretString;
use service::config::Config;

use crate::credential::{CredentialRecord, BACKEND_NAME};
use crate::error::{auth_error, config_error, Error};
use crate::gateway::zoom::{Client, CreateMeetingRequest, ZoomMeeting, ZoomUser};
use crate::oauth_token_storage::ProfileTokenStorage;
use crate::profile::{ProfileStore, UserRef, Versioned};

/// Topic of every meeting created for an office-hours queue.
pub const MEETING_TOPIC: &str = "Remote Office Hours Queue Meeting";

const START_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub struct ZoomBackend {
    provider: ZoomProvider,
    tokens: Manager<ProfileTokenStorage>,
    states: StateManager,
    http: HttpClientConfig,
    api_base_url: String,
    meeting_timezone: String,
    meeting_agenda: String,
}

impl ZoomBackend {
    /// Build the backend from configuration. Missing client credentials are a `Config` error.
    pub fn new(config: &Config, profiles: Arc<dyn ProfileStore>) -> Result<Self, Error> {
        let client_id = config
            .zoom_client_id()
            .ok_or_else(|| config_error("ZOOM_CLIENT_ID is not set"))?;
        let client_secret = config
            .zoom_client_secret()
            .ok_or_else(|| config_error("ZOOM_CLIENT_SECRET is not set"))?;
        let identity = ClientIdentity::new(client_id, SecretString::new(client_secret))?;

        let http = HttpClientConfig {
            timeout: Duration::from_secs(config.http_timeout_secs),
            max_retries: config.http_max_retries,
            ..HttpClientConfig::default()
        };

        let provider_config = ProviderConfig {
            scopes: config.zoom_scopes().to_string(),
            expiry_margin: chrono::Duration::seconds(config.token_expiry_margin_secs),
            http: http.clone(),
            ..ProviderConfig::new(config.zoom_redirect_uri())
        }
        .with_base_url(config.zoom_base_url());

        Ok(Self {
            provider: ZoomProvider::new(identity, provider_config)?,
            tokens: Manager::new(ProfileTokenStorage::new(profiles)),
            states: StateManager::new(),
            http,
            api_base_url: config.zoom_base_url().to_string(),
            meeting_timezone: config.zoom_meeting_timezone().to_string(),
            meeting_agenda: config.zoom_meeting_agenda().to_string(),
        })
    }

    pub fn profiles(&self) -> &Arc<dyn ProfileStore> {
        self.storage().profiles()
    }

    fn storage(&self) -> &ProfileTokenStorage {
        self.tokens.storage()
    }

    /// Consent URL for `user`, carrying a fresh single-use CSRF state.
    pub fn authorize_url(&self, user: &UserRef) -> String {
        let state = self.states.generate(&user.id.to_string());
        info!("Redirecting user {} to Zoom OAuth", user.id);
        self.provider.authorization_url(Some(&state))
    }

    /// Handle the consent callback.
    ///
    /// Validates the state, exchanges the code, reads the Zoom profile with the
    /// fresh token and writes the complete credential record once. Nothing is
    /// persisted if any step fails.
    pub async fn exchange_and_store_tokens(
        &self,
        user: &UserRef,
        authorization_code: &str,
        state: &str,
    ) -> Result<CredentialRecord, Error> {
        info!("Processing Zoom OAuth callback for user {}", user.id);

        self.states
            .redeem(state, &user.id.to_string())
            .inspect_err(|e| warn!("Rejected OAuth state for user {}: {}", user.id, e))?;

        let tokens = self
            .provider
            .exchange_code(authorization_code)
            .await
            .inspect_err(|e| warn!("Failed to exchange OAuth code for user {}: {}", user.id, e))?;

        let zoom_user = self
            .client(tokens.access_token.clone())?
            .get_me()
            .await
            .inspect_err(|e| warn!("Failed to get Zoom user info for user {}: {}", user.id, e))?;

        let existing = self.storage().get_record(user.id, BACKEND_NAME).await?;
        let mut record = CredentialRecord::from_tokens(&tokens, Some(zoom_user.id));
        let expected_version = existing.map(|Versioned { value, version }| {
            record.extra = value.extra;
            version
        });

        self.storage()
            .put_record(user.id, BACKEND_NAME, &record, expected_version)
            .await?;

        info!("Successfully stored Zoom OAuth tokens for user {}", user.id);
        Ok(record)
    }

    /// Whether `user` has a usable credential record.
    ///
    /// A record without the Zoom user id cannot host meetings, so it does not count.
    pub async fn has_credentials(&self, user: &UserRef) -> Result<bool, Error> {
        let record = self.storage().get_record(user.id, BACKEND_NAME).await?;
        Ok(record.is_some_and(|stored| {
            stored.value.is_complete()
                && stored
                    .value
                    .provider_user_id
                    .as_deref()
                    .is_some_and(|id| !id.is_empty())
        }))
    }

    /// A valid access token for `user`, refreshed first if it has expired.
    pub async fn get_valid_access_token(&self, user: &UserRef) -> Result<SecretString, Error> {
        let access_token = self
            .tokens
            .get_valid_token(&self.provider, &user.id.to_string())
            .await
            .inspect_err(|e| warn!("Failed to get valid token for user {}: {}", user.id, e))?;
        Ok(access_token)
    }

    /// The Zoom profile behind `user`'s credentials.
    pub async fn fetch_current_user(&self, user: &UserRef) -> Result<ZoomUser, Error> {
        let access_token = self.get_valid_access_token(user).await?;
        self.client(access_token)?.get_me().await
    }

    /// Create a meeting hosted by `user`, starting now.
    pub async fn create_meeting(&self, user: &UserRef) -> Result<ZoomMeeting, Error> {
        let zoom_user_id = self
            .storage()
            .get_record(user.id, BACKEND_NAME)
            .await?
            .and_then(|stored| stored.value.provider_user_id)
            .ok_or_else(|| auth_error("No Zoom user id stored, authorization required"))?;

        let access_token = self.get_valid_access_token(user).await?;
        let request = CreateMeetingRequest {
            topic: MEETING_TOPIC.to_string(),
            start_time: Utc::now().format(START_TIME_FORMAT).to_string(),
            timezone: self.meeting_timezone.clone(),
            agenda: self.meeting_agenda.clone(),
        };

        self.client(access_token)?
            .create_meeting(&zoom_user_id, &request)
            .await
    }

    /// Drop consent states that were never redeemed.
    pub fn cleanup_expired_states(&self) -> usize {
        self.states.cleanup_expired()
    }

    fn client(&self, access_token: SecretString) -> Result<Client, Error> {
        Client::new(access_token, &self.api_base_url, &self.http)
    }
}
