//! Zoom REST API client for reading the current user and creating meetings.
//!
//! A client is built per request from a valid access token. Reads go through a
//! client with retry middleware; meeting creation is never retried.

use log::*;
use meeting_auth::{
    error::{provider_error, Error as MeetingAuthError, ProviderErrorKind},
    http::{AuthenticatedClient, AuthenticatedClientBuilder, HttpClientConfig},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// The Zoom user that granted access, from `GET /v2/users/me`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZoomUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload of `POST /v2/users/{id}/meetings`.
#[derive(Debug, Serialize)]
pub struct CreateMeetingRequest {
    pub topic: String,
    /// UTC, formatted `%Y-%m-%dT%H:%M:%SZ`.
    pub start_time: String,
    pub timezone: String,
    pub agenda: String,
}

/// A meeting created at Zoom.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZoomMeeting {
    pub id: u64,
    pub host_id: String,
    pub join_url: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Zoom API client
pub struct Client {
    reads: AuthenticatedClient,
    writes: AuthenticatedClient,
    base_url: String,
}

impl Client {
    /// Create a new Zoom client with the given access token and API host.
    pub fn new(
        access_token: SecretString,
        base_url: &str,
        http: &HttpClientConfig,
    ) -> Result<Self, Error> {
        let reads = AuthenticatedClientBuilder::from_config(http.clone())
            .with_bearer_token(access_token.clone())
            .build()?;
        let writes = AuthenticatedClientBuilder::from_config(http.clone())
            .with_bearer_token(access_token)
            .with_max_retries(0)
            .build()?;

        Ok(Self {
            reads,
            writes,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the Zoom profile of the token's owner.
    pub async fn get_me(&self) -> Result<ZoomUser, Error> {
        let url = format!("{}/v2/users/me", self.base_url);
        debug!("Fetching current Zoom user");

        let response = self
            .reads
            .get(&url)
            .send()
            .await
            .map_err(MeetingAuthError::from)
            .inspect_err(|e| warn!("Failed to reach Zoom users endpoint: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Zoom users endpoint returned {}: {}", status, error_text);
            return Err(provider_error(ProviderErrorKind::Status(status.as_u16()), &error_text).into());
        }

        let user: ZoomUser = response
            .json()
            .await
            .map_err(MeetingAuthError::from)
            .inspect_err(|e| warn!("Failed to parse Zoom user response: {}", e))?;

        if user.id.trim().is_empty() {
            return Err(provider_error(
                ProviderErrorKind::InvalidResponse,
                "Zoom user response has an empty id",
            )
            .into());
        }

        Ok(user)
    }

    /// Create a meeting hosted by the given Zoom user.
    pub async fn create_meeting(
        &self,
        zoom_user_id: &str,
        request: &CreateMeetingRequest,
    ) -> Result<ZoomMeeting, Error> {
        let url = format!(
            "{}/v2/users/{}/meetings",
            self.base_url,
            path_segment(zoom_user_id)
        );
        debug!("Creating Zoom meeting for host {}", zoom_user_id);

        let response = self
            .writes
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(MeetingAuthError::from)
            .inspect_err(|e| warn!("Failed to reach Zoom meetings endpoint: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Zoom meetings endpoint returned {}: {}", status, error_text);
            return Err(provider_error(ProviderErrorKind::Status(status.as_u16()), &error_text).into());
        }

        let meeting: ZoomMeeting = response
            .json()
            .await
            .map_err(MeetingAuthError::from)
            .inspect_err(|e| warn!("Failed to parse Zoom meeting response: {}", e))?;

        if meeting.host_id.is_empty() || meeting.join_url.is_empty() {
            return Err(provider_error(
                ProviderErrorKind::InvalidResponse,
                "Zoom meeting response is missing host_id or join_url",
            )
            .into());
        }

        info!("Created Zoom meeting {}", meeting.id);
        Ok(meeting)
    }
}

// Zoom user ids are alphanumeric with `-` and `_`.
fn path_segment(id: &str) -> String {
    id.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect()
}
