//! Session control API.
//!
//! Sessions persist on the backend across client disconnects; resuming
//! one returns both its metadata and the conversation context to inject
//! into a fresh speech-model session.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use aria_core::events::ConversationItem;
use aria_settings::BackendSettings;

use crate::errors::{ClientError, Result, check};

/// Persistent session metadata.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionInfo {
    /// Session identifier.
    pub id: String,
    /// Backend lifecycle state (`active`, `ended`, ...).
    pub status: String,
    /// Creation timestamp, RFC 3339.
    pub created_at: Option<String>,
    /// Last update timestamp, RFC 3339.
    pub updated_at: Option<String>,
    /// Why the session ended, when it did.
    pub end_reason: Option<String>,
}

/// One line of the stored transcript.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptEntry {
    /// `user` or `assistant`.
    pub role: String,
    /// Spoken text.
    pub text: String,
}

/// Everything needed to pick a session back up.
#[derive(Clone, Debug, Deserialize)]
pub struct ResumeBundle {
    /// The resumed session's metadata.
    pub session: SessionInfo,
    /// Conversation items to inject into the new model session, in order.
    #[serde(default)]
    pub context_to_inject: Vec<ConversationItem>,
    /// Stored transcript, for display.
    #[serde(default)]
    pub transcript: Vec<TranscriptEntry>,
}

#[derive(Deserialize)]
struct RealtimeCredential {
    client_secret: ClientSecret,
}

#[derive(Deserialize)]
struct ClientSecret {
    value: String,
}

/// Client for the backend's session-control endpoints.
pub struct SessionControlClient {
    client: reqwest::Client,
    base_url: String,
}

impl SessionControlClient {
    /// Create a session-control client from backend settings.
    pub fn new(settings: &BackendSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .build()
            .map_err(ClientError::Http)?;
        Ok(Self::with_client(settings, client))
    }

    /// Create a session-control client with a shared HTTP client.
    pub fn with_client(settings: &BackendSettings, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a new persistent session.
    #[instrument(skip(self))]
    pub async fn create_session(&self) -> Result<SessionInfo> {
        let response = self
            .client
            .post(format!("{}/sessions", self.base_url))
            .send()
            .await?;
        let response = check(response).await?;
        let info = response.json::<SessionInfo>().await?;
        info!(session_id = %info.id, "session created");
        Ok(info)
    }

    /// Fetch one session's metadata.
    pub async fn get_session(&self, id: &str) -> Result<SessionInfo> {
        let response = self
            .client
            .get(format!("{}/sessions/{id}", self.base_url))
            .send()
            .await?;
        let response = check(response).await?;
        Ok(response.json::<SessionInfo>().await?)
    }

    /// List known sessions.
    pub async fn list_sessions(&self) -> Result<Vec<SessionInfo>> {
        let response = self
            .client
            .get(format!("{}/sessions", self.base_url))
            .send()
            .await?;
        let response = check(response).await?;
        Ok(response.json::<Vec<SessionInfo>>().await?)
    }

    /// Mark a session ended, recording why.
    #[instrument(skip(self, error_details))]
    pub async fn end_session(
        &self,
        id: &str,
        reason: &str,
        error_details: Option<&str>,
    ) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/sessions/{id}/end", self.base_url))
            .json(&serde_json::json!({
                "reason": reason,
                "error_details": error_details,
            }))
            .send()
            .await?;
        let _ = check(response).await?;
        debug!(session_id = id, reason, "session ended");
        Ok(())
    }

    /// Resume a session, returning the context to replay into the model.
    #[instrument(skip(self))]
    pub async fn resume_session(&self, id: &str) -> Result<ResumeBundle> {
        let response = self
            .client
            .post(format!("{}/sessions/{id}/resume", self.base_url))
            .send()
            .await?;
        let response = check(response).await?;
        let bundle = response.json::<ResumeBundle>().await?;
        info!(
            session_id = id,
            context_items = bundle.context_to_inject.len(),
            "session resumed"
        );
        Ok(bundle)
    }

    /// Mint an ephemeral credential for connecting to the speech model.
    ///
    /// The real API key never reaches this process; the backend holds it
    /// and hands out short-lived client secrets.
    pub async fn create_realtime_credential(&self) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/session", self.base_url))
            .send()
            .await?;
        let response = check(response).await?;
        let credential = response.json::<RealtimeCredential>().await?;
        Ok(credential.client_secret.value)
    }
}
