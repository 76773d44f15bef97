//! HTTP cancellation transport.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument};

use aria_core::tools::{CancelAck, CancelStatus};
use aria_session::CancelTransport;
use aria_settings::BackendSettings;

use crate::errors::{ClientError, Result, check};

/// Cancellation requests over `POST /cancel` and `GET /cancel/status`.
pub struct HttpCancelApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCancelApi {
    /// Create a cancellation API client from backend settings.
    pub fn new(settings: &BackendSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .build()
            .map_err(ClientError::Http)?;
        Ok(Self::with_client(settings, client))
    }

    /// Create a cancellation API client with a shared HTTP client.
    pub fn with_client(settings: &BackendSettings, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn request_cancel_inner(&self, immediate: bool, reason: &str) -> Result<CancelAck> {
        let response = self
            .client
            .post(format!("{}/cancel", self.base_url))
            .json(&json!({
                "immediate": immediate,
                "reason": reason,
            }))
            .send()
            .await?;
        let response = check(response).await?;
        Ok(response.json::<CancelAck>().await?)
    }

    async fn poll_status_inner(&self) -> Result<CancelStatus> {
        let response = self
            .client
            .get(format!("{}/cancel/status", self.base_url))
            .send()
            .await?;
        let response = check(response).await?;
        Ok(response.json::<CancelStatus>().await?)
    }
}

#[async_trait]
impl CancelTransport for HttpCancelApi {
    #[instrument(skip(self))]
    async fn request_cancel(
        &self,
        immediate: bool,
        reason: &str,
    ) -> aria_session::Result<CancelAck> {
        debug!(immediate, reason, "requesting cancellation");
        self.request_cancel_inner(immediate, reason)
            .await
            .map_err(aria_session::SessionError::from)
    }

    async fn poll_status(&self) -> aria_session::Result<CancelStatus> {
        self.poll_status_inner()
            .await
            .map_err(aria_session::SessionError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aria_core::tools::CancelLevel;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(server: &MockServer) -> BackendSettings {
        BackendSettings {
            base_url: server.uri(),
            request_timeout_ms: 5_000,
        }
    }

    #[tokio::test]
    async fn cancel_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cancel"))
            .and(body_partial_json(serde_json::json!({
                "immediate": true,
                "reason": "user said stop"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "cancelled": true,
                "level": "immediate",
                "running_tools": ["long_task"],
                "was_already_cancelled": false
            })))
            .mount(&server)
            .await;

        let api = HttpCancelApi::new(&settings(&server)).unwrap();
        let ack = api.request_cancel(true, "user said stop").await.unwrap();

        assert!(ack.cancelled);
        assert_eq!(ack.level, Some(CancelLevel::Immediate));
        assert_eq!(ack.running_tools, vec!["long_task".to_string()]);
    }

    #[tokio::test]
    async fn status_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cancel/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "is_cancellable": true,
                "is_cancelled": false,
                "running_tools": ["long_task"],
                "active_children": 1
            })))
            .mount(&server)
            .await;

        let api = HttpCancelApi::new(&settings(&server)).unwrap();
        let status = api.poll_status().await.unwrap();

        assert!(status.is_cancellable);
        assert!(!status.is_cancelled);
        assert_eq!(status.active_children, 1);
    }

    #[tokio::test]
    async fn backend_rejection_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cancel"))
            .respond_with(ResponseTemplate::new(409).set_body_string("no active run"))
            .mount(&server)
            .await;

        let api = HttpCancelApi::new(&settings(&server)).unwrap();
        let err = api.request_cancel(false, "stop").await.unwrap_err();
        assert!(err.to_string().contains("409"));
    }
}
