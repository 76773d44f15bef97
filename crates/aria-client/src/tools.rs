//! HTTP tool broker.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use aria_core::tools::ToolOutcome;
use aria_session::ToolBroker;
use aria_settings::BackendSettings;

use crate::errors::{ClientError, Result, check};

/// Executes tool calls against `POST /execute/{name}`.
///
/// Completed calls are cached by call id: the speech model occasionally
/// re-emits a `function_call` it already emitted, and replaying the
/// cached outcome is always safe where re-running the tool is not.
pub struct HttpToolBroker {
    client: reqwest::Client,
    base_url: String,
    completed: Mutex<HashMap<String, ToolOutcome>>,
}

impl HttpToolBroker {
    /// Create a broker from backend settings.
    pub fn new(settings: &BackendSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .build()
            .map_err(ClientError::Http)?;
        Ok(Self::with_client(settings, client))
    }

    /// Create a broker with a shared HTTP client.
    pub fn with_client(settings: &BackendSettings, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            completed: Mutex::new(HashMap::new()),
        }
    }

    async fn execute_inner(&self, call_id: &str, name: &str, arguments: Value) -> Result<ToolOutcome> {
        let url = format!("{}/execute/{name}", self.base_url);
        debug!(call_id, tool = name, "executing tool");

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "call_id": call_id,
                "arguments": arguments,
            }))
            .send()
            .await?;
        let response = check(response).await?;
        let outcome = response.json::<ToolOutcome>().await?;
        Ok(outcome)
    }
}

#[async_trait]
impl ToolBroker for HttpToolBroker {
    #[instrument(skip_all, fields(call_id = %call_id, tool = %name))]
    async fn execute(
        &self,
        call_id: &str,
        name: &str,
        arguments: Value,
    ) -> aria_session::Result<ToolOutcome> {
        if let Some(cached) = self.completed.lock().get(call_id) {
            warn!(call_id, tool = name, "duplicate call id; replaying cached outcome");
            return Ok(cached.clone());
        }

        let outcome = self
            .execute_inner(call_id, name, arguments)
            .await
            .map_err(aria_session::SessionError::from)?;
        let _ = self
            .completed
            .lock()
            .insert(call_id.to_string(), outcome.clone());
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(server: &MockServer) -> BackendSettings {
        BackendSettings {
            base_url: server.uri(),
            request_timeout_ms: 5_000,
        }
    }

    #[tokio::test]
    async fn executes_and_decodes_outcome() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/execute/check_weather"))
            .and(body_partial_json(serde_json::json!({
                "call_id": "call_1",
                "arguments": {"city": "Lisbon"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "output": {"temperature": 18}
            })))
            .mount(&server)
            .await;

        let broker = HttpToolBroker::new(&settings(&server)).unwrap();
        let outcome = broker
            .execute("call_1", "check_weather", serde_json::json!({"city": "Lisbon"}))
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.output.unwrap()["temperature"], 18);
    }

    #[tokio::test]
    async fn duplicate_call_id_does_not_rerun_the_tool() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/execute/send_message"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "output": "sent"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let broker = HttpToolBroker::new(&settings(&server)).unwrap();
        let first = broker
            .execute("call_1", "send_message", serde_json::json!({}))
            .await
            .unwrap();
        let second = broker
            .execute("call_1", "send_message", serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn backend_error_surfaces_as_collaborator_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/execute/check_weather"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let broker = HttpToolBroker::new(&settings(&server)).unwrap();
        let err = broker
            .execute("call_1", "check_weather", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn failed_calls_are_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/execute/flaky"))
            .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
            .expect(2)
            .mount(&server)
            .await;

        let broker = HttpToolBroker::new(&settings(&server)).unwrap();
        assert!(broker.execute("call_1", "flaky", serde_json::json!({})).await.is_err());
        // A retry with the same id must actually retry
        assert!(broker.execute("call_1", "flaky", serde_json::json!({})).await.is_err());
    }
}
