//! Transport error types.

use aria_session::SessionError;

/// Errors raised by the HTTP collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request itself failed (connect, timeout, TLS).
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it was readable.
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The SSE stream broke mid-flight.
    #[error("event stream error: {0}")]
    Stream(String),
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, ClientError>;

impl From<ClientError> for SessionError {
    fn from(err: ClientError) -> Self {
        SessionError::Collaborator(err.to_string())
    }
}

/// Map non-success statuses to [`ClientError::Api`], keeping the body as
/// the message.
pub(crate) async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
