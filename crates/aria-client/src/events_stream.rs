//! Backend debug event stream.
//!
//! The backend exposes `GET /events` as server-sent events: one JSON
//! object per event, with `: keepalive` comment lines to hold the
//! connection open. Comments never surface here — the SSE parser drops
//! them — so the stream yields only decoded event payloads.

use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::debug;

use crate::errors::{ClientError, Result, check};

/// Open the debug event stream.
///
/// Pass a client WITHOUT a total request timeout — the stream is
/// long-lived by design and a timeout would sever it mid-session.
pub async fn debug_events(
    client: &reqwest::Client,
    base_url: &str,
) -> Result<impl Stream<Item = Result<Value>> + use<>> {
    let url = format!("{}/events", base_url.trim_end_matches('/'));
    debug!(url = %url, "opening debug event stream");

    let response = client
        .get(&url)
        .header(ACCEPT, "text/event-stream")
        .send()
        .await?;
    let response = check(response).await?;

    Ok(response
        .bytes_stream()
        .eventsource()
        .filter_map(|event| async move {
            match event {
                Ok(event) => {
                    if event.data.trim().is_empty() {
                        return None;
                    }
                    Some(serde_json::from_str::<Value>(&event.data).map_err(ClientError::Decode))
                }
                Err(err) => Some(Err(ClientError::Stream(err.to_string()))),
            }
        }))
}
