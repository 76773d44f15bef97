//! Response lifecycle coordination.
//!
//! The model accepts only one in-flight response at a time: sending
//! `response.create` while another response is streaming is a protocol
//! error. [`ResponseLifecycleCoordinator`] serializes announcements — a
//! tool result that lands mid-response is queued and announced once the
//! current response settles, after a short grace window so rapid
//! back-to-back responses coalesce into a single announcement.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use metrics::gauge;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use aria_core::events::{ClientEvent, ConversationItem};
use aria_core::tools::ToolOutcome;

use crate::errors::{Result, SessionError};

/// A tool result waiting for the active response to finish.
#[derive(Clone, Debug)]
struct PendingAnnouncement {
    call_id: String,
    tool_name: String,
}

#[derive(Default)]
struct Inner {
    /// Whether a model response is currently streaming.
    in_progress: bool,
    /// Results queued while a response was in progress.
    pending: Vec<PendingAnnouncement>,
    /// Call ids whose results were already delivered to the model.
    delivered: HashSet<String>,
    /// Bumped on every created/done edge; a grace timer only flushes if
    /// the generation it captured is still current.
    generation: u64,
}

/// Serializes tool-result announcements against the model's
/// one-response-at-a-time constraint.
pub struct ResponseLifecycleCoordinator {
    inner: Arc<Mutex<Inner>>,
    outbound: mpsc::Sender<ClientEvent>,
    grace: Duration,
}

impl ResponseLifecycleCoordinator {
    /// Create a coordinator writing client events to `outbound`.
    ///
    /// `grace` is how long to wait after `response.done` before flushing
    /// queued announcements.
    pub fn new(outbound: mpsc::Sender<ClientEvent>, grace: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            outbound,
            grace,
        }
    }

    /// The model started a response.
    pub fn on_response_created(&self) {
        let mut inner = self.inner.lock();
        inner.in_progress = true;
        inner.generation += 1;
        gauge!("aria_response_in_progress").set(1.0);
        debug!(generation = inner.generation, "response started");
    }

    /// The model finished a response; arm the grace timer if results are
    /// (or become) queued.
    pub fn on_response_done(&self) {
        let generation = {
            let mut inner = self.inner.lock();
            inner.in_progress = false;
            inner.generation += 1;
            gauge!("aria_response_in_progress").set(0.0);
            debug!(generation = inner.generation, pending = inner.pending.len(), "response done");
            inner.generation
        };

        let inner = Arc::clone(&self.inner);
        let outbound = self.outbound.clone();
        let grace = self.grace;
        let _ = tokio::spawn(async move {
            sleep(grace).await;
            let flush = {
                let mut guard = inner.lock();
                // A newer created/done edge owns the flush now.
                if guard.generation != generation || guard.in_progress || guard.pending.is_empty() {
                    None
                } else {
                    Some(std::mem::take(&mut guard.pending))
                }
            };
            if let Some(pending) = flush {
                let names: Vec<&str> = pending.iter().map(|p| p.tool_name.as_str()).collect();
                info!(tools = ?names, "announcing queued tool results");
                let instructions = format!(
                    "The following tool calls have completed: {}. \
                     Briefly tell the user what happened.",
                    names.join(", ")
                );
                if outbound
                    .send(ClientEvent::response_with_instructions(instructions))
                    .await
                    .is_err()
                {
                    warn!("outbound channel closed while flushing announcements");
                }
            }
        });
    }

    /// Deliver a tool result to the model.
    ///
    /// The `function_call_output` item is always sent immediately — the
    /// model must have the data regardless of announcement timing. Only
    /// the `response.create` that voices it is gated: deferred while a
    /// response is in progress, immediate otherwise. Duplicate call ids
    /// are dropped entirely.
    pub async fn handle_tool_result(
        &self,
        call_id: &str,
        tool_name: &str,
        outcome: &ToolOutcome,
    ) -> Result<()> {
        {
            let mut inner = self.inner.lock();
            if !inner.delivered.insert(call_id.to_string()) {
                debug!(call_id, tool_name, "duplicate tool result dropped");
                return Ok(());
            }
        }

        let item = ConversationItem::function_output(call_id, outcome);
        self.outbound
            .send(ClientEvent::ConversationItemCreate { item })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;

        let announce_now = {
            let mut inner = self.inner.lock();
            if inner.in_progress {
                inner.pending.push(PendingAnnouncement {
                    call_id: call_id.to_string(),
                    tool_name: tool_name.to_string(),
                });
                debug!(call_id, tool_name, queued = inner.pending.len(), "announcement deferred");
                false
            } else {
                true
            }
        };

        if announce_now {
            debug!(call_id, tool_name, "announcing tool result");
            self.outbound
                .send(ClientEvent::response_create())
                .await
                .map_err(|_| SessionError::ChannelClosed)?;
        }
        Ok(())
    }

    /// Deliver a tool result without ever voicing it.
    ///
    /// Same dedupe as [`Self::handle_tool_result`], but no
    /// `response.create` now or later. Used for results whose whole point
    /// is silence, such as pausing replies.
    pub async fn deliver_result_silently(
        &self,
        call_id: &str,
        outcome: &ToolOutcome,
    ) -> Result<()> {
        {
            let mut inner = self.inner.lock();
            if !inner.delivered.insert(call_id.to_string()) {
                debug!(call_id, "duplicate tool result dropped");
                return Ok(());
            }
        }
        let item = ConversationItem::function_output(call_id, outcome);
        self.outbound
            .send(ClientEvent::ConversationItemCreate { item })
            .await
            .map_err(|_| SessionError::ChannelClosed)
    }

    /// Whether a response is currently streaming.
    pub fn response_in_progress(&self) -> bool {
        self.inner.lock().in_progress
    }

    /// Number of results waiting for the current response to finish.
    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Forget delivery history and queued announcements.
    ///
    /// Call on session teardown: call ids are scoped to a session and a
    /// stale dedupe set would drop fresh results on the next one.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.in_progress = false;
        inner.pending.clear();
        inner.delivered.clear();
        inner.generation += 1;
    }
}
