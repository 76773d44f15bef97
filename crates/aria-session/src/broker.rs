//! Collaborator seams: tool execution and cancellation transport.
//!
//! The orchestration layer talks to its backend only through these traits;
//! `aria-client` provides the HTTP implementations, tests provide fakes.

use async_trait::async_trait;
use serde_json::Value;

use aria_core::tools::{CancelAck, CancelStatus, ToolOutcome};

use crate::errors::Result;

/// Executes tool calls against the tool-execution backend.
#[async_trait]
pub trait ToolBroker: Send + Sync {
    /// Execute one tool call.
    ///
    /// `call_id` identifies the call for idempotent duplicate
    /// suppression — invoking the same id twice must not run the tool
    /// twice. A tool failure is a successful `Err`-shaped
    /// [`ToolOutcome`], not an `Err` return; `Err` means the broker
    /// itself could not be reached.
    async fn execute(&self, call_id: &str, name: &str, arguments: Value) -> Result<ToolOutcome>;
}

/// Issues cancellation requests to the execution backend.
#[async_trait]
pub trait CancelTransport: Send + Sync {
    /// Request cancellation of running operations.
    async fn request_cancel(&self, immediate: bool, reason: &str) -> Result<CancelAck>;

    /// Poll the backend's view of cancellation state, used to reconcile
    /// optimistic local clears after a failed cancel request.
    async fn poll_status(&self) -> Result<CancelStatus>;
}
