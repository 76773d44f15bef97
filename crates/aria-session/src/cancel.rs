//! Cancellation coordination.
//!
//! [`CancellationCoordinator`] mirrors what the execution backend is
//! doing — running tool calls, spawned child sessions — so that a
//! "stop" from the user can be routed with the right strength and its
//! completion observed. The backend remains authoritative: local state
//! is a cache, updated optimistically and reconciled via polling when a
//! request fails.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::gauge;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use aria_core::tools::{CancelAck, CancelLevel, CancelStatus};

use crate::broker::CancelTransport;
use crate::emitter::{EventEmitter, SessionEvent};
use crate::errors::Result;

/// What kind of work an operation represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    /// A tool call dispatched to the backend.
    Tool,
    /// A child session spawned by the backend.
    ChildSession,
}

/// One tracked unit of cancellable work.
#[derive(Clone, Debug)]
pub struct CancellableOperation {
    /// Call or session identifier.
    pub id: String,
    /// Human-readable name (tool name, session label).
    pub name: String,
    /// Work category.
    pub kind: OperationKind,
    /// When tracking began.
    pub started_at: Instant,
}

#[derive(Default)]
struct Inner {
    running: HashMap<String, CancellableOperation>,
    active_children: usize,
    is_cancelling: bool,
    level: Option<CancelLevel>,
}

impl Inner {
    fn is_active(&self) -> bool {
        !self.running.is_empty() || self.active_children > 0
    }
}

/// Tracks cancellable work and drives cancellation through the backend.
pub struct CancellationCoordinator {
    inner: Mutex<Inner>,
    transport: Arc<dyn CancelTransport>,
    emitter: Arc<EventEmitter>,
}

impl CancellationCoordinator {
    /// Create a coordinator over the given cancellation transport.
    pub fn new(transport: Arc<dyn CancelTransport>, emitter: Arc<EventEmitter>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            transport,
            emitter,
        }
    }

    /// Track a newly dispatched tool call.
    pub fn operation_started(&self, id: impl Into<String>, name: impl Into<String>) {
        let id = id.into();
        let name = name.into();
        let mut inner = self.inner.lock();
        debug!(id = %id, name = %name, "operation started");
        let _ = inner.running.insert(
            id.clone(),
            CancellableOperation {
                id,
                name,
                kind: OperationKind::Tool,
                started_at: Instant::now(),
            },
        );
        gauge!("aria_operations_active").set(inner.running.len() as f64);
    }

    /// A tracked tool call finished (in any way).
    pub fn operation_completed(&self, id: &str) {
        let resolved = {
            let mut inner = self.inner.lock();
            if inner.running.remove(id).is_none() {
                debug!(id, "completion for untracked operation ignored");
            }
            gauge!("aria_operations_active").set(inner.running.len() as f64);
            Self::try_resolve(&mut inner)
        };
        if resolved {
            self.emit_resolved();
        }
    }

    /// The backend spawned a child session.
    pub fn child_spawned(&self) {
        let mut inner = self.inner.lock();
        inner.active_children += 1;
        debug!(active_children = inner.active_children, "child session spawned");
    }

    /// A child session finished.
    pub fn child_ended(&self) {
        let resolved = {
            let mut inner = self.inner.lock();
            inner.active_children = inner.active_children.saturating_sub(1);
            debug!(active_children = inner.active_children, "child session ended");
            Self::try_resolve(&mut inner)
        };
        if resolved {
            self.emit_resolved();
        }
    }

    /// Whether any cancellable work is in flight.
    pub fn is_active(&self) -> bool {
        self.inner.lock().is_active()
    }

    /// Whether a cancellation is currently pending resolution.
    pub fn is_cancelling(&self) -> bool {
        self.inner.lock().is_cancelling
    }

    /// Names of tracked running tools.
    pub fn running_tools(&self) -> Vec<String> {
        self.inner
            .lock()
            .running
            .values()
            .map(|op| op.name.clone())
            .collect()
    }

    /// Local snapshot in the backend's status shape.
    pub fn state(&self) -> CancelStatus {
        let inner = self.inner.lock();
        CancelStatus {
            is_cancellable: inner.is_active(),
            is_cancelled: inner.is_cancelling,
            level: inner.level,
            running_tools: inner.running.values().map(|op| op.name.clone()).collect(),
            active_children: inner.active_children,
        }
    }

    /// Request cancellation of everything in flight.
    ///
    /// On transport failure the cancelling flag is cleared optimistically
    /// (the backend may never have seen the request) while the running
    /// set is kept; call [`Self::reconcile`] to realign with the backend.
    pub async fn request_cancel(&self, immediate: bool, reason: &str) -> Result<CancelAck> {
        let (level, was_empty) = {
            let mut inner = self.inner.lock();
            let level = if immediate {
                CancelLevel::Immediate
            } else {
                CancelLevel::Graceful
            };
            inner.is_cancelling = true;
            inner.level = Some(level);
            (level, !inner.is_active())
        };

        info!(level = %level, reason, "cancellation requested");
        let _ = self.emitter.emit(SessionEvent::CancelRequested { level });

        match self.transport.request_cancel(immediate, reason).await {
            Ok(ack) => {
                if was_empty {
                    // Nothing tracked locally; resolution is immediate.
                    let mut inner = self.inner.lock();
                    inner.is_cancelling = false;
                    inner.level = None;
                    drop(inner);
                    self.emit_resolved();
                }
                Ok(ack)
            }
            Err(err) => {
                warn!(error = %err, "cancel request failed");
                let mut inner = self.inner.lock();
                inner.is_cancelling = false;
                inner.level = None;
                Err(err)
            }
        }
    }

    /// Realign local state with the backend's view.
    pub async fn reconcile(&self) -> Result<()> {
        let status = self.transport.poll_status().await?;
        let resolved = {
            let mut inner = self.inner.lock();
            if !status.is_cancellable {
                // Backend says nothing is running; drop the mirror.
                inner.running.clear();
                inner.active_children = 0;
                gauge!("aria_operations_active").set(0.0);
            } else {
                inner.active_children = status.active_children;
            }
            Self::try_resolve(&mut inner)
        };
        if resolved {
            self.emit_resolved();
        }
        Ok(())
    }

    /// Forget all tracked work; for session teardown.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        *inner = Inner::default();
        gauge!("aria_operations_active").set(0.0);
    }

    /// Clear the cancelling flag once all work has drained. Returns true
    /// when resolution happened on this call.
    fn try_resolve(inner: &mut Inner) -> bool {
        if inner.is_cancelling && !inner.is_active() {
            inner.is_cancelling = false;
            inner.level = None;
            true
        } else {
            false
        }
    }

    fn emit_resolved(&self) {
        info!("cancellation resolved");
        let _ = self.emitter.emit(SessionEvent::CancelResolved);
    }
}
