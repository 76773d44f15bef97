//! Broadcast-based event emitter for [`SessionEvent`] dispatch.
//!
//! Downstream consumers (UI, transcript store) subscribe here; the
//! orchestration components never call into them directly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::broadcast;

use aria_core::connection::{DisconnectReason, HealthStatus};
use aria_core::tools::CancelLevel;

use crate::microphone::MicrophoneMode;

/// Default broadcast channel capacity.
const DEFAULT_CAPACITY: usize = 1024;

/// Observable session lifecycle events.
///
/// Status changes are edge-triggered (emitted only on change); the
/// periodic warnings are level-triggered (repeated while the condition
/// holds) — subscribers are expected to rate-limit their own logging.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    /// Derived health status changed.
    HealthChanged {
        /// The new status.
        status: HealthStatus,
    },
    /// A disconnect was detected and classified.
    DisconnectDetected {
        /// Classified cause.
        reason: DisconnectReason,
    },
    /// User has been silent beyond the idle threshold.
    IdleWarning {
        /// Time since last user speech.
        idle: Duration,
    },
    /// Session is approaching or past duration thresholds.
    SessionAgeWarning {
        /// Current session age.
        age: Duration,
    },
    /// No inbound events beyond the stale threshold.
    StaleWarning {
        /// Time since the last inbound event.
        since_last_event: Duration,
    },
    /// The reconnection policy wants a new session established.
    ReconnectDue {
        /// Disconnect cause that triggered the decision.
        reason: DisconnectReason,
        /// Reconnect attempt number (1-based).
        attempt: u32,
    },
    /// A finalized user transcript passed duplicate filtering.
    TranscriptFinal {
        /// Transcribed text.
        text: String,
        /// Audio duration when reported.
        audio_duration_ms: Option<u64>,
    },
    /// A tool call was dispatched to the broker.
    ToolStarted {
        /// Call identifier.
        call_id: String,
        /// Tool name.
        name: String,
    },
    /// A tool call finished (successfully or not).
    ToolCompleted {
        /// Call identifier.
        call_id: String,
        /// Tool name.
        name: String,
        /// Whether the tool succeeded.
        success: bool,
    },
    /// A cancellation was requested.
    CancelRequested {
        /// Requested strength.
        level: CancelLevel,
    },
    /// All cancellable operations drained while cancelling.
    CancelResolved,
    /// Microphone mode changed.
    MicrophoneChanged {
        /// The new mode.
        mode: MicrophoneMode,
    },
    /// The model reported a channel-level error.
    ChannelError {
        /// Error message.
        message: String,
    },
}

impl SessionEvent {
    /// Short tag for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::HealthChanged { .. } => "health_changed",
            Self::DisconnectDetected { .. } => "disconnect_detected",
            Self::IdleWarning { .. } => "idle_warning",
            Self::SessionAgeWarning { .. } => "session_age_warning",
            Self::StaleWarning { .. } => "stale_warning",
            Self::ReconnectDue { .. } => "reconnect_due",
            Self::TranscriptFinal { .. } => "transcript_final",
            Self::ToolStarted { .. } => "tool_started",
            Self::ToolCompleted { .. } => "tool_completed",
            Self::CancelRequested { .. } => "cancel_requested",
            Self::CancelResolved => "cancel_resolved",
            Self::MicrophoneChanged { .. } => "microphone_changed",
            Self::ChannelError { .. } => "channel_error",
        }
    }
}

/// Broadcast-based event emitter.
///
/// Non-blocking: `emit` never awaits. Slow receivers lag and drop rather
/// than blocking the event loop.
pub struct EventEmitter {
    tx: broadcast::Sender<SessionEvent>,
    emit_count: AtomicU64,
}

impl EventEmitter {
    /// Create a new emitter with the default channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new emitter with a custom channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            emit_count: AtomicU64::new(0),
        }
    }

    /// Emit an event to all subscribers. Non-blocking.
    ///
    /// Returns the number of receivers that got the event; 0 when there
    /// are no active subscribers.
    pub fn emit(&self, event: SessionEvent) -> usize {
        let _ = self.emit_count.fetch_add(1, Ordering::Relaxed);
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Total number of events emitted.
    pub fn emit_count(&self) -> u64 {
        self.emit_count.load(Ordering::Relaxed)
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}
