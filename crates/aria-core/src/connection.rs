//! Connection vocabulary: disconnect causes, derived health, transport states.

use serde::{Deserialize, Serialize};

/// Why a session ended.
///
/// Assigned once per disconnect and immutable afterwards. Used both for
/// telemetry and for reconnection-policy branching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// No user speech for longer than the idle threshold.
    IdleTimeout,
    /// The session hit (or is about to hit) the hard duration limit.
    SessionLimit,
    /// The transport failed to establish or dropped mid-negotiation.
    ConnectionFailed,
    /// The data channel closed underneath us.
    DataChannelClosed,
    /// No inbound events for longer than the stale threshold.
    StaleConnection,
    /// A network-level error was reported.
    NetworkError,
    /// The user asked to end the session.
    UserInitiated,
    /// Cause could not be determined.
    Unknown,
}

impl DisconnectReason {
    /// Short tag used in logs and telemetry.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IdleTimeout => "idle_timeout",
            Self::SessionLimit => "session_limit",
            Self::ConnectionFailed => "connection_failed",
            Self::DataChannelClosed => "data_channel_closed",
            Self::StaleConnection => "stale_connection",
            Self::NetworkError => "network_error",
            Self::UserInitiated => "user_initiated",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived session health.
///
/// Always recomputed from session timestamps and thresholds — never stored
/// as independent mutable state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Session active and inside all thresholds.
    Healthy,
    /// Idle or long-running; attention advised.
    Warning,
    /// Stale or inside the hard-limit warning band.
    Critical,
    /// No active session.
    Disconnected,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// Transport connection state as reported by the peer connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Initial state, no negotiation yet.
    New,
    /// Negotiation in progress.
    Connecting,
    /// Media and data flowing.
    Connected,
    /// Transport lost, may recover.
    Disconnected,
    /// Transport failed permanently.
    Failed,
    /// Closed deliberately.
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}
