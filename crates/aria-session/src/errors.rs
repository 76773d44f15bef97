//! Session orchestration error types.

/// Errors raised by the orchestration layer.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The outbound channel sender was dropped — the session is gone.
    #[error("outbound channel closed")]
    ChannelClosed,

    /// A collaborator request (tool broker, cancellation API) failed.
    #[error("collaborator request failed: {0}")]
    Collaborator(String),
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
