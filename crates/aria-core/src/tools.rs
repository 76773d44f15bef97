//! Tool execution and cancellation wire types.
//!
//! [`ToolOutcome`] is the one shape every tool result takes — success or
//! failure, it always serializes into a payload the model can read, so a
//! failed tool is never silently dropped from the conversation.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Tool exposed to the model for pausing automatic replies.
pub const PAUSE_REPLIES_TOOL: &str = "pause_replies";
/// Tool exposed to the model for resuming automatic replies.
pub const RESUME_REPLIES_TOOL: &str = "resume_replies";
/// Tool exposed to the model for cancelling running operations.
pub const CANCEL_TOOL: &str = "cancel_current_task";

/// Result of executing a tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// Whether the tool completed without error.
    pub success: bool,
    /// Output value on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Error description on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutcome {
    /// Successful outcome carrying an output value.
    pub fn ok(output: Value) -> Self {
        Self {
            success: true,
            output: Some(output),
            error: None,
        }
    }

    /// Failed outcome carrying an error description.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }

    /// The payload delivered to the model's conversation history.
    ///
    /// Success carries `output`, failure carries `error`; both carry
    /// `success` so the model can phrase the announcement accordingly.
    pub fn to_payload(&self) -> Value {
        if self.success {
            json!({
                "success": true,
                "output": self.output.clone().unwrap_or(Value::Null),
            })
        } else {
            json!({
                "success": false,
                "error": self.error.clone().unwrap_or_else(|| "unknown error".to_string()),
            })
        }
    }
}

/// A function definition advertised to the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Always `"function"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Tool name the model calls.
    pub name: String,
    /// Usage guidance for the model.
    pub description: String,
    /// JSON schema of the arguments.
    pub parameters: Value,
}

impl ToolDefinition {
    fn function(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            kind: "function".to_string(),
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// Voice-control tools handled locally by the client, never forwarded to
/// the tool-execution backend.
pub fn voice_control_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::function(
            PAUSE_REPLIES_TOOL,
            "Pause automatic replies - continue hearing and transcribing the user's \
             speech, but don't respond automatically. Use when the user wants to talk \
             without interruption or discuss something at length before getting your \
             input. The user can say 'respond now' or 'go ahead' to trigger a response.",
            json!({"type": "object", "properties": {}, "required": []}),
        ),
        ToolDefinition::function(
            RESUME_REPLIES_TOOL,
            "Resume automatic replies and return to normal conversation where you \
             respond to speech automatically.",
            json!({"type": "object", "properties": {}, "required": []}),
        ),
    ]
}

/// Cancellation tool definition, handled by the client against the
/// cancellation collaborator.
pub fn cancel_tool() -> ToolDefinition {
    ToolDefinition::function(
        CANCEL_TOOL,
        "Cancel the currently running task or delegation. Use when the user says \
         'stop', 'cancel', 'never mind', or 'abort'. This gracefully stops running \
         agents and tools. If operations continue after calling this, call it again \
         for an immediate stop.",
        json!({
            "type": "object",
            "properties": {
                "reason": {
                    "type": "string",
                    "description": "Brief reason for cancellation"
                },
                "immediate": {
                    "type": "boolean",
                    "description": "If true, stop immediately without waiting for current operations. Default false."
                }
            },
            "required": []
        }),
    )
}

/// Whether a tool name is handled locally by the orchestrator.
pub fn is_local_tool(name: &str) -> bool {
    matches!(name, PAUSE_REPLIES_TOOL | RESUME_REPLIES_TOOL | CANCEL_TOOL)
}

// ─────────────────────────────────────────────────────────────────────────────
// Cancellation collaborator wire payloads
// ─────────────────────────────────────────────────────────────────────────────

/// Requested cancellation strength.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelLevel {
    /// Let current steps finish, stop future steps.
    Graceful,
    /// Abort now; pending tools get synthesized results.
    Immediate,
}

impl std::fmt::Display for CancelLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Graceful => f.write_str("graceful"),
            Self::Immediate => f.write_str("immediate"),
        }
    }
}

/// Acknowledgement from `POST /cancel`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CancelAck {
    /// Whether the cancellation was accepted.
    pub cancelled: bool,
    /// Level that was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<CancelLevel>,
    /// Tool names running at the time of the request.
    #[serde(default)]
    pub running_tools: Vec<String>,
    /// True when a cancellation was already in flight.
    #[serde(default)]
    pub was_already_cancelled: bool,
    /// Error description when the request was rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Snapshot from `GET /cancel/status`, used to reconcile local state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CancelStatus {
    /// Whether anything is running that could be cancelled.
    pub is_cancellable: bool,
    /// Whether a cancellation is in effect.
    pub is_cancelled: bool,
    /// Active cancellation level, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<CancelLevel>,
    /// Tool names currently running.
    #[serde(default)]
    pub running_tools: Vec<String>,
    /// Spawned child sessions still active.
    #[serde(default)]
    pub active_children: usize,
}
