//! Channel event types.
//!
//! Two closed tagged unions cover the duplex channel to the speech model:
//!
//! - **[`ServerEvent`]**: inbound model events (response lifecycle,
//!   transcriptions, function-call construction, errors).
//! - **[`ClientEvent`]**: outbound commands (session configuration,
//!   response triggers, conversation-item injection).
//!
//! Both serialize with dotted `type` tags matching the wire format, and
//! both are matched exhaustively — no string-keyed dispatch anywhere.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::ToolOutcome;

// ─────────────────────────────────────────────────────────────────────────────
// ServerEvent — inbound (model → client)
// ─────────────────────────────────────────────────────────────────────────────

/// Events received from the speech model over the data channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// The model started producing a response.
    #[serde(rename = "response.created")]
    ResponseCreated {
        /// Identifier of the response being produced.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response_id: Option<String>,
    },

    /// The model finished the current response.
    #[serde(rename = "response.done")]
    ResponseDone {
        /// Identifier of the completed response.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response_id: Option<String>,
    },

    /// A user utterance finished transcribing.
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    TranscriptionCompleted {
        /// Conversation item the transcript belongs to.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        item_id: Option<String>,
        /// Transcribed user speech.
        transcript: String,
        /// Audio duration, when the model reports timing.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audio_duration_ms: Option<u64>,
    },

    /// Incremental function-call argument JSON.
    #[serde(rename = "response.function_call_arguments.delta")]
    FunctionCallDelta {
        /// Call this delta belongs to.
        call_id: String,
        /// Partial argument JSON.
        delta: String,
    },

    /// A function call is fully constructed and ready to execute.
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallDone {
        /// Unique call identifier, used for result routing and dedup.
        call_id: String,
        /// Tool name to invoke.
        name: String,
        /// Serialized argument JSON.
        arguments: String,
    },

    /// Channel-level error reported by the model.
    #[serde(rename = "error")]
    Error {
        /// Human-readable error message.
        message: String,
    },
}

impl ServerEvent {
    /// Wire tag for logging and bounded event logs.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ResponseCreated { .. } => "response.created",
            Self::ResponseDone { .. } => "response.done",
            Self::TranscriptionCompleted { .. } => {
                "conversation.item.input_audio_transcription.completed"
            }
            Self::FunctionCallDelta { .. } => "response.function_call_arguments.delta",
            Self::FunctionCallDone { .. } => "response.function_call_arguments.done",
            Self::Error { .. } => "error",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ClientEvent — outbound (client → model)
// ─────────────────────────────────────────────────────────────────────────────

/// Commands sent to the speech model over the data channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update the remote session configuration.
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Configuration block to apply.
        session: SessionConfig,
    },

    /// Request a new model response.
    #[serde(rename = "response.create")]
    ResponseCreate {
        /// Optional per-response options.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<ResponseOptions>,
    },

    /// Inject an item into the conversation history.
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        /// The item to append.
        item: ConversationItem,
    },
}

impl ClientEvent {
    /// A bare `response.create` with no instructions.
    pub fn response_create() -> Self {
        Self::ResponseCreate { response: None }
    }

    /// A `response.create` carrying free-text instructions.
    pub fn response_with_instructions(instructions: impl Into<String>) -> Self {
        Self::ResponseCreate {
            response: Some(ResponseOptions {
                instructions: Some(instructions.into()),
            }),
        }
    }

    /// Wire tag for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionUpdate { .. } => "session.update",
            Self::ResponseCreate { .. } => "response.create",
            Self::ConversationItemCreate { .. } => "conversation.item.create",
        }
    }
}

/// Per-response options for `response.create`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseOptions {
    /// Free-text instructions steering this single response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Session configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Remote session configuration carried by `session.update`.
///
/// Only the fields relevant to reply suppression and transcription are
/// modelled; everything omitted stays untouched on the remote side.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Server-side voice-activity detection settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,
    /// Input transcription settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<TranscriptionConfig>,
    /// Input noise reduction settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_audio_noise_reduction: Option<NoiseReduction>,
}

/// Server-side turn detection configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnDetection {
    /// Detection kind; only server VAD is used.
    #[serde(rename = "type")]
    pub kind: String,
    /// Whether a detected end-of-turn auto-generates a reply.
    pub create_response: bool,
    /// Silence window before end-of-turn, when overridden.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silence_duration_ms: Option<u64>,
}

impl TurnDetection {
    /// Server VAD with reply auto-generation toggled.
    pub fn server_vad(create_response: bool) -> Self {
        Self {
            kind: "server_vad".to_string(),
            create_response,
            silence_duration_ms: None,
        }
    }
}

/// Input transcription model selection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Transcription model name.
    pub model: String,
}

/// Input noise reduction mode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseReduction {
    /// Reduction profile (`near_field` / `far_field`).
    #[serde(rename = "type")]
    pub kind: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversation items
// ─────────────────────────────────────────────────────────────────────────────

/// An item injected into the model's conversation history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConversationItem {
    /// A user or assistant message.
    #[serde(rename = "message")]
    Message {
        /// Who authored the message.
        role: ItemRole,
        /// Content blocks.
        content: Vec<ItemContent>,
    },

    /// Output of a completed function call.
    #[serde(rename = "function_call_output")]
    FunctionCallOutput {
        /// Call the output belongs to.
        call_id: String,
        /// Serialized result payload.
        output: String,
    },
}

impl ConversationItem {
    /// A user text message.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::Message {
            role: ItemRole::User,
            content: vec![ItemContent::InputText { text: text.into() }],
        }
    }

    /// An assistant text message.
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::Message {
            role: ItemRole::Assistant,
            content: vec![ItemContent::Text { text: text.into() }],
        }
    }

    /// A function-call output item from a tool outcome.
    ///
    /// The payload is always serializable: success carries the output
    /// value, failure carries a structured error object.
    pub fn function_output(call_id: impl Into<String>, outcome: &ToolOutcome) -> Self {
        Self::FunctionCallOutput {
            call_id: call_id.into(),
            output: outcome.to_payload().to_string(),
        }
    }
}

/// Author of a conversation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemRole {
    /// The human speaker.
    User,
    /// The model.
    Assistant,
    /// System-injected context.
    System,
}

/// One content block inside a message item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ItemContent {
    /// Text supplied by the user.
    #[serde(rename = "input_text")]
    InputText {
        /// The text.
        text: String,
    },
    /// Text produced by the assistant.
    #[serde(rename = "text")]
    Text {
        /// The text.
        text: String,
    },
}

/// Parse a raw inbound channel message.
///
/// Errors on unknown tags — the event set is closed by design, and an
/// unknown tag means a protocol version mismatch worth surfacing.
pub fn parse_server_event(raw: &str) -> Result<ServerEvent, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Serialize an outbound command for the channel.
pub fn encode_client_event(event: &ClientEvent) -> Value {
    serde_json::to_value(event).unwrap_or(Value::Null)
}
