//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` to match the JSON
//! wire format. Each type implements [`Default`] with production defaults.
//! Types carry `#[serde(default)]` so partial JSON files work — missing
//! fields get their default value during deserialization.

mod health;
mod reconnect;

pub use health::*;
pub use reconnect::*;

use serde::{Deserialize, Serialize};

/// Root settings type for the Aria voice client.
///
/// # JSON Format
///
/// All field names are camelCase. Example:
///
/// ```json
/// {
///   "version": "0.1.0",
///   "backend": { "baseUrl": "http://127.0.0.1:8080" },
///   "health": { "idleTimeoutSecs": 300 }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AriaSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// Tool-execution / session-control backend location.
    pub backend: BackendSettings,
    /// Speech model and voice selection.
    pub voice: VoiceSettings,
    /// Connection health thresholds.
    pub health: HealthSettings,
    /// Reconnection policy.
    pub reconnect: ReconnectSettings,
    /// Response lifecycle tuning.
    pub response: ResponseSettings,
    /// Duplicate voice-command detection tuning.
    pub voice_command: VoiceCommandSettings,
    /// Logging configuration.
    pub logging: LogSettings,
}

impl Default for AriaSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: "aria".to_string(),
            backend: BackendSettings::default(),
            voice: VoiceSettings::default(),
            health: HealthSettings::default(),
            reconnect: ReconnectSettings::default(),
            response: ResponseSettings::default(),
            voice_command: VoiceCommandSettings::default(),
            logging: LogSettings::default(),
        }
    }
}

/// Backend service location and HTTP behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendSettings {
    /// Base URL of the tool-execution / session-control service.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

/// Speech model selection.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoiceSettings {
    /// Realtime speech model name.
    pub model: String,
    /// Output voice.
    pub voice: String,
    /// Input transcription model.
    pub transcription_model: String,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            model: "gpt-realtime".to_string(),
            voice: "marin".to_string(),
            transcription_model: "whisper-1".to_string(),
        }
    }
}

/// Response lifecycle tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponseSettings {
    /// Grace delay between `response.done` and flushing deferred tool
    /// announcements, in milliseconds. Avoids racing a tool result that
    /// lands in the same tick as the response finishing.
    pub grace_delay_ms: u64,
}

impl Default for ResponseSettings {
    fn default() -> Self {
        Self { grace_delay_ms: 250 }
    }
}

/// Duplicate voice-command detection tuning.
///
/// These are product-tuning heuristics, not load-bearing invariants —
/// which is exactly why they live in settings instead of constants.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoiceCommandSettings {
    /// Window in which a near-identical transcript counts as a duplicate.
    pub dedupe_window_ms: u64,
    /// Minimum length ratio between two transcripts for fuzzy
    /// containment to count as a duplicate (0.0–1.0).
    pub min_overlap: f64,
}

impl Default for VoiceCommandSettings {
    fn default() -> Self {
        Self {
            dedupe_window_ms: 3_000,
            min_overlap: 0.6,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogSettings {
    /// Default tracing level when no env filter is set.
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
