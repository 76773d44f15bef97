//! Reconnection policy settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the client reacts to a disconnect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconnectPolicyKind {
    /// Never reconnect automatically.
    Manual,
    /// Reconnect as soon as the disconnect is classified.
    AutoImmediate,
    /// Reconnect after a fixed delay.
    AutoDelayed,
    /// Tear down and reconnect deliberately before the hard session
    /// limit, using a timer started at session start.
    Proactive,
}

/// Reconnection policy configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconnectSettings {
    /// Active policy.
    pub policy: ReconnectPolicyKind,
    /// Delay for [`ReconnectPolicyKind::AutoDelayed`], milliseconds.
    pub delay_ms: u64,
    /// Margin before the hard limit at which a proactive reconnect
    /// fires, seconds.
    pub proactive_margin_secs: u64,
    /// Maximum automatic reconnect attempts per logical conversation.
    pub max_attempts: u32,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            policy: ReconnectPolicyKind::AutoDelayed,
            delay_ms: 2_000,
            proactive_margin_secs: 120,
            max_attempts: 5,
        }
    }
}

impl ReconnectSettings {
    /// Delayed-reconnect wait as a duration.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Proactive margin as a duration.
    pub fn proactive_margin(&self) -> Duration {
        Duration::from_secs(self.proactive_margin_secs)
    }
}
