//! Settings loading: file deep-merge plus `ARIA_*` env overrides.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::AriaSettings;

/// Deep-merge `overlay` over `base`.
///
/// Objects merge recursively; any other value in `overlay` replaces the
/// one in `base`. Arrays replace wholesale — merging them element-wise
/// has no sensible meaning for settings.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                let _ = base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Load settings from a JSON file, deep-merged over compiled defaults,
/// with env overrides applied last.
pub fn load_settings_from_path(path: &Path) -> Result<AriaSettings> {
    let defaults = serde_json::to_value(AriaSettings::default())?;
    let raw = std::fs::read_to_string(path)?;
    let file_value: Value = serde_json::from_str(&raw)?;

    let merged = deep_merge(defaults, file_value);
    let merged = apply_env_overrides(merged);

    let settings: AriaSettings = serde_json::from_value(merged)?;
    validate(&settings)?;
    debug!(path = %path.display(), "settings loaded");
    Ok(settings)
}

/// Apply `ARIA_*` environment variable overrides to a merged value.
fn apply_env_overrides(mut value: Value) -> Value {
    if let Ok(url) = std::env::var("ARIA_BACKEND_URL") {
        set_path(&mut value, &["backend", "baseUrl"], Value::String(url));
    }
    if let Ok(level) = std::env::var("ARIA_LOG_LEVEL") {
        set_path(&mut value, &["logging", "level"], Value::String(level));
    }
    if let Ok(policy) = std::env::var("ARIA_RECONNECT_POLICY") {
        set_path(
            &mut value,
            &["reconnect", "policy"],
            Value::String(policy),
        );
    }
    if let Ok(voice) = std::env::var("ARIA_VOICE") {
        set_path(&mut value, &["voice", "voice"], Value::String(voice));
    }
    value
}

/// Set a nested field, creating intermediate objects as needed.
fn set_path(root: &mut Value, path: &[&str], new: Value) {
    let mut current = root;
    for key in &path[..path.len() - 1] {
        if !current.is_object() {
            *current = Value::Object(serde_json::Map::new());
        }
        let Some(map) = current.as_object_mut() else {
            return;
        };
        current = map
            .entry((*key).to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }
    if let Some(map) = current.as_object_mut() {
        let _ = map.insert(path[path.len() - 1].to_string(), new);
    }
}

/// Reject settings combinations the state machines cannot work with.
fn validate(settings: &AriaSettings) -> Result<()> {
    if settings.health.session_limit_secs == 0 {
        return Err(SettingsError::InvalidValue {
            field: "health.sessionLimitSecs".to_string(),
            message: "must be positive".to_string(),
        });
    }
    if settings.health.check_interval_secs == 0 {
        return Err(SettingsError::InvalidValue {
            field: "health.checkIntervalSecs".to_string(),
            message: "must be positive".to_string(),
        });
    }
    if !(0.0..=1.0).contains(&settings.voice_command.min_overlap) {
        return Err(SettingsError::InvalidValue {
            field: "voiceCommand.minOverlap".to_string(),
            message: "must be within 0.0..=1.0".to_string(),
        });
    }
    Ok(())
}
