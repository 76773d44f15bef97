//! # aria-settings
//!
//! Configuration management with layered sources for the Aria voice client.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`AriaSettings::default()`]
//! 2. **JSON file** — deep-merged over defaults
//! 3. **Environment variables** — `ARIA_*` overrides (highest priority)
//!
//! There is deliberately no process-wide singleton: the orchestrator is
//! explicitly constructed with an [`AriaSettings`] value, so tests and
//! embedders can run several differently-configured sessions in one
//! process.
//!
//! Every threshold the health monitor, reconnection policy, response
//! coordinator, and voice-command debouncer consult lives here — none of
//! the product-tuning values are hardcoded in the state machines.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings_from_path};
pub use types::*;
