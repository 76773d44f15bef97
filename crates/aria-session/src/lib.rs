//! # aria-session
//!
//! Session orchestration state machines for the Aria voice client.
//!
//! Five cooperating components, all driven by inbound channel events and
//! timers on one logical event loop:
//!
//! - **[`ConnectionHealthMonitor`]**: session timestamps, disconnect
//!   classification, derived health status, periodic threshold checks
//! - **[`ReconnectionStrategy`]**: policy layer turning disconnect reasons
//!   into reconnect decisions, including proactive pre-limit teardown
//! - **[`ResponseLifecycleCoordinator`]**: response-in-progress tracking
//!   and exactly-once tool-result announcement, batched behind a grace delay
//! - **[`MicrophoneStateController`]**: tri-state normal/paused/muted with
//!   local-track and remote-session side effects kept strictly separate
//! - **[`CancellationCoordinator`]**: running tool calls and spawned child
//!   sessions, graceful/immediate cancellation, completion reconciliation
//!
//! [`SessionOrchestrator`] wires them together: it fans inbound
//! [`aria_core::events::ServerEvent`]s out to the components and owns the
//! single outbound sender — the only place `ClientEvent`s leave the process.
//!
//! ## Crate Position
//!
//! Orchestration layer. Depends on: aria-core, aria-settings.
//! Depended on by: aria-client (collaborator trait impls).

#![deny(unsafe_code)]

pub mod broker;
pub mod cancel;
pub mod debounce;
pub mod emitter;
pub mod errors;
pub mod health;
pub mod microphone;
pub mod orchestrator;
pub mod reconnect;
pub mod response;

pub use broker::{CancelTransport, ToolBroker};
pub use cancel::{CancellableOperation, CancellationCoordinator, OperationKind};
pub use debounce::VoiceCommandDebouncer;
pub use emitter::{EventEmitter, SessionEvent};
pub use errors::{Result, SessionError};
pub use health::ConnectionHealthMonitor;
pub use microphone::{AudioTrack, MicrophoneMode, MicrophoneStateController};
pub use orchestrator::SessionOrchestrator;
pub use reconnect::{ReconnectDecision, ReconnectionStrategy};
pub use response::ResponseLifecycleCoordinator;
