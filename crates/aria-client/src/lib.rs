//! # aria-client
//!
//! HTTP implementations of the orchestration layer's collaborator seams,
//! talking to the tool-execution / session-control backend:
//!
//! - **[`HttpToolBroker`]**: executes tool calls via `POST /execute/{name}`,
//!   with idempotent duplicate suppression by call id
//! - **[`HttpCancelApi`]**: cancellation requests and status polling
//! - **[`SessionControlClient`]**: session CRUD, resume bundles, and
//!   ephemeral speech-model credentials
//! - **[`events_stream::debug_events`]**: the backend's SSE debug stream
//!
//! ## Crate Position
//!
//! Transport layer. Depends on: aria-core, aria-session, aria-settings.
//! Depended on by: application binaries embedding the client.

#![deny(unsafe_code)]

pub mod cancel;
pub mod errors;
pub mod events_stream;
pub mod session;
pub mod tools;

pub use cancel::HttpCancelApi;
pub use errors::{ClientError, Result};
pub use session::{ResumeBundle, SessionControlClient, SessionInfo, TranscriptEntry};
pub use tools::HttpToolBroker;
