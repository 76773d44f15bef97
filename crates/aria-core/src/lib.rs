//! # aria-core
//!
//! Channel wire protocol and shared vocabulary for the Aria voice client.
//!
//! This crate provides the types every other Aria crate depends on:
//!
//! - **Channel events**: [`events::ServerEvent`] (model → client) and
//!   [`events::ClientEvent`] (client → model) as closed tagged unions
//! - **Conversation items**: [`events::ConversationItem`] for history injection
//! - **Connection vocabulary**: [`connection::DisconnectReason`],
//!   [`connection::HealthStatus`], [`connection::ConnectionState`]
//! - **Tool types**: [`tools::ToolOutcome`], the voice-control/cancel tool
//!   schemas, and the cancellation wire payloads
//! - **Logging**: [`logging::init_logging`] tracing setup
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by aria-settings, aria-session, aria-client.

#![deny(unsafe_code)]

pub mod connection;
pub mod events;
pub mod logging;
pub mod tools;
