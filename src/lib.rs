#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

//! # VoiceLink Server
//!
//! A lightweight, in-memory WebSocket matchmaking and signaling server for
//! anonymous one-on-one voice chat.
//!
//! Zero external dependencies at runtime — no database, no cloud services.
//! Just run the binary and connect via WebSocket.

/// Server configuration and environment variables
pub mod config;

/// Structured logging configuration
pub mod logging;

/// Metrics collection and reporting
pub mod metrics;

/// WebSocket message protocol definitions
pub mod protocol;

/// Matchmaking, session lifecycle and relay orchestration
pub mod server;

/// WebSocket connection handling
pub mod websocket;
