//! WebSocket client library
//!
//! Provides a WebSocket transport with ping/pong keep-alive and explicit
//! error and close signalling.

mod client;
mod types;

pub use client::{WsClient, WsSubscription};
pub use types::{CloseReason, WsConfig, WsError, WsMessage};
