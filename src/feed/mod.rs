//! Price feed module
//!
//! Tick decoding and per-symbol stream connections

mod stream;
mod types;

pub use stream::{
    ConnectionId, StreamConnection, StreamConnector, StreamEnvelope, StreamEvent,
    WsStreamConnector,
};
pub use types::{MalformedTickError, Symbol, Tick};
