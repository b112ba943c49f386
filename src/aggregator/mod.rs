//! Aggregation module
//!
//! Owns per-symbol history, price state and connections, tracks the
//! selected symbol, and publishes [`DashboardEvent`]s for the views.

mod core;
mod runtime;
mod types;

pub use self::core::AggregatorCore;
pub use runtime::{bootstrap, Aggregator, AggregatorHandle, BootstrapError};
pub use types::{
    AggregatorError, ConnectionState, CoreEvent, DashboardEvent, HeaderUpdate, ListUpdate, Query,
    RenderUpdate, YBounds,
};
