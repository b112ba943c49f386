//! Aggregator events, notifications and errors

use crate::feed::{ConnectionId, StreamEnvelope, Symbol, Tick};
use crate::tracker::PriceState;
use crate::ws::WsError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

/// Lower render bound as a fraction of the lowest price
const Y_PAD_LOW: Decimal = Decimal::from_parts(999, 0, 0, false, 3);
/// Upper render bound as a fraction of the highest price
const Y_PAD_HIGH: Decimal = Decimal::from_parts(1001, 0, 0, false, 3);

/// Lifecycle of a symbol's current stream connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Opened, transport not yet ready
    Connecting,
    /// Transport ready, ticks flowing
    Open,
    /// Closed cleanly
    Closed,
    /// Terminated by a transport error
    Failed,
}

impl ConnectionState {
    /// Closed and Failed end a connection instance
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Failed)
    }
}

/// Vertical chart range for a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YBounds {
    pub min: Decimal,
    pub max: Decimal,
}

impl YBounds {
    /// Bounds padded 0.1% below the lowest and above the highest price
    ///
    /// Returns `None` for an empty series. Padding that would overflow
    /// saturates at `Decimal::MAX`.
    pub fn from_prices(prices: &[Decimal]) -> Option<Self> {
        let min = *prices.iter().min()?;
        let max = *prices.iter().max()?;
        Some(Self {
            min: min.checked_mul(Y_PAD_LOW).unwrap_or(min),
            max: max.checked_mul(Y_PAD_HIGH).unwrap_or(Decimal::MAX),
        })
    }
}

/// Roster row update, emitted for every applied tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListUpdate {
    pub symbol: Symbol,
    pub price: Decimal,
    pub change_pct: Decimal,
}

/// Detail header update for the selected symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderUpdate {
    /// Latest known quote; fields are unset before the first tick
    Quote {
        symbol: Symbol,
        price: Option<Decimal>,
        change_pct: Option<Decimal>,
    },
    /// Nothing is selected any more
    Cleared,
}

/// Chart update for the selected symbol
#[derive(Debug, Clone, PartialEq)]
pub enum RenderUpdate {
    /// Full history snapshot, oldest first; bounds are unset for an empty series
    Series {
        symbol: Symbol,
        ticks: Vec<Tick>,
        y_bounds: Option<YBounds>,
    },
    /// Nothing is selected any more
    Cleared,
}

impl RenderUpdate {
    /// Build a series update, deriving the bounds from the snapshot
    pub fn series(symbol: Symbol, ticks: Vec<Tick>) -> Self {
        let prices: Vec<Decimal> = ticks.iter().map(|t| t.price).collect();
        let y_bounds = YBounds::from_prices(&prices);
        RenderUpdate::Series {
            symbol,
            ticks,
            y_bounds,
        }
    }
}

/// Notifications the core emits towards the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    List(ListUpdate),
    Header(HeaderUpdate),
    Render(RenderUpdate),
    /// A symbol's connection changed state
    Connection {
        symbol: Symbol,
        state: ConnectionState,
    },
    /// A symbol's transport reported an error; the stream may still be alive
    StreamError { symbol: Symbol, error: WsError },
}

/// Aggregator errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregatorError {
    /// Symbol was never registered (or has been unregistered)
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(Symbol),
    /// The aggregator task is no longer running
    #[error("Aggregator has shut down")]
    ShutDown,
}

/// Read-only requests answered with copies of core state
#[derive(Debug)]
pub enum Query {
    Snapshot {
        symbol: Symbol,
        reply: oneshot::Sender<Option<Vec<Tick>>>,
    },
    PriceState {
        symbol: Symbol,
        reply: oneshot::Sender<Option<PriceState>>,
    },
    ConnectionState {
        symbol: Symbol,
        reply: oneshot::Sender<Option<ConnectionState>>,
    },
    Selected {
        reply: oneshot::Sender<Option<Symbol>>,
    },
    Symbols {
        reply: oneshot::Sender<Vec<Symbol>>,
    },
}

/// Everything the core processes, in queue order
#[derive(Debug)]
pub enum CoreEvent {
    Register(Symbol),
    Unregister(Symbol),
    Select {
        symbol: Symbol,
        reply: oneshot::Sender<Result<(), AggregatorError>>,
    },
    Stream(StreamEnvelope),
    /// Backoff elapsed for the connection `after`
    Reconnect {
        symbol: Symbol,
        after: ConnectionId,
    },
    Query(Query),
    Shutdown,
}
