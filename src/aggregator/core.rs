//! Aggregation core
//!
//! Single owner of every per-symbol buffer, price state and connection
//! record, and of the selection cursor. All mutation happens through
//! [`AggregatorCore::handle`], which the runtime calls for one queued event
//! at a time; everything handed out is a copy.

use super::types::{
    AggregatorError, ConnectionState, CoreEvent, DashboardEvent, HeaderUpdate, ListUpdate, Query,
    RenderUpdate,
};
use crate::config::ReconnectConfig;
use crate::feed::{
    ConnectionId, StreamConnection, StreamConnector, StreamEnvelope, StreamEvent, Symbol, Tick,
};
use crate::history::{HistoryBuffer, DEFAULT_HISTORY_CAPACITY};
use crate::telemetry::{increment_counter, set_gauge, CounterMetric, GaugeMetric};
use crate::tracker::{PriceState, PriceTracker};
use crate::ws::CloseReason;
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Everything the core keeps for one registered symbol
#[derive(Debug)]
struct SymbolEntry {
    history: HistoryBuffer,
    /// Present while the current connection is alive
    connection: Option<StreamConnection>,
    /// Id of the current (or last) connection; events from others are stale
    connection_id: ConnectionId,
    state: ConnectionState,
    reconnect_attempts: u32,
}

/// Per-symbol arena plus selection cursor
pub struct AggregatorCore {
    connector: Arc<dyn StreamConnector>,
    /// Own queue, handed to new connections and reconnect timers
    events: mpsc::WeakSender<CoreEvent>,
    updates: mpsc::UnboundedSender<DashboardEvent>,
    entries: HashMap<Symbol, SymbolEntry>,
    /// Registration order
    roster: Vec<Symbol>,
    tracker: PriceTracker,
    selected: Option<Symbol>,
    history_capacity: usize,
    reconnect: ReconnectConfig,
}

impl AggregatorCore {
    /// Create a core that opens connections through `connector`, receives
    /// stream events on the queue behind `events`, and publishes to `updates`
    pub fn new(
        connector: Arc<dyn StreamConnector>,
        events: mpsc::WeakSender<CoreEvent>,
        updates: mpsc::UnboundedSender<DashboardEvent>,
    ) -> Self {
        Self {
            connector,
            events,
            updates,
            entries: HashMap::new(),
            roster: Vec::new(),
            tracker: PriceTracker::new(),
            selected: None,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Set the per-symbol history capacity for symbols registered afterwards
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Set the reconnect policy
    pub fn reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Process one queued event
    ///
    /// Returns `Break` on shutdown.
    pub fn handle(&mut self, event: CoreEvent) -> ControlFlow<()> {
        match event {
            CoreEvent::Register(symbol) => {
                self.register_symbol(symbol);
            }
            CoreEvent::Unregister(symbol) => {
                self.unregister_symbol(&symbol);
            }
            CoreEvent::Select { symbol, reply } => {
                let result = self.select(&symbol);
                let _ = reply.send(result);
            }
            CoreEvent::Stream(envelope) => self.handle_stream(envelope),
            CoreEvent::Reconnect { symbol, after } => self.reconnect_symbol(symbol, after),
            CoreEvent::Query(query) => self.answer(query),
            CoreEvent::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Start tracking `symbol` and open its stream
    ///
    /// Returns `false` if the symbol was already registered.
    pub fn register_symbol(&mut self, symbol: Symbol) -> bool {
        if self.entries.contains_key(&symbol) {
            tracing::debug!(symbol = %symbol, "Symbol already registered");
            return false;
        }

        let connection_id = Uuid::new_v4();
        let connection = self.open_connection(&symbol, connection_id);
        let state = if connection.is_some() {
            ConnectionState::Connecting
        } else {
            ConnectionState::Failed
        };

        self.entries.insert(
            symbol.clone(),
            SymbolEntry {
                history: HistoryBuffer::new(self.history_capacity),
                connection,
                connection_id,
                state,
                reconnect_attempts: 0,
            },
        );
        self.roster.push(symbol.clone());

        tracing::info!(symbol = %symbol, "Registered symbol");
        self.refresh_gauges();
        self.emit(DashboardEvent::Connection { symbol, state });
        true
    }

    /// Close the stream and drop all state for `symbol`
    ///
    /// Clears the selection (and tells the views) if `symbol` was selected.
    /// Returns `false` if the symbol was not registered.
    pub fn unregister_symbol(&mut self, symbol: &Symbol) -> bool {
        let Some(mut entry) = self.entries.remove(symbol) else {
            tracing::debug!(symbol = %symbol, "Unregister of unknown symbol ignored");
            return false;
        };

        if let Some(mut connection) = entry.connection.take() {
            connection.close();
        }
        self.tracker.forget(symbol);
        self.roster.retain(|s| s != symbol);

        if self.selected.as_ref() == Some(symbol) {
            self.selected = None;
            self.emit(DashboardEvent::Header(HeaderUpdate::Cleared));
            self.emit(DashboardEvent::Render(RenderUpdate::Cleared));
        }

        tracing::info!(symbol = %symbol, "Unregistered symbol");
        self.refresh_gauges();
        true
    }

    /// Move the selection cursor to `symbol` and render it in full
    ///
    /// Fails without touching the cursor if the symbol is not registered.
    pub fn select(&mut self, symbol: &Symbol) -> Result<(), AggregatorError> {
        let Some(entry) = self.entries.get(symbol) else {
            tracing::warn!(symbol = %symbol, "Selection of unknown symbol rejected");
            return Err(AggregatorError::UnknownSymbol(symbol.clone()));
        };
        let ticks = entry.history.snapshot();
        let state = self.tracker.state(symbol);

        self.selected = Some(symbol.clone());
        tracing::debug!(symbol = %symbol, ticks = ticks.len(), "Selected symbol");

        self.emit(DashboardEvent::Header(HeaderUpdate::Quote {
            symbol: symbol.clone(),
            price: state.last_price,
            change_pct: state.last_change_pct,
        }));
        self.emit(DashboardEvent::Render(RenderUpdate::series(
            symbol.clone(),
            ticks,
        )));
        Ok(())
    }

    /// Apply a tick to its symbol's tracker and history, then notify
    ///
    /// Ticks for unregistered symbols are dropped without side effects, as
    /// are ticks whose percent change overflows.
    pub fn on_tick(&mut self, tick: Tick) {
        let Some(entry) = self.entries.get_mut(&tick.symbol) else {
            tracing::trace!(symbol = %tick.symbol, "Dropping tick for unregistered symbol");
            return;
        };

        let symbol = tick.symbol.clone();
        let price = tick.price;
        let Some(change_pct) = self.tracker.update(&symbol, price) else {
            tracing::warn!(symbol = %symbol, %price, "Dropping tick with out-of-range price change");
            increment_counter(CounterMetric::MalformedTicks, &symbol);
            return;
        };
        entry.history.append(tick);

        let is_selected = self.selected.as_ref() == Some(&symbol);
        let series = is_selected.then(|| entry.history.snapshot());

        increment_counter(CounterMetric::TicksProcessed, &symbol);
        self.emit(DashboardEvent::List(ListUpdate {
            symbol: symbol.clone(),
            price,
            change_pct,
        }));

        if let Some(ticks) = series {
            self.emit(DashboardEvent::Header(HeaderUpdate::Quote {
                symbol: symbol.clone(),
                price: Some(price),
                change_pct: Some(change_pct),
            }));
            self.emit(DashboardEvent::Render(RenderUpdate::series(symbol, ticks)));
        }
    }

    /// Route a connection's event to the symbol it belongs to
    pub fn handle_stream(&mut self, envelope: StreamEnvelope) {
        let StreamEnvelope {
            symbol,
            connection,
            event,
        } = envelope;

        let Some(entry) = self.entries.get_mut(&symbol) else {
            tracing::trace!(symbol = %symbol, "Stream event for unregistered symbol dropped");
            return;
        };
        if entry.connection_id != connection {
            tracing::debug!(symbol = %symbol, %connection, "Stale connection event dropped");
            return;
        }

        match event {
            StreamEvent::Open => {
                entry.state = ConnectionState::Open;
                entry.reconnect_attempts = 0;
                tracing::info!(symbol = %symbol, "Stream connected");
                self.refresh_gauges();
                self.emit(DashboardEvent::Connection {
                    symbol,
                    state: ConnectionState::Open,
                });
            }
            StreamEvent::Tick(tick) => self.on_tick(tick),
            StreamEvent::Error(error) => {
                tracing::warn!(symbol = %symbol, error = %error, "Stream error");
                increment_counter(CounterMetric::StreamErrors, &symbol);
                self.emit(DashboardEvent::StreamError { symbol, error });
            }
            StreamEvent::Closed(reason) => {
                if let Some(mut conn) = entry.connection.take() {
                    conn.close();
                }
                let state = match reason {
                    CloseReason::Normal => ConnectionState::Closed,
                    CloseReason::Failed => ConnectionState::Failed,
                };
                entry.state = state;
                let attempt = entry.reconnect_attempts;

                tracing::info!(symbol = %symbol, ?state, "Stream disconnected");
                self.refresh_gauges();
                self.emit(DashboardEvent::Connection {
                    symbol: symbol.clone(),
                    state,
                });
                self.schedule_reconnect(symbol, connection, attempt);
            }
        }
    }

    /// Tear down every connection
    pub fn shutdown(&mut self) {
        for entry in self.entries.values_mut() {
            if let Some(mut connection) = entry.connection.take() {
                connection.close();
            }
            if !entry.state.is_terminal() {
                entry.state = ConnectionState::Closed;
            }
        }
        self.refresh_gauges();
        tracing::info!(symbols = self.entries.len(), "Closed all stream connections");
    }

    pub fn selected(&self) -> Option<&Symbol> {
        self.selected.as_ref()
    }

    pub fn is_registered(&self, symbol: &Symbol) -> bool {
        self.entries.contains_key(symbol)
    }

    /// Registered symbols in registration order
    pub fn symbols(&self) -> Vec<Symbol> {
        self.roster.clone()
    }

    /// Copy of a symbol's history, oldest first
    pub fn snapshot(&self, symbol: &Symbol) -> Option<Vec<Tick>> {
        self.entries.get(symbol).map(|e| e.history.snapshot())
    }

    pub fn price_state(&self, symbol: &Symbol) -> Option<PriceState> {
        self.entries
            .get(symbol)
            .map(|_| self.tracker.state(symbol))
    }

    pub fn connection_state(&self, symbol: &Symbol) -> Option<ConnectionState> {
        self.entries.get(symbol).map(|e| e.state)
    }

    fn answer(&self, query: Query) {
        match query {
            Query::Snapshot { symbol, reply } => {
                let _ = reply.send(self.snapshot(&symbol));
            }
            Query::PriceState { symbol, reply } => {
                let _ = reply.send(self.price_state(&symbol));
            }
            Query::ConnectionState { symbol, reply } => {
                let _ = reply.send(self.connection_state(&symbol));
            }
            Query::Selected { reply } => {
                let _ = reply.send(self.selected.clone());
            }
            Query::Symbols { reply } => {
                let _ = reply.send(self.symbols());
            }
        }
    }

    fn open_connection(&self, symbol: &Symbol, id: ConnectionId) -> Option<StreamConnection> {
        let Some(events) = self.events.upgrade() else {
            tracing::warn!(symbol = %symbol, "Event queue closed, not opening stream");
            return None;
        };
        Some(self.connector.open(symbol, id, events))
    }

    fn schedule_reconnect(&mut self, symbol: Symbol, after: ConnectionId, attempt: u32) {
        let Some(delay) = self.reconnect.delay_for(attempt) else {
            if self.reconnect.enabled {
                tracing::warn!(symbol = %symbol, attempts = attempt, "Reconnect attempts exhausted");
            }
            return;
        };
        let Some(events) = self.events.upgrade() else {
            return;
        };
        if let Some(entry) = self.entries.get_mut(&symbol) {
            entry.reconnect_attempts = attempt + 1;
        }

        tracing::info!(
            symbol = %symbol,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(CoreEvent::Reconnect { symbol, after }).await;
        });
    }

    /// Replace a closed connection, unless the symbol moved on meanwhile
    fn reconnect_symbol(&mut self, symbol: Symbol, after: ConnectionId) {
        let current = self
            .entries
            .get(&symbol)
            .filter(|e| e.connection_id == after && e.connection.is_none());
        if current.is_none() {
            tracing::debug!(symbol = %symbol, "Reconnect no longer needed");
            return;
        }

        let connection_id = Uuid::new_v4();
        let connection = self.open_connection(&symbol, connection_id);
        let state = if connection.is_some() {
            ConnectionState::Connecting
        } else {
            ConnectionState::Failed
        };

        if let Some(entry) = self.entries.get_mut(&symbol) {
            entry.connection = connection;
            entry.connection_id = connection_id;
            entry.state = state;
        }

        increment_counter(CounterMetric::Reconnects, &symbol);
        tracing::info!(symbol = %symbol, "Reopened stream connection");
        self.emit(DashboardEvent::Connection { symbol, state });
    }

    fn refresh_gauges(&self) {
        let open = self
            .entries
            .values()
            .filter(|e| e.state == ConnectionState::Open)
            .count();
        set_gauge(GaugeMetric::RegisteredSymbols, self.entries.len() as f64);
        set_gauge(GaugeMetric::OpenConnections, open as f64);
    }

    /// Publish to the views; never blocks
    fn emit(&self, event: DashboardEvent) {
        let _ = self.updates.send(event);
    }
}
