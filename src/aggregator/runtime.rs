//! Aggregator task and its handle
//!
//! The core runs on a dedicated tokio task and is driven through a bounded
//! queue. Registration, selection, stream events and queries are all
//! serialized through that queue, so the core never needs a lock.

use super::core::AggregatorCore;
use super::types::{AggregatorError, ConnectionState, CoreEvent, DashboardEvent, Query};
use crate::catalog::{CatalogSource, CatalogUnavailableError, SymbolInfo};
use crate::config::Config;
use crate::feed::{StreamConnector, Symbol, Tick};
use crate::tracker::PriceState;
use std::ops::ControlFlow;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// A running aggregator
pub struct Aggregator {
    handle: AggregatorHandle,
    task: JoinHandle<()>,
}

impl Aggregator {
    /// Start the aggregation task
    ///
    /// Returns the aggregator and the stream of dashboard notifications.
    /// Zero capacities are raised to one. Must be called from within a
    /// tokio runtime.
    pub fn spawn(
        config: &Config,
        connector: Arc<dyn StreamConnector>,
    ) -> (Self, mpsc::UnboundedReceiver<DashboardEvent>) {
        let queue_capacity = config.aggregator.event_queue_capacity.max(1);
        let (events_tx, mut events_rx) = mpsc::channel(queue_capacity);
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();

        let mut core = AggregatorCore::new(connector, events_tx.downgrade(), updates_tx)
            .history_capacity(config.aggregator.history_capacity)
            .reconnect(config.stream.reconnect.clone());

        let task = tokio::spawn(async move {
            tracing::info!("Aggregator started");
            while let Some(event) = events_rx.recv().await {
                if let ControlFlow::Break(()) = core.handle(event) {
                    break;
                }
            }
            core.shutdown();
            tracing::info!("Aggregator stopped");
        });

        let aggregator = Self {
            handle: AggregatorHandle { events: events_tx },
            task,
        };
        (aggregator, updates_rx)
    }

    /// A cloneable handle for driving the aggregator
    pub fn handle(&self) -> AggregatorHandle {
        self.handle.clone()
    }

    /// Close every connection and wait for the task to finish
    pub async fn shutdown(self) {
        let _ = self.handle.events.send(CoreEvent::Shutdown).await;
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Aggregator task ended abnormally");
        }
    }
}

/// Sends commands and queries to the aggregator task
#[derive(Debug, Clone)]
pub struct AggregatorHandle {
    events: mpsc::Sender<CoreEvent>,
}

impl AggregatorHandle {
    /// Start tracking a symbol; registering twice is a no-op
    pub async fn register_symbol(&self, symbol: impl Into<Symbol>) -> Result<(), AggregatorError> {
        self.send(CoreEvent::Register(symbol.into())).await
    }

    /// Stop tracking a symbol and close its stream
    pub async fn unregister_symbol(
        &self,
        symbol: impl Into<Symbol>,
    ) -> Result<(), AggregatorError> {
        self.send(CoreEvent::Unregister(symbol.into())).await
    }

    /// Select a registered symbol for the detail views
    pub async fn select(&self, symbol: impl Into<Symbol>) -> Result<(), AggregatorError> {
        let (reply, rx) = oneshot::channel();
        self.send(CoreEvent::Select {
            symbol: symbol.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| AggregatorError::ShutDown)?
    }

    /// Copy of a symbol's history, oldest first
    pub async fn snapshot(&self, symbol: impl Into<Symbol>) -> Result<Vec<Tick>, AggregatorError> {
        let symbol = symbol.into();
        let (reply, rx) = oneshot::channel();
        self.query(
            Query::Snapshot {
                symbol: symbol.clone(),
                reply,
            },
            rx,
        )
        .await?
        .ok_or(AggregatorError::UnknownSymbol(symbol))
    }

    pub async fn price_state(
        &self,
        symbol: impl Into<Symbol>,
    ) -> Result<PriceState, AggregatorError> {
        let symbol = symbol.into();
        let (reply, rx) = oneshot::channel();
        self.query(
            Query::PriceState {
                symbol: symbol.clone(),
                reply,
            },
            rx,
        )
        .await?
        .ok_or(AggregatorError::UnknownSymbol(symbol))
    }

    pub async fn connection_state(
        &self,
        symbol: impl Into<Symbol>,
    ) -> Result<ConnectionState, AggregatorError> {
        let symbol = symbol.into();
        let (reply, rx) = oneshot::channel();
        self.query(
            Query::ConnectionState {
                symbol: symbol.clone(),
                reply,
            },
            rx,
        )
        .await?
        .ok_or(AggregatorError::UnknownSymbol(symbol))
    }

    /// Currently selected symbol, if any
    pub async fn selected(&self) -> Result<Option<Symbol>, AggregatorError> {
        let (reply, rx) = oneshot::channel();
        self.query(Query::Selected { reply }, rx).await
    }

    /// Registered symbols in registration order
    pub async fn symbols(&self) -> Result<Vec<Symbol>, AggregatorError> {
        let (reply, rx) = oneshot::channel();
        self.query(Query::Symbols { reply }, rx).await
    }

    async fn query<T>(
        &self,
        query: Query,
        rx: oneshot::Receiver<T>,
    ) -> Result<T, AggregatorError> {
        self.send(CoreEvent::Query(query)).await?;
        rx.await.map_err(|_| AggregatorError::ShutDown)
    }

    async fn send(&self, event: CoreEvent) -> Result<(), AggregatorError> {
        self.events
            .send(event)
            .await
            .map_err(|_| AggregatorError::ShutDown)
    }
}

/// Startup failed before any symbol was registered
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Catalog(#[from] CatalogUnavailableError),
    #[error(transparent)]
    Aggregator(#[from] AggregatorError),
}

/// Fetch the catalog, register every symbol it lists in catalog order, and
/// select the first one
///
/// Nothing is registered if the catalog is unavailable.
pub async fn bootstrap(
    catalog: &dyn CatalogSource,
    aggregator: &AggregatorHandle,
) -> Result<Vec<SymbolInfo>, BootstrapError> {
    let symbols = catalog.fetch_symbols().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to load symbol catalog");
        e
    })?;

    for info in &symbols {
        aggregator.register_symbol(info.symbol.clone()).await?;
    }
    if let Some(first) = symbols.first() {
        aggregator.select(first.symbol.clone()).await?;
    }

    tracing::info!(count = symbols.len(), "Registered catalog symbols");
    Ok(symbols)
}
