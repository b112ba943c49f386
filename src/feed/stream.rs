//! Per-symbol stream connections

use super::types::{Symbol, Tick};
use crate::aggregator::CoreEvent;
use crate::config::StreamConfig;
use crate::telemetry::{increment_counter, CounterMetric};
use crate::ws::{CloseReason, WsClient, WsConfig, WsError, WsMessage, WsSubscription};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Identifies one StreamConnection instance; a reconnect gets a fresh id
pub type ConnectionId = Uuid;

/// Lifecycle signals a connection reports to its owner
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Transport is ready
    Open,
    /// A decoded price tick
    Tick(Tick),
    /// Non-terminal transport error
    Error(WsError),
    /// Transport is gone; no further events follow from this connection
    Closed(CloseReason),
}

/// A stream event tagged with its origin
#[derive(Debug, Clone)]
pub struct StreamEnvelope {
    pub symbol: Symbol,
    pub connection: ConnectionId,
    pub event: StreamEvent,
}

/// Handle to one live streaming channel
///
/// Owns the transport task only. Closing is idempotent and also happens on drop.
#[derive(Debug)]
pub struct StreamConnection {
    symbol: Symbol,
    id: ConnectionId,
    task: Option<JoinHandle<()>>,
}

impl StreamConnection {
    /// Wrap a running transport task
    pub fn new(symbol: Symbol, id: ConnectionId, task: JoinHandle<()>) -> Self {
        Self {
            symbol,
            id,
            task: Some(task),
        }
    }

    /// A connection with no transport task, for connectors that push events
    /// from elsewhere
    pub fn detached(symbol: Symbol, id: ConnectionId) -> Self {
        Self {
            symbol,
            id,
            task: None,
        }
    }

    /// Tear down the transport; a second call does nothing
    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            tracing::debug!(symbol = %self.symbol, connection = %self.id, "Closing stream connection");
            task.abort();
        }
    }
}

impl Drop for StreamConnection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens stream connections on behalf of the aggregator
///
/// Implementations deliver every event for the connection to `events`,
/// tagged with `symbol` and `id`, in transport order.
pub trait StreamConnector: Send + Sync {
    fn open(
        &self,
        symbol: &Symbol,
        id: ConnectionId,
        events: mpsc::Sender<CoreEvent>,
    ) -> StreamConnection;
}

/// WebSocket connector: one socket per symbol at `{base_url}/{symbol}`
pub struct WsStreamConnector {
    base_url: String,
    ping_interval: Duration,
}

impl WsStreamConnector {
    /// Create a connector for the given stream base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ping_interval: Duration::from_secs(30),
        }
    }

    /// Create a connector from the `[stream]` configuration section
    pub fn from_config(config: &StreamConfig) -> Self {
        Self::new(config.base_url.clone()).ping_interval(config.ping_interval())
    }

    /// Set the keep-alive ping interval
    pub fn ping_interval(mut self, d: Duration) -> Self {
        self.ping_interval = d;
        self
    }

    /// Build the WebSocket URL for a symbol's stream
    fn stream_url(&self, symbol: &Symbol) -> String {
        format!("{}/{}", self.base_url, symbol)
    }

    /// Translate transport messages into stream events until the transport closes
    async fn run_message_loop(
        symbol: Symbol,
        id: ConnectionId,
        mut sub: WsSubscription,
        events: mpsc::Sender<CoreEvent>,
    ) {
        while let Some(msg) = sub.messages.recv().await {
            let event = match msg {
                WsMessage::Text(text) => match Tick::from_payload(&symbol, &text) {
                    Ok(tick) => StreamEvent::Tick(tick),
                    Err(e) => {
                        tracing::warn!(symbol = %symbol, error = %e, "Dropping malformed tick");
                        increment_counter(CounterMetric::MalformedTicks, &symbol);
                        continue;
                    }
                },
                WsMessage::Binary(_) => continue,
                WsMessage::Connected => StreamEvent::Open,
                WsMessage::Error(e) => StreamEvent::Error(e),
                WsMessage::Disconnected { reason } => StreamEvent::Closed(reason),
            };

            let closed = matches!(event, StreamEvent::Closed(_));
            let envelope = StreamEnvelope {
                symbol: symbol.clone(),
                connection: id,
                event,
            };
            if events.send(CoreEvent::Stream(envelope)).await.is_err() {
                tracing::debug!(symbol = %symbol, "Aggregator dropped, stopping stream");
                break;
            }
            if closed {
                break;
            }
        }
    }
}

impl StreamConnector for WsStreamConnector {
    fn open(
        &self,
        symbol: &Symbol,
        id: ConnectionId,
        events: mpsc::Sender<CoreEvent>,
    ) -> StreamConnection {
        let url = self.stream_url(symbol);
        tracing::info!(symbol = %symbol, url = %url, "Opening stream connection");

        let client = WsClient::new(WsConfig::new(url).ping_interval(self.ping_interval));
        let task_symbol = symbol.clone();
        let task = tokio::spawn(async move {
            let sub = client.connect();
            Self::run_message_loop(task_symbol, id, sub, events).await;
        });

        StreamConnection::new(symbol.clone(), id, task)
    }
}
