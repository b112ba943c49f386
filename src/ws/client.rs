//! Single-shot WebSocket client
//!
//! Each call to [`WsClient::connect`] makes exactly one connection attempt.
//! Reconnection is left to the owner of the subscription.

use super::types::{CloseReason, WsConfig, WsError, WsMessage};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// WebSocket client with ping/pong keep-alive
pub struct WsClient {
    config: WsConfig,
}

/// A live connection task and the channel it reports on
///
/// Dropping the subscription aborts the connection task.
pub struct WsSubscription {
    pub messages: mpsc::Receiver<WsMessage>,
    task: Option<JoinHandle<()>>,
}

impl WsSubscription {
    /// Wrap an existing message channel that has no connection task behind it
    pub fn from_receiver(messages: mpsc::Receiver<WsMessage>) -> Self {
        Self {
            messages,
            task: None,
        }
    }

    /// Abort the connection task; calling this again is a no-op
    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for WsSubscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl WsClient {
    /// Create a new WebSocket client with the given configuration
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    /// Connect and return a subscription to the connection's messages
    ///
    /// The background task reports `Connected` once the handshake completes,
    /// then every frame, and finally exactly one `Disconnected`. A failure is
    /// reported as `Error` immediately before the `Disconnected`.
    pub fn connect(&self) -> WsSubscription {
        let (tx, rx) = mpsc::channel(1024);
        let config = self.config.clone();

        let task = tokio::spawn(async move {
            let reason = match Self::connect_and_stream(&config, &tx).await {
                Ok(()) => {
                    tracing::info!(url = %config.url, "WebSocket connection closed cleanly");
                    CloseReason::Normal
                }
                Err(e) => {
                    tracing::warn!(url = %config.url, error = %e, "WebSocket connection failed");
                    let _ = tx.send(WsMessage::Error(e)).await;
                    CloseReason::Failed
                }
            };
            let _ = tx.send(WsMessage::Disconnected { reason }).await;
        });

        WsSubscription {
            messages: rx,
            task: Some(task),
        }
    }

    /// Connect to WebSocket and stream messages until close or failure
    async fn connect_and_stream(
        config: &WsConfig,
        tx: &mpsc::Sender<WsMessage>,
    ) -> Result<(), WsError> {
        tracing::debug!(url = %config.url, "Connecting to WebSocket");

        let (ws_stream, _response) = connect_async(&config.url)
            .await
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

        let (mut write, mut read) = ws_stream.split();

        if tx.send(WsMessage::Connected).await.is_err() {
            return Ok(());
        }

        let mut ping_interval = tokio::time::interval(config.ping_interval);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick completes immediately
        ping_interval.tick().await;

        let mut waiting_for_pong = false;

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if tx.send(WsMessage::Text(text)).await.is_err() {
                                tracing::debug!("Receiver dropped, closing connection");
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Binary(data))) => {
                            if tx.send(WsMessage::Binary(data)).await.is_err() {
                                tracing::debug!("Receiver dropped, closing connection");
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            waiting_for_pong = false;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::debug!("Received close frame");
                            return Ok(());
                        }
                        Some(Err(e)) => {
                            return Err(WsError::ConnectionFailed(e.to_string()));
                        }
                        None => {
                            return Err(WsError::ConnectionFailed("Stream ended unexpectedly".into()));
                        }
                        _ => {}
                    }
                }

                _ = ping_interval.tick() => {
                    if waiting_for_pong {
                        return Err(WsError::PongTimeout);
                    }
                    write.send(Message::Ping(vec![])).await
                        .map_err(|e| WsError::SendFailed(e.to_string()))?;
                    waiting_for_pong = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_ws_client_with_config() {
        let config = WsConfig::new("ws://test.local").ping_interval(Duration::from_secs(15));

        let client = WsClient::new(config);
        assert_eq!(client.config.url, "ws://test.local");
        assert_eq!(client.config.ping_interval, Duration::from_secs(15));
    }

    #[tokio::test]
    async fn test_ws_client_connection_failure() {
        // Nothing listens on port 1
        let client = WsClient::new(WsConfig::new("ws://127.0.0.1:1"));
        let mut sub = client.connect();

        let mut got_error = false;
        let reason = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(msg) = sub.messages.recv().await {
                match msg {
                    WsMessage::Error(_) => got_error = true,
                    WsMessage::Disconnected { reason } => return Some(reason),
                    _ => {}
                }
            }
            None
        })
        .await
        .expect("Test timed out");

        assert!(got_error, "Failure should be reported before disconnect");
        assert_eq!(reason, Some(CloseReason::Failed));
    }

    #[tokio::test]
    async fn test_subscription_close_is_idempotent() {
        let client = WsClient::new(WsConfig::new("ws://127.0.0.1:1"));
        let mut sub = client.connect();
        sub.close();
        sub.close();
        assert!(sub.task.is_none());
    }
}
