//! End-to-end tests: local WebSocket price server through the aggregator

use futures_util::SinkExt;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tickwatch::aggregator::{
    Aggregator, ConnectionState, DashboardEvent, HeaderUpdate, RenderUpdate,
};
use tickwatch::config::Config;
use tickwatch::feed::{Symbol, WsStreamConnector};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Accept one stream, send `frames`, then close
async fn serve_ticks(frames: Vec<&'static str>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(socket).await.unwrap();
        for frame in frames {
            ws.send(Message::Text(frame.to_string())).await.unwrap();
        }
        let _ = ws.close(None).await;
    });

    format!("ws://{addr}/ws")
}

/// Collect events until `done` says so, failing after a few seconds
async fn collect_until(
    updates: &mut mpsc::UnboundedReceiver<DashboardEvent>,
    mut done: impl FnMut(&[DashboardEvent]) -> bool,
) -> Vec<DashboardEvent> {
    let mut seen = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(event) = updates.recv().await {
            seen.push(event);
            if done(&seen) {
                return;
            }
        }
    })
    .await
    .expect("Timed out waiting for dashboard events");
    seen
}

fn closed(symbol: &str) -> impl Fn(&DashboardEvent) -> bool + '_ {
    move |e| {
        matches!(
            e,
            DashboardEvent::Connection { symbol: s, state } if s.as_str() == symbol && state.is_terminal()
        )
    }
}

#[tokio::test]
async fn test_ticks_flow_to_list_and_selected_chart() {
    let base = serve_ticks(vec![
        r#"{"price":100,"timestamp":"2024-01-01T09:30:00Z"}"#,
        "not json",
        r#"{"price":"110","timestamp":"2024-01-01T09:30:01Z"}"#,
        r#"{"price":99,"timestamp":1704101402000}"#,
    ])
    .await;

    let config = Config::default();
    let connector = Arc::new(WsStreamConnector::new(base));
    let (aggregator, mut updates) = Aggregator::spawn(&config, connector);
    let handle = aggregator.handle();

    handle.register_symbol("AAPL").await.unwrap();
    handle.select("AAPL").await.unwrap();

    let events = collect_until(&mut updates, |seen| seen.iter().any(closed("AAPL"))).await;

    let changes: Vec<Decimal> = events
        .iter()
        .filter_map(|e| match e {
            DashboardEvent::List(l) => Some(l.change_pct),
            _ => None,
        })
        .collect();
    assert_eq!(
        changes,
        vec![Decimal::ZERO, Decimal::from(10), Decimal::from(-10)]
    );

    let last_render = events
        .iter()
        .rev()
        .find_map(|e| match e {
            DashboardEvent::Render(RenderUpdate::Series { ticks, .. }) => Some(ticks.len()),
            _ => None,
        })
        .unwrap();
    assert_eq!(last_render, 3);

    let quotes = events
        .iter()
        .filter(|e| matches!(e, DashboardEvent::Header(HeaderUpdate::Quote { .. })))
        .count();
    // One on selection plus one per tick
    assert_eq!(quotes, 4);

    assert!(events.contains(&DashboardEvent::Connection {
        symbol: Symbol::new("AAPL"),
        state: ConnectionState::Open,
    }));
    assert_eq!(
        handle.connection_state("AAPL").await.unwrap(),
        ConnectionState::Closed
    );
    // History outlives the connection
    assert_eq!(handle.snapshot("AAPL").await.unwrap().len(), 3);

    aggregator.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_stream_fails_only_its_symbol() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = format!("ws://{}/ws", listener.local_addr().unwrap());
    drop(listener);

    let config = Config::default();
    let (aggregator, mut updates) =
        Aggregator::spawn(&config, Arc::new(WsStreamConnector::new(dead)));
    let handle = aggregator.handle();

    handle.register_symbol("AAPL").await.unwrap();
    let events = collect_until(&mut updates, |seen| seen.iter().any(closed("AAPL"))).await;

    assert!(events
        .iter()
        .any(|e| matches!(e, DashboardEvent::StreamError { .. })));
    assert_eq!(
        handle.connection_state("AAPL").await.unwrap(),
        ConnectionState::Failed
    );
    assert_eq!(handle.symbols().await.unwrap(), vec![Symbol::new("AAPL")]);

    aggregator.shutdown().await;
}

#[tokio::test]
async fn test_unregister_clears_selection() {
    let base = serve_ticks(vec![r#"{"price":42.5,"timestamp":"2024-01-01T09:30:00Z"}"#]).await;

    let (aggregator, mut updates) =
        Aggregator::spawn(&Config::default(), Arc::new(WsStreamConnector::new(base)));
    let handle = aggregator.handle();

    handle.register_symbol("MSFT").await.unwrap();
    handle.select("MSFT").await.unwrap();
    handle.unregister_symbol("MSFT").await.unwrap();

    let events = collect_until(&mut updates, |seen| {
        seen.contains(&DashboardEvent::Render(RenderUpdate::Cleared))
    })
    .await;

    assert!(events.contains(&DashboardEvent::Header(HeaderUpdate::Cleared)));
    assert_eq!(handle.selected().await.unwrap(), None);
    assert!(handle.snapshot("MSFT").await.is_err());

    aggregator.shutdown().await;
}
