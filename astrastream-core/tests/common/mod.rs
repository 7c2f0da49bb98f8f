#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpStream, time::timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use astrastream_core::{
    MessageKind, MessageSource, Server, ServerConfig, StreamMessage, state::AppState,
};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Always emits the same kind, so ticks are predictable
pub struct FixedSource(pub MessageKind);

impl MessageSource for FixedSource {
    fn next_message(&mut self) -> StreamMessage {
        StreamMessage::on_default_channel(self.0, serde_json::json!({ "source": "fixed" }))
    }
}

/// Config with ticks far enough apart that tests drive the engine by hand
pub fn test_config() -> ServerConfig {
    ServerConfig::default()
        .admin_token("test_admin_token")
        .tick_interval(Duration::from_secs(3600))
}

pub async fn spawn_server(config: ServerConfig, source: Box<dyn MessageSource>) -> (SocketAddr, Arc<AppState>) {
    let state = Arc::new(AppState::with_source(&config, source));
    let server = Server::with_state(config, state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.serve(listener, std::future::pending()));

    (addr, state)
}

pub async fn connect(addr: SocketAddr) -> WsClient {
    let (ws, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    ws
}

pub async fn send_json(ws: &mut WsClient, value: Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

/// Next text frame as JSON, skipping transport-level ping/pong
pub async fn next_json(ws: &mut WsClient) -> Value {
    loop {
        let msg = timeout(READ_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("websocket error");
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

/// Asserts no text frame arrives within `window`
pub async fn assert_silent(ws: &mut WsClient, window: Duration) {
    let deadline = tokio::time::Instant::now() + window;
    loop {
        match tokio::time::timeout_at(deadline, ws.next()).await {
            Err(_) => return,
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => continue,
            Ok(other) => panic!("expected silence, got {:?}", other),
        }
    }
}

/// Waits for the server to close the socket
pub async fn expect_closed(ws: &mut WsClient) {
    loop {
        match timeout(READ_TIMEOUT, ws.next()).await.expect("socket was not closed") {
            None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(other)) => panic!("expected close, got {:?}", other),
        }
    }
}

pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..250 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not met in time");
}
