use axum::{
    body::Bytes,
    extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    response::Response,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::{sync::Arc, time::Duration};
use tokio::{sync::mpsc, time::Instant};

use crate::{models::client::ClientMeta, registry::ConnectionRegistry, state::AppState};

pub fn proceed_with_socket(ws: WebSocketUpgrade, state: Arc<AppState>, meta: ClientMeta) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, meta))
}

pub async fn handle_socket(socket: WebSocket, state: Arc<AppState>, meta: ClientMeta) {
    let (tx, rx) = mpsc::channel(state.queue_capacity);
    let id = state.registry.accept(tx, meta).await;

    let (ws_sender, ws_receiver) = socket.split();

    let mut send_task = tokio::spawn(write_frames(ws_sender, rx, state.heartbeat_interval));

    let registry = state.registry.clone();
    let reader_id = id.clone();
    let mut recv_task =
        tokio::spawn(async move { read_frames(ws_receiver, &registry, &reader_id).await });

    // Whichever side finishes first takes the other down with it
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.registry.disconnect(&id).await;
}

/// Drains the client's queue into the socket. Ends when the socket fails or
/// the registry drops the queue's sender.
async fn write_frames(
    mut ws_sender: SplitSink<WebSocket, WsMessage>,
    mut rx: mpsc::Receiver<Arc<str>>,
    heartbeat_interval: Duration,
) {
    let mut heartbeat =
        tokio::time::interval_at(Instant::now() + heartbeat_interval, heartbeat_interval);

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else {
                    let _ = ws_sender.send(WsMessage::Close(None)).await;
                    break;
                };
                if ws_sender.send(WsMessage::Text(frame.to_string().into())).await.is_err() {
                    break;
                }
            }
            _ = heartbeat.tick() => {
                if ws_sender.send(WsMessage::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn read_frames(
    mut ws_receiver: SplitStream<WebSocket>,
    registry: &ConnectionRegistry,
    id: &str,
) {
    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(WsMessage::Text(text)) => registry.handle_inbound(id, text.as_str()).await,
            // Binary frames carry the same JSON envelopes
            Ok(WsMessage::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => registry.handle_inbound(id, text).await,
                Err(e) => {
                    tracing::warn!(client = %id, error = %e, "dropping non-UTF-8 binary frame");
                }
            },
            // Heartbeat answers keep listen-only clients from going idle
            Ok(WsMessage::Pong(_)) => {
                registry.touch(id).await;
            }
            Ok(WsMessage::Close(_)) => break,
            Ok(WsMessage::Ping(_)) => continue,
            Err(e) => {
                tracing::debug!(client = %id, error = %e, "websocket transport error");
                break;
            }
        }
    }
}
