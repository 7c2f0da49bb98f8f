use axum::{
    Json,
    extract::{ConnectInfo, State, ws::WebSocketUpgrade},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use serde_json::Value;
use std::{net::SocketAddr, sync::Arc};

use crate::{models::client::ClientMeta, state::AppState, websocket::connection::proceed_with_socket};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, (StatusCode, Json<Value>)> {
    state.rate_limiter.check(addr.ip()).await?;

    let user_agent = headers
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .map(String::from);
    let meta = ClientMeta {
        ip: Some(addr),
        user_agent,
    };

    Ok(proceed_with_socket(ws, state, meta))
}
