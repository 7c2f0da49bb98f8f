use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::types::{ApiResult, api_response};
use crate::{
    models::{
        channel::RegistryStats,
        client::{ClientStats, DisconnectPayload},
    },
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct Published {
    pub delivered: usize,
}

#[derive(Debug, Serialize)]
pub struct Disconnected {
    pub id: Arc<str>,
}

pub async fn stats_handler(State(state): State<Arc<AppState>>) -> ApiResult<RegistryStats> {
    ApiResult::ok(state.registry.stats().await)
}

pub async fn client_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ClientStats> {
    api_response(state.registry.client(&id).await, StatusCode::NOT_FOUND)
}

pub async fn disconnect_client(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DisconnectPayload>, JsonRejection>,
) -> ApiResult<Disconnected> {
    let Ok(Json(payload)) = payload else {
        return ApiResult::error(StatusCode::BAD_REQUEST, "BAD_REQUEST");
    };

    if state.registry.disconnect(&payload.id).await {
        tracing::info!(client = %payload.id, "client disconnected by admin");
        ApiResult::ok(Disconnected { id: payload.id })
    } else {
        ApiResult::error(StatusCode::NOT_FOUND, "NOT_FOUND")
    }
}

pub async fn publish_metrics(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Published> {
    let Ok(Json(payload)) = payload else {
        return ApiResult::error(StatusCode::BAD_REQUEST, "BAD_REQUEST");
    };

    let delivered = state.engine.publish_metric_update(payload).await;
    ApiResult::ok(Published { delivered })
}

pub async fn publish_insights(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Published> {
    let Ok(Json(payload)) = payload else {
        return ApiResult::error(StatusCode::BAD_REQUEST, "BAD_REQUEST");
    };

    let delivered = state.engine.publish_ai_insight(payload).await;
    ApiResult::ok(Published { delivered })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ServerConfig,
        models::{client::ClientMeta, control::Subscription},
    };
    use tokio::sync::mpsc;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(&ServerConfig::default().admin_token("test_admin_token")))
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();
        let (tx, _rx) = mpsc::channel(8);
        let id = state.registry.accept(tx, ClientMeta::default()).await;
        state
            .registry
            .subscribe(
                &id,
                Subscription {
                    channel: "metrics".to_string(),
                    filters: None,
                },
            )
            .await;

        let result = stats_handler(State(state)).await;
        assert_eq!(result.status, StatusCode::OK);

        let stats = result.body.data.unwrap();
        assert_eq!(stats.connections, 1);
        assert_eq!(stats.channels.get("metrics"), Some(&1));
        assert_eq!(stats.clients.len(), 1);
        assert_eq!(stats.clients[0].id, id);
    }

    #[tokio::test]
    async fn test_disconnect_client_success() {
        let state = test_state();
        let (tx, mut rx) = mpsc::channel(8);
        let id = state.registry.accept(tx, ClientMeta::default()).await;

        let payload = DisconnectPayload { id: id.clone() };
        let result = disconnect_client(State(state.clone()), Ok(Json(payload))).await;

        assert_eq!(result.status, StatusCode::OK);
        assert_eq!(state.registry.connection_count().await, 0);

        // The registry held the only sender, so the writer side sees the close
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_disconnect_client_not_found() {
        let state = test_state();
        let payload = DisconnectPayload {
            id: Arc::from("NONEXIST"),
        };

        let result = disconnect_client(State(state), Ok(Json(payload))).await;
        assert_eq!(result.status, StatusCode::NOT_FOUND);
        assert_eq!(result.body.error.as_deref(), Some("NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_client_handler_unknown() {
        let result = client_handler(State(test_state()), Path("NOPE".to_string())).await;
        assert_eq!(result.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_publish_metrics_reports_delivery() {
        let state = test_state();
        let result =
            publish_metrics(State(state), Ok(Json(serde_json::json!({ "totalPosts": 1 })))).await;
        assert_eq!(result.status, StatusCode::OK);
        assert_eq!(result.body.data.unwrap().delivered, 0);
    }
}
