use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;

use super::{handlers, middleware::admin_auth};
use crate::state::AppState;

/// Admin routes, all behind `admin_auth`.
pub fn configure_api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/stats", get(handlers::stats_handler))
        .route("/clients/{id}", get(handlers::client_handler))
        .route("/disconnect", post(handlers::disconnect_client))
        .route("/publish/metrics", post(handlers::publish_metrics))
        .route("/publish/insights", post(handlers::publish_insights))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth))
        .with_state(state)
}
