use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::types::ApiResult;
use crate::state::AppState;

/// True when `headers` carry exactly the configured admin token. Nothing
/// passes while no token is configured.
fn is_admin(expected: Option<&str>, headers: &HeaderMap) -> bool {
    let provided = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok());
    matches!((expected, provided), (Some(expected), Some(provided)) if expected == provided)
}

pub async fn admin_auth(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if is_admin(state.admin_token.as_deref(), req.headers()) {
        return next.run(req).await;
    }

    tracing::debug!(
        method = %req.method(),
        path = %req.uri().path(),
        "rejected admin request"
    );
    ApiResult::<()>::error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED").into_response()
}
