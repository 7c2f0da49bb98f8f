//! `{ "data": ..., "error": ... }` envelope shared by the admin routes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

pub trait IntoApiResponse<T> {
    fn into_api_response(self) -> ApiResponse<T>;
}

impl<T, E: ToString> IntoApiResponse<T> for Result<T, E> {
    fn into_api_response(self) -> ApiResponse<T> {
        match self {
            Ok(data) => ApiResponse::success(data),
            Err(error) => ApiResponse::error(error.to_string()),
        }
    }
}

impl<T> IntoApiResponse<T> for Option<T> {
    fn into_api_response(self) -> ApiResponse<T> {
        match self {
            Some(data) => ApiResponse::success(data),
            None => ApiResponse::error("NOT_FOUND"),
        }
    }
}

/// Envelope plus the status it is served with
pub struct ApiResult<T> {
    pub status: StatusCode,
    pub body: ApiResponse<T>,
}

impl<T> ApiResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            body: ApiResponse::success(data),
        }
    }

    pub fn error(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiResponse::error(error),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResult<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Serves successes as 200 and failures with `error_status`.
pub fn api_response<T>(response: impl IntoApiResponse<T>, error_status: StatusCode) -> ApiResult<T> {
    let body = response.into_api_response();
    let status = if body.is_success() {
        StatusCode::OK
    } else {
        error_status
    };
    ApiResult { status, body }
}
