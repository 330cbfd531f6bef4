use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("upstream error from {service}: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }

    pub fn upstream<E: std::fmt::Display>(service: &'static str, err: E) -> Self {
        ApiError::Upstream {
            service,
            message: err.to_string(),
        }
    }

    /// Message text exposed to HTTP callers.
    pub fn client_message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Upstream { message, .. } => message,
            ApiError::Internal(msg) => msg,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream { .. } | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(json!({ "error": self.client_message() }));
        (self.status(), body).into_response()
    }
}
