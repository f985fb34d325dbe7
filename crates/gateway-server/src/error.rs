//! API error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gateway_core::GatewayError;
use serde::Serialize;

/// Error returned by gateway-synthesized responses.
///
/// Upstream errors never pass through here; they are relayed verbatim.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    /// HTTP status
    pub status: StatusCode,
    /// Stable machine-readable code
    pub code: &'static str,
    /// Human-readable message
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    code: &'a str,
}

impl ApiError {
    /// Create an error with an explicit status and code
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// 401 Unauthorized
    pub fn unauthorized(message: impl Into<String>) -> Self {
        GatewayError::unauthorized(message).into()
    }

    /// 400 Bad Request
    pub fn bad_request(message: impl Into<String>) -> Self {
        GatewayError::invalid_request(message).into()
    }

    /// 500 Internal Server Error
    pub fn internal(message: impl Into<String>) -> Self {
        GatewayError::internal(message).into()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let status = StatusCode::from_u16(err.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = match &err {
            GatewayError::Unauthorized { message }
            | GatewayError::InvalidRequest { message }
            | GatewayError::Internal { message } => message.clone(),
            // Store details stay in the logs
            GatewayError::Store { .. } => "storage unavailable".to_string(),
            other => other.to_string(),
        };
        Self {
            status,
            code: err.code(),
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}
