//! Request id, request logging and CORS middleware.

use std::time::Instant;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use gateway_core::X_API_KEY;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::{
    error::ApiError,
    extractors::{RequestId, REQUEST_ID_HEADER},
    state::AppState,
};

/// Assign a request id (inbound value reused) and echo it on the response
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

    request.extensions_mut().insert(RequestId(id.clone()));
    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Log every request. Bodies of mutating requests are summarized: content
/// type, size and, for JSON objects, the top-level keys. Values are never
/// logged.
pub async fn logging_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    let request = if has_body(&method) {
        let (parts, body) = request.into_parts();
        let limit = state.config.server.max_body_bytes;
        let bytes = match axum::body::to_bytes(body, limit).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(method = %method, path = %path, error = %e, "Request body rejected");
                return ApiError::new(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "invalid_request",
                    "request body too large",
                )
                .into_response();
            }
        };

        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let (body_type, body_keys) = summarize_body(&bytes);
        info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            content_type,
            body_type,
            body_keys = ?body_keys,
            body_size = bytes.len(),
            "Request received"
        );

        Request::from_parts(parts, Body::from(bytes))
    } else {
        info!(request_id = %request_id, method = %method, path = %path, "Request received");
        request
    };

    let response = next.run(request).await;
    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Request completed"
    );
    response
}

fn has_body(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Body kind and top-level keys for a JSON object
fn summarize_body(bytes: &[u8]) -> (&'static str, Vec<String>) {
    if bytes.is_empty() {
        return ("empty", Vec::new());
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(object)) => ("object", object.keys().cloned().collect()),
        Ok(Value::Array(_)) => ("array", Vec::new()),
        Ok(_) => ("scalar", Vec::new()),
        Err(_) => ("raw", Vec::new()),
    }
}

/// CORS for the proxy and API mounts: any origin, credential headers allowed
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, X_API_KEY])
}
