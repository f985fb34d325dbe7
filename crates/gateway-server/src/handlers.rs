//! HTTP request handlers for the operational endpoints.

use std::collections::HashMap;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use gateway_core::Channel;
use serde::Serialize;
use tracing::{error, instrument};

use crate::{error::ApiError, state::AppState};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Version
    pub version: String,
    /// Uptime in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u64>,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: Some(state.started_at.elapsed().as_secs()),
    })
}

/// Readiness check endpoint: ready once at least one channel is active
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.channels.list_active_channels().await {
        Ok(channels) if !channels.is_empty() => (StatusCode::OK, "ready"),
        Ok(_) => (StatusCode::SERVICE_UNAVAILABLE, "no active channels"),
        Err(e) => {
            error!(error = %e, "Readiness check could not list channels");
            (StatusCode::SERVICE_UNAVAILABLE, "channel directory unavailable")
        }
    }
}

/// Liveness check endpoint
pub async fn liveness_check() -> impl IntoResponse {
    (StatusCode::OK, "alive")
}

/// Metrics endpoint (Prometheus format)
pub async fn metrics_endpoint(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state
        .metrics
        .gather()
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, state.metrics.content_type())], body))
}

/// Models aggregated across active channels
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ModelsResponse {
    /// Models in first-seen order
    pub models: Vec<ModelEntry>,
}

/// One model and the channels serving it
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ModelEntry {
    /// Model id
    pub id: String,
    /// Channels listing this model
    pub channels: Vec<ModelChannel>,
}

/// Channel reference inside a [`ModelEntry`]
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ModelChannel {
    /// Channel id
    pub id: String,
    /// Channel display name
    pub name: String,
}

/// Group the channels' model lists by model id
pub fn aggregate_models(channels: &[Channel]) -> ModelsResponse {
    let mut models: Vec<ModelEntry> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for channel in channels {
        for model in &channel.supported_models {
            let slot = *index.entry(model.as_str()).or_insert_with(|| {
                models.push(ModelEntry {
                    id: model.clone(),
                    channels: Vec::new(),
                });
                models.len() - 1
            });
            models[slot].channels.push(ModelChannel {
                id: channel.id.clone(),
                name: channel.name.clone(),
            });
        }
    }

    ModelsResponse { models }
}

/// List models endpoint
#[instrument(skip(state))]
pub async fn list_models(State(state): State<AppState>) -> Result<Json<ModelsResponse>, ApiError> {
    let channels = state.channels.list_active_channels().await?;
    Ok(Json(aggregate_models(&channels)))
}
