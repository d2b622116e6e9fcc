//! Health, model listing, metrics and admin endpoints.

use crate::state::AppState;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use gateway_routing::BackendHealth;
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// Version
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime_seconds: u64,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// Model entry in the OpenAI list format
#[derive(Debug, Serialize)]
pub struct ModelObject {
    /// Model name
    pub id: String,
    /// Always `model`
    pub object: &'static str,
    /// Creation time
    pub created: i64,
    /// Owner
    pub owned_by: &'static str,
}

/// Model list
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    /// Always `list`
    pub object: &'static str,
    /// Models
    pub data: Vec<ModelObject>,
}

/// `GET /v1/models`
pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let created = chrono::Utc::now().timestamp() - i64::try_from(state.uptime_seconds()).unwrap_or(0);
    Json(ModelsResponse {
        object: "list",
        data: state
            .models()
            .iter()
            .map(|m| ModelObject {
                id: m.name.clone(),
                object: "model",
                created,
                owned_by: "completion-gateway",
            })
            .collect(),
    })
}

/// `GET /metrics` in the Prometheus text format
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics().gather(),
    )
}

/// Routing state of one model
#[derive(Debug, Serialize)]
pub struct ModelStatus {
    /// Model name
    pub model: String,
    /// Routing strategy
    pub strategy: &'static str,
    /// Backends and their health
    pub backends: Vec<BackendHealth>,
}

/// `GET /admin/backends`
pub async fn backends(State(state): State<AppState>) -> Json<Vec<ModelStatus>> {
    Json(
        state
            .models()
            .iter()
            .map(|m| ModelStatus {
                model: m.name.clone(),
                strategy: m.router.strategy(),
                backends: m.router.health(),
            })
            .collect(),
    )
}
