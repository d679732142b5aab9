//! Health check handlers
//!
//! Provides health and readiness endpoints for monitoring and orchestration.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status: "healthy" or "degraded"
    #[schema(example = "healthy")]
    pub status: &'static str,
    /// Server version from Cargo.toml
    #[schema(example = "0.1.0")]
    pub version: &'static str,
    /// Repository backend: "memory" or "postgres"
    #[schema(example = "postgres")]
    pub backend: &'static str,
    /// Stored fingerprint records, absent when the repository is unreachable
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 1284)]
    pub record_count: Option<u64>,
    /// Service name
    #[schema(example = "imgdedup-server")]
    pub service: &'static str,
}

/// GET /health - Health check endpoint
///
/// Returns JSON with service status, version and repository state.
/// Always 200; a failing repository reports "degraded".
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service status", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let repo = state.repository();

    let record_count = match repo.count().await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!(backend = repo.backend(), error = %e, "Health check could not count records");
            None
        }
    };

    Json(HealthResponse {
        status: if record_count.is_some() {
            "healthy"
        } else {
            "degraded"
        },
        version: env!("CARGO_PKG_VERSION"),
        backend: repo.backend(),
        record_count,
        service: "imgdedup-server",
    })
}

/// Readiness response for Kubernetes
#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Whether the service is ready to accept traffic
    pub ready: bool,
    /// Optional message explaining status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// GET /ready - readiness check for orchestrators
///
/// Returns 200 when the repository answers, 503 otherwise.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready to accept uploads", body = ReadyResponse),
        (status = 503, description = "Repository unavailable", body = ReadyResponse)
    )
)]
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    match state.repository().check_health().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                message: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    ready: false,
                    message: Some("Fingerprint repository unavailable".to_string()),
                }),
            )
        }
    }
}
