//! Health and readiness checks.

use axum::Json;
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process is serving
    pub status: &'static str,
}

/// Liveness probe. No authentication, no dependencies.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Readiness probe. The server only starts serving after the store is
/// connected and migrated, so readiness equals liveness here.
pub async fn readiness_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
