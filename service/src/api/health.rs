//! `GET /api/health` (spec.md §6, AMBIENT-5).

use std::sync::Arc;

use axum::{extract::Extension, Json};
use serde::Serialize;
use utoipa::ToSchema;

use super::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_s: u64,
    pub version: String,
}

/// Liveness/readiness probe reporting process uptime and build version.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "System",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
#[allow(clippy::unused_async)]
pub async fn get_health(Extension(state): Extension<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        uptime_s: state.started_at.elapsed().as_secs(),
        version: state.build_info.version.clone(),
    })
}
