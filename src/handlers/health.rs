use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LivenessResponse {
    pub status: ComponentStatus,
    #[schema(example = "0.1.0")]
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReadinessResponse {
    pub status: ComponentStatus,
    pub database: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Liveness probe; answers as long as the process serves requests.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is running", body = LivenessResponse)),
    tag = "Health"
)]
pub async fn liveness_check() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: ComponentStatus::Up,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness probe; pings the order store.
#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "Store reachable", body = ReadinessResponse),
        (status = 503, description = "Store unreachable", body = ReadinessResponse),
    ),
    tag = "Health"
)]
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let start = Instant::now();
    match crate::db::check_connection(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: ComponentStatus::Up,
                database: ComponentStatus::Up,
                latency_ms: Some(start.elapsed().as_millis() as u64),
            }),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: ComponentStatus::Down,
                database: ComponentStatus::Down,
                latency_ms: None,
            }),
        ),
    }
}

/// Routes mounted at `/health`:
/// - GET /health        - liveness
/// - GET /health/ready  - readiness (store connectivity)
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(liveness_check))
        .route("/ready", get(readiness_check))
}
