//! Liveness endpoint.

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /manage/health. Does not touch the backends.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "UP" })
}
