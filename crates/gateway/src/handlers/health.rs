//! Health and readiness handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;
use shelfwise_common::errors::Result;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Liveness probe: the process is up
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: shelfwise_common::VERSION,
    })
}

/// Readiness probe: the database answers
pub async fn ready(State(state): State<AppState>) -> Result<StatusCode> {
    state.repo.ping().await?;
    Ok(StatusCode::OK)
}
