use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::error::HostError;
use crate::metrics;
use crate::services::AppState;

pub mod arcade;
pub mod leaderboard;
pub mod quiz;
pub mod sse;

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "examrace-api",
            "version": env!("CARGO_PKG_VERSION"),
            "sessions": {
                "quiz": state.quiz_sessions.len().await,
                "arcade": state.arcade_sessions.len().await,
            }
        })),
    )
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

pub(crate) fn session_not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "Session not found".to_string())
}

pub(crate) fn host_unavailable(e: HostError) -> (StatusCode, String) {
    tracing::error!("Game host unavailable: {}", e);
    (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
}
