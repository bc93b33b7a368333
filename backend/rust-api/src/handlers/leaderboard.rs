use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::{
    error::RecorderError,
    models::{answer::LeaderboardQuery, GameMode, SessionResult},
    services::AppState,
};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

/// GET /api/v1/leaderboard/{mode}/{topic}
pub async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Path((mode, topic)): Path<(GameMode, String)>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<SessionResult>>, (StatusCode, String)> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    match state.recorder.leaderboard(mode, &topic, limit).await {
        Ok(board) => Ok(Json(board)),
        Err(RecorderError::Unsupported(what)) => Err((
            StatusCode::NOT_IMPLEMENTED,
            format!("Configured recorder does not serve {}", what),
        )),
        Err(e) => {
            tracing::error!(
                "Failed to load leaderboard for {}/{}: {}",
                mode.as_str(),
                topic,
                e
            );
            Err((StatusCode::BAD_GATEWAY, e.to_string()))
        }
    }
}
