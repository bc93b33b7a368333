use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{host_unavailable, session_not_found};
use crate::{
    engine::{ArcadeEngine, Effect, GameEngine},
    models::{
        answer::{CreateSessionResponse, StartArcadeRequest, SubmitArcadeAnswerRequest},
        snapshot::ArcadeSnapshot,
    },
    services::{game_host::GameHost, AppState},
};

type HandlerResult<T> = Result<T, (StatusCode, String)>;

async fn host(state: &AppState, session_id: &Uuid) -> HandlerResult<GameHost<ArcadeEngine>> {
    state
        .arcade_sessions
        .get(session_id)
        .await
        .ok_or_else(session_not_found)
}

pub async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let host = state.spawn_arcade();
    let snapshot = host.snapshot();
    let session_id = state.arcade_sessions.insert(host).await;

    tracing::info!("Arcade session created: {}", session_id);

    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id,
            snapshot,
        }),
    )
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> HandlerResult<Json<ArcadeSnapshot>> {
    let host = host(&state, &session_id).await?;
    Ok(Json(host.snapshot()))
}

pub async fn start_game(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<StartArcadeRequest>,
) -> HandlerResult<(StatusCode, Json<ArcadeSnapshot>)> {
    tracing::info!(
        "Starting arcade race: session={}, level={}",
        session_id,
        req.level_id
    );

    if req.level_id.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Level must not be empty".to_string()));
    }

    let host = host(&state, &session_id).await?;
    let snapshot = host
        .run(move |engine| Some(Effect::FetchQuestions(engine.request_start(&req.level_id))))
        .await
        .map_err(host_unavailable)?;
    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}

pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<SubmitArcadeAnswerRequest>,
) -> HandlerResult<Json<ArcadeSnapshot>> {
    let host = host(&state, &session_id).await?;
    host.run(move |engine| engine.submit_answer(&req.option))
        .await
        .map(Json)
        .map_err(host_unavailable)
}

pub async fn reset_game(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> HandlerResult<Json<ArcadeSnapshot>> {
    let host = host(&state, &session_id).await?;
    host.run(|engine| {
        engine.reset();
        None
    })
    .await
    .map(Json)
    .map_err(host_unavailable)
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> HandlerResult<StatusCode> {
    if state.arcade_sessions.remove(&session_id).await {
        tracing::info!("Arcade session closed: {}", session_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_not_found())
    }
}
