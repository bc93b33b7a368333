use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;
use uuid::Uuid;

use super::{host_unavailable, session_not_found};
use crate::{
    engine::{Effect, GameEngine, QuizEngine},
    models::{
        answer::{AnswerQuestionRequest, CreateSessionResponse, StartQuizRequest},
        snapshot::QuizSnapshot,
    },
    services::{game_host::GameHost, AppState},
};

type HandlerResult<T> = Result<T, (StatusCode, String)>;

async fn host(state: &AppState, session_id: &Uuid) -> HandlerResult<GameHost<QuizEngine>> {
    state
        .quiz_sessions
        .get(session_id)
        .await
        .ok_or_else(session_not_found)
}

async fn run<F>(state: &AppState, session_id: &Uuid, op: F) -> HandlerResult<Json<QuizSnapshot>>
where
    F: FnOnce(&mut QuizEngine) -> Option<Effect> + Send + 'static,
{
    let host = host(state, session_id).await?;
    host.run(op).await.map(Json).map_err(host_unavailable)
}

pub async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let host = state.spawn_quiz();
    let snapshot = host.snapshot();
    let session_id = state.quiz_sessions.insert(host).await;

    tracing::info!("Quiz session created: {}", session_id);

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
) -> HandlerResult<Json<QuizSnapshot>> {
    let host = host(&state, &session_id).await?;
    Ok(Json(host.snapshot()))
}

pub async fn start_game(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<StartQuizRequest>,
) -> HandlerResult<(StatusCode, Json<QuizSnapshot>)> {
    tracing::info!("Starting quiz: session={}, topic={}", session_id, req.topic);

    if req.topic.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Topic must not be empty".to_string()));
    }
    let document = req
        .source_document
        .map(|encoded| general_purpose::STANDARD.decode(encoded))
        .transpose()
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("Invalid source_document: {}", e),
            )
        })?;

    let topic = req.topic;
    let snapshot = run(&state, &session_id, move |engine| {
        engine
            .start_game_with_document(&topic, document)
            .map(Effect::FetchQuestions)
    })
    .await?;
    Ok((StatusCode::ACCEPTED, snapshot))
}

pub async fn answer_question(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<AnswerQuestionRequest>,
) -> HandlerResult<Json<QuizSnapshot>> {
    tracing::debug!(
        "Quiz answer: session={}, question={}",
        session_id,
        req.question_id
    );
    run(&state, &session_id, move |engine| {
        engine.answer_question(&req.question_id, &req.option);
        None
    })
    .await
}

pub async fn next_question(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> HandlerResult<Json<QuizSnapshot>> {
    run(&state, &session_id, |engine| {
        engine.next_question();
        None
    })
    .await
}

pub async fn prev_question(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> HandlerResult<Json<QuizSnapshot>> {
    run(&state, &session_id, |engine| {
        engine.prev_question();
        None
    })
    .await
}

pub async fn finish_game(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> HandlerResult<Json<QuizSnapshot>> {
    tracing::info!("Finishing quiz: session={}", session_id);
    run(&state, &session_id, |engine| engine.finish_game()).await
}

pub async fn reset_game(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> HandlerResult<Json<QuizSnapshot>> {
    run(&state, &session_id, |engine| {
        engine.reset();
        None
    })
    .await
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> HandlerResult<StatusCode> {
    if state.quiz_sessions.remove(&session_id).await {
        tracing::info!("Quiz session closed: {}", session_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_not_found())
    }
}
