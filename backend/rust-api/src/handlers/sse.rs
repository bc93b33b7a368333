use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use chrono::Utc;
use futures::stream::{self, Stream};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use super::session_not_found;
use crate::{models::event::SessionEvent, services::AppState};

/// SSE endpoint for quiz state changes
/// GET /api/v1/quiz/sessions/{id}/stream
pub async fn quiz_stream(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let host = state
        .quiz_sessions
        .get(&session_id)
        .await
        .ok_or_else(session_not_found)?;

    tracing::info!("Client connected to quiz stream: session={}", session_id);
    let stream = snapshot_stream(session_id.to_string(), host.subscribe());
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// SSE endpoint for arcade state changes
/// GET /api/v1/arcade/sessions/{id}/stream
pub async fn arcade_stream(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let host = state
        .arcade_sessions
        .get(&session_id)
        .await
        .ok_or_else(session_not_found)?;

    tracing::info!("Client connected to arcade stream: session={}", session_id);
    let stream = snapshot_stream(session_id.to_string(), host.subscribe());
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Emits the current snapshot right away, then one event per change.
/// Ends with a single `session-closed` event once the host stops.
fn snapshot_stream<S>(
    session_id: String,
    mut snapshots: watch::Receiver<S>,
) -> impl Stream<Item = Result<Event, Infallible>>
where
    S: Clone + Serialize + Send + Sync + 'static,
{
    snapshots.mark_changed();

    stream::unfold(
        (session_id, snapshots, false),
        |(sid, mut rx, closed)| async move {
            if closed {
                return None;
            }

            let (event, closed) = match rx.changed().await {
                Ok(()) => {
                    let snapshot = rx.borrow_and_update().clone();
                    let event = SessionEvent::StateChanged {
                        session_id: sid.clone(),
                        snapshot,
                        timestamp: Utc::now(),
                    };
                    (event, false)
                }
                Err(_) => {
                    tracing::info!("Session stream closed: session={}", sid);
                    let event = SessionEvent::SessionClosed {
                        session_id: sid.clone(),
                        timestamp: Utc::now(),
                    };
                    (event, true)
                }
            };

            let sse = Event::default()
                .event(event.event_name())
                .data(event.to_sse_data());
            Some((Ok(sse), (sid, rx, closed)))
        },
    )
}
