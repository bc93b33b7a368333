use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .nest("/api/v1/quiz/sessions", quiz_routes())
        .nest("/api/v1/arcade/sessions", arcade_routes())
        .route(
            "/api/v1/leaderboard/{mode}/{topic}",
            get(handlers::leaderboard::get_leaderboard),
        )
        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(
                    middlewares::trace::trace_context_middleware,
                ))
                .layer(middleware::from_fn(
                    middlewares::metrics::metrics_middleware,
                ))
                .layer(CompressionLayer::new())
                .layer(cors),
        )
}

fn quiz_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(handlers::quiz::create_session))
        .route(
            "/{id}",
            get(handlers::quiz::get_session).delete(handlers::quiz::delete_session),
        )
        .route("/{id}/start", post(handlers::quiz::start_game))
        .route("/{id}/answers", post(handlers::quiz::answer_question))
        .route("/{id}/next", post(handlers::quiz::next_question))
        .route("/{id}/prev", post(handlers::quiz::prev_question))
        .route("/{id}/finish", post(handlers::quiz::finish_game))
        .route("/{id}/reset", post(handlers::quiz::reset_game))
        .route("/{id}/stream", get(handlers::sse::quiz_stream))
}

fn arcade_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(handlers::arcade::create_session))
        .route(
            "/{id}",
            get(handlers::arcade::get_session).delete(handlers::arcade::delete_session),
        )
        .route("/{id}/start", post(handlers::arcade::start_game))
        .route("/{id}/answers", post(handlers::arcade::submit_answer))
        .route("/{id}/reset", post(handlers::arcade::reset_game))
        .route("/{id}/stream", get(handlers::sse::arcade_stream))
}
