#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use examrace_api::{
    config::{Config, TimerConfig},
    create_router,
    engine::{ArcadeRules, ManualScheduler, QuizEngine, QuizRules},
    models::{Difficulty, Question},
    services::{question_supply::StaticQuestionTable, session_recorder::InMemoryRecorder, AppState},
};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub struct TestApp {
    pub router: Router,
    pub recorder: Arc<InMemoryRecorder>,
}

/// Three questions per topic; the correct option is always "yes".
pub fn questions(topic: &str) -> Vec<Question> {
    (1..=3)
        .map(|i| Question {
            id: format!("{}-{}", topic, i),
            question: format!("{} question {}", topic, i),
            options: vec!["yes".to_string(), "no".to_string(), "maybe".to_string()],
            correct_answer: "yes".to_string(),
            explanation: format!("explanation {}", i),
            difficulty: Difficulty::Easy,
            topic: topic.to_string(),
        })
        .collect()
}

pub fn test_config() -> Config {
    Config {
        // Ticks never fire inside a test; timer behaviour is covered with paused time.
        timer: TimerConfig {
            tick_interval_ms: 60_000,
        },
        quiz: QuizRules {
            question_count: 3,
            ..QuizRules::default()
        },
        rng_seed: Some(42),
        ..Config::default()
    }
}

pub fn create_test_app() -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let mut bank = questions("logic");
    bank.extend(questions("sprint"));

    let recorder = Arc::new(InMemoryRecorder::new());
    let state = AppState::with_services(
        test_config(),
        Arc::new(StaticQuestionTable::new(bank)),
        recorder.clone(),
    );

    TestApp {
        router: create_router(Arc::new(state)),
        recorder,
    }
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, json)
}

/// Polls a session snapshot until `done` holds.
pub async fn wait_for_snapshot<F>(app: &Router, uri: &str, done: F) -> Value
where
    F: Fn(&Value) -> bool,
{
    for _ in 0..200 {
        let (status, snapshot) = send(app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::OK, "snapshot request failed: {}", snapshot);
        if done(&snapshot) {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("snapshot at {} never reached the expected state", uri);
}

pub fn quiz_engine(rules: QuizRules) -> (QuizEngine, ManualScheduler) {
    let scheduler = ManualScheduler::new();
    let engine = QuizEngine::new(rules, Box::new(scheduler.clone()), StdRng::seed_from_u64(3));
    (engine, scheduler)
}

pub fn arcade_rules() -> ArcadeRules {
    ArcadeRules {
        question_seconds: 5,
        ..ArcadeRules::default()
    }
}
