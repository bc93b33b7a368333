use async_trait::async_trait;
use reqwest::Client;
use std::cmp::Reverse;
use std::sync::RwLock;
use std::time::Duration;

use crate::error::RecorderError;
use crate::metrics::record_recorder_write;
use crate::models::{GameMode, SessionResult};
use crate::utils::retry::{retry_async_with_config, RetryConfig};

/// Persists finished sessions. Writes are fire-and-forget from gameplay.
#[async_trait]
pub trait SessionRecorder: Send + Sync {
    async fn record_result(&self, result: &SessionResult) -> Result<(), RecorderError>;

    /// Best results of one game mode for a topic, highest score first.
    /// Modes score on different scales and are never ranked together.
    async fn leaderboard(
        &self,
        _mode: GameMode,
        _topic: &str,
        _limit: usize,
    ) -> Result<Vec<SessionResult>, RecorderError> {
        Err(RecorderError::Unsupported("leaderboards"))
    }
}

/// Keeps results in process memory. Backs the leaderboard endpoint in
/// development and tests.
#[derive(Debug, Default)]
pub struct InMemoryRecorder {
    results: RwLock<Vec<SessionResult>>,
}

impl InMemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> Vec<SessionResult> {
        self.results
            .read()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SessionRecorder for InMemoryRecorder {
    async fn record_result(&self, result: &SessionResult) -> Result<(), RecorderError> {
        match self.results.write() {
            Ok(mut results) => results.push(result.clone()),
            // A poisoned lock only means another writer panicked mid-push.
            Err(poisoned) => poisoned.into_inner().push(result.clone()),
        }
        record_recorder_write(true);
        tracing::info!(
            "Recorded {} result in memory: topic={}, score={}",
            result.mode.as_str(),
            result.session_topic,
            result.score
        );
        Ok(())
    }

    async fn leaderboard(
        &self,
        mode: GameMode,
        topic: &str,
        limit: usize,
    ) -> Result<Vec<SessionResult>, RecorderError> {
        let mut board: Vec<SessionResult> = self
            .results()
            .into_iter()
            .filter(|r| r.mode == mode && r.session_topic == topic)
            .collect();
        board.sort_by_key(|r| (Reverse(r.score), r.duration_seconds, r.finished_at));
        board.truncate(limit);
        Ok(board)
    }
}

/// Posts results to the score service.
pub struct HttpRecorder {
    client: Client,
    url: String,
    timeout: Duration,
    retry: RetryConfig,
}

impl HttpRecorder {
    pub fn new(url: impl Into<String>, timeout: Duration, retry: RetryConfig) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            timeout,
            retry,
        }
    }

    async fn post_once(&self, result: &SessionResult) -> Result<(), RecorderError> {
        let response = self
            .client
            .post(&self.url)
            .json(result)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RecorderError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

fn is_retryable(err: &RecorderError) -> bool {
    match err {
        RecorderError::Rejected { status, .. } => *status >= 500,
        RecorderError::Transport(_) | RecorderError::Timeout(_) => true,
        RecorderError::Unsupported(_) => false,
    }
}

#[async_trait]
impl SessionRecorder for HttpRecorder {
    async fn record_result(&self, result: &SessionResult) -> Result<(), RecorderError> {
        let outcome =
            retry_async_with_config(&self.retry, is_retryable, || self.post_once(result)).await;
        record_recorder_write(outcome.is_ok());
        if outcome.is_ok() {
            tracing::info!(
                "Recorded {} result: topic={}, score={}",
                result.mode.as_str(),
                result.session_topic,
                result.score
            );
        }
        outcome
    }
}
