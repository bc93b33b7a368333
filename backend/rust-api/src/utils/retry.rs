use std::time::Duration;

/// Exponential backoff with optional jitter for outbound writes.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter_max: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(500),
            jitter_max: Some(Duration::from_millis(50)),
        }
    }
}

impl RetryConfig {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            jitter_max: None,
        }
    }

    /// Longest total time spent sleeping between attempts.
    pub fn worst_case_backoff(&self) -> Duration {
        let mut total = Duration::ZERO;
        let mut backoff = self.base_backoff;
        let jitter = self.jitter_max.unwrap_or(Duration::ZERO);
        for _ in 1..self.max_attempts.max(1) {
            total += backoff + jitter;
            backoff = std::cmp::min(backoff * 2, self.max_backoff);
        }
        total
    }

    fn wait_for(&self, backoff: Duration) -> Duration {
        match self.jitter_max {
            Some(jitter_max) if !jitter_max.is_zero() => {
                let jitter_ms = jitter_max.as_millis() as u64;
                backoff + Duration::from_millis(rand::random::<u64>() % (jitter_ms + 1))
            }
            _ => backoff,
        }
    }
}

/// Retries `f` until it succeeds or `max_attempts` calls have failed.
/// `retryable` decides whether an error is worth another attempt.
pub async fn retry_async_with_config<F, Fut, T, E, R>(
    config: &RetryConfig,
    retryable: R,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempts_left = config.max_attempts.max(1);
    let mut backoff = config.base_backoff;

    loop {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                attempts_left -= 1;
                if attempts_left == 0 || !retryable(&e) {
                    return Err(e);
                }
                tracing::debug!("Retrying after error: {} ({} attempts left)", e, attempts_left);
                tokio::time::sleep(config.wait_for(backoff)).await;
                backoff = std::cmp::min(backoff * 2, config.max_backoff);
            }
        }
    }
}
