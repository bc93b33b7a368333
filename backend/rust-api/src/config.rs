use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::engine::{ArcadeRules, PacedGhost, QuizRules, ScoringRules};
use crate::utils::retry::RetryConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Sessions untouched for this long are dropped by the reaper.
    pub session_idle_ttl_seconds: u64,
    pub session_reap_interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    pub tick_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArcadeConfig {
    pub question_seconds: u32,
    pub session_seconds: Option<u32>,
    pub question_count: u32,
    pub scoring: ScoringRules,
    pub ghost: PacedGhost,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplyConfig {
    /// Generative question service. When unset the static table is used.
    pub generator_url: Option<String>,
    pub generator_timeout_ms: u64,
    pub static_table_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Score service endpoint. When unset results stay in memory.
    pub url: Option<String>,
    /// Timeout of a single POST; retries each get a fresh one.
    pub attempt_timeout_ms: u64,
    pub max_attempts: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub timer: TimerConfig,
    pub quiz: QuizRules,
    pub arcade: ArcadeConfig,
    pub supply: SupplyConfig,
    pub recorder: RecorderConfig,
    /// Fixed seed for option shuffling and ghost pacing. Random when unset.
    pub rng_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        let arcade = ArcadeRules::default();
        Self {
            server: ServerConfig {
                bind_addr: "0.0.0.0:8081".to_string(),
                session_idle_ttl_seconds: 1800,
                session_reap_interval_seconds: 60,
            },
            timer: TimerConfig {
                tick_interval_ms: 1000,
            },
            quiz: QuizRules::default(),
            arcade: ArcadeConfig {
                question_seconds: arcade.question_seconds,
                session_seconds: arcade.session_seconds,
                question_count: arcade.question_count,
                scoring: arcade.scoring,
                ghost: PacedGhost::default(),
            },
            supply: SupplyConfig {
                generator_url: None,
                generator_timeout_ms: 5000,
                static_table_path: "data/questions.json".to_string(),
            },
            recorder: RecorderConfig {
                url: None,
                attempt_timeout_ms: 1000,
                max_attempts: 3,
            },
            rng_seed: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first (two levels up), then the local one
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Defaults < config/{env}.toml < APP_* environment variables
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would leave every session unplayable.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let mut zero: Vec<String> = [
            ("timer.tick_interval_ms", self.timer.tick_interval_ms),
            ("quiz.question_count", self.quiz.question_count as u64),
            (
                "quiz.default_time_limit_seconds",
                self.quiz.default_time_limit_seconds as u64,
            ),
            ("arcade.question_seconds", self.arcade.question_seconds as u64),
            ("arcade.question_count", self.arcade.question_count as u64),
            ("recorder.attempt_timeout_ms", self.recorder.attempt_timeout_ms),
            ("recorder.max_attempts", self.recorder.max_attempts as u64),
            (
                "server.session_idle_ttl_seconds",
                self.server.session_idle_ttl_seconds,
            ),
            (
                "server.session_reap_interval_seconds",
                self.server.session_reap_interval_seconds,
            ),
        ]
        .into_iter()
        .filter(|(_, value)| *value == 0)
        .map(|(key, _)| key.to_string())
        .collect();

        if self.arcade.session_seconds == Some(0) {
            zero.push("arcade.session_seconds".to_string());
        }
        let mut topics: Vec<&String> = self
            .quiz
            .topic_time_limits
            .iter()
            .filter(|(_, limit)| **limit == 0)
            .map(|(topic, _)| topic)
            .collect();
        topics.sort();
        zero.extend(topics.into_iter().map(|t| format!("quiz.topic_time_limits.{}", t)));

        if zero.is_empty() {
            Ok(())
        } else {
            Err(config::ConfigError::Message(format!(
                "must be greater than zero: {}",
                zero.join(", ")
            )))
        }
    }

    pub fn session_idle_ttl(&self) -> Duration {
        Duration::from_secs(self.server.session_idle_ttl_seconds)
    }

    pub fn session_reap_interval(&self) -> Duration {
        Duration::from_secs(self.server.session_reap_interval_seconds)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.timer.tick_interval_ms)
    }

    pub fn arcade_rules(&self) -> ArcadeRules {
        ArcadeRules {
            question_seconds: self.arcade.question_seconds,
            session_seconds: self.arcade.session_seconds,
            question_count: self.arcade.question_count,
            scoring: self.arcade.scoring,
        }
    }

    pub fn recorder_attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.recorder.attempt_timeout_ms)
    }

    /// Budget for one recording: every attempt plus the waits between them.
    pub fn recorder_timeout(&self) -> Duration {
        let attempts = self.recorder.max_attempts.max(1) as u32;
        self.recorder_attempt_timeout() * attempts + self.recorder_retry().worst_case_backoff()
    }

    pub fn recorder_retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.recorder.max_attempts,
            ..RetryConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_load_without_files() {
        env::set_var("SKIP_ROOT_ENV", "1");
        env::set_var("APP_ENV", "unit-test-missing");
        let config = Config::load().unwrap();
        assert_eq!(config.timer.tick_interval_ms, 1000);
        assert_eq!(config.quiz.question_count, 10);
        assert_eq!(config.arcade.scoring.base_points, 10);
        assert!(config.supply.generator_url.is_none());
        env::remove_var("APP_ENV");
        env::remove_var("SKIP_ROOT_ENV");
    }

    #[test]
    #[serial]
    fn environment_overrides_nested_values() {
        env::set_var("SKIP_ROOT_ENV", "1");
        env::set_var("APP_ENV", "unit-test-missing");
        env::set_var("APP_QUIZ__QUESTION_COUNT", "4");
        env::set_var("APP_ARCADE__QUESTION_SECONDS", "7");
        let config = Config::load().unwrap();
        assert_eq!(config.quiz.question_count, 4);
        assert_eq!(config.arcade_rules().question_seconds, 7);
        env::remove_var("APP_QUIZ__QUESTION_COUNT");
        env::remove_var("APP_ARCADE__QUESTION_SECONDS");
        env::remove_var("APP_ENV");
        env::remove_var("SKIP_ROOT_ENV");
    }

    #[test]
    #[serial]
    fn zero_tick_interval_is_rejected() {
        env::set_var("SKIP_ROOT_ENV", "1");
        env::set_var("APP_ENV", "unit-test-missing");
        env::set_var("APP_TIMER__TICK_INTERVAL_MS", "0");
        assert!(Config::load().is_err());
        env::remove_var("APP_TIMER__TICK_INTERVAL_MS");
        env::remove_var("APP_ENV");
        env::remove_var("SKIP_ROOT_ENV");
    }

    #[test]
    #[serial]
    fn zero_question_count_is_rejected_at_load() {
        env::set_var("SKIP_ROOT_ENV", "1");
        env::set_var("APP_ENV", "unit-test-missing");
        env::set_var("APP_QUIZ__QUESTION_COUNT", "0");
        let err = Config::load().unwrap_err().to_string();
        assert!(err.contains("quiz.question_count"));
        env::remove_var("APP_QUIZ__QUESTION_COUNT");
        env::remove_var("APP_ENV");
        env::remove_var("SKIP_ROOT_ENV");
    }

    #[test]
    fn zero_durations_are_rejected() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.arcade.question_seconds = 0;
        config.arcade.session_seconds = Some(0);
        config.quiz.topic_time_limits.insert("algebra".to_string(), 0);
        config.quiz.default_time_limit_seconds = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("arcade.question_seconds"));
        assert!(err.contains("arcade.session_seconds"));
        assert!(err.contains("quiz.topic_time_limits.algebra"));
        assert!(err.contains("quiz.default_time_limit_seconds"));
        assert!(!err.contains("timer.tick_interval_ms"));
    }

    #[test]
    fn recorder_budget_covers_every_attempt() {
        let mut config = Config::default();
        config.recorder.attempt_timeout_ms = 300;
        config.recorder.max_attempts = 3;

        let retry = config.recorder_retry();
        assert_eq!(
            config.recorder_timeout(),
            Duration::from_millis(900) + retry.worst_case_backoff()
        );
        assert!(config.recorder_timeout() > config.recorder_attempt_timeout() * 3);
    }
}
