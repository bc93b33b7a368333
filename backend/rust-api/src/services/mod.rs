use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::Config;
use crate::engine::{ArcadeEngine, QuizEngine};
use game_host::{GameHost, HostServices};
use question_supply::{HttpQuestionSupply, QuestionSupply, StaticQuestionTable};
use session_recorder::{HttpRecorder, InMemoryRecorder, SessionRecorder};
use session_registry::SessionRegistry;

pub struct AppState {
    pub config: Config,
    pub supply: Arc<dyn QuestionSupply>,
    pub recorder: Arc<dyn SessionRecorder>,
    pub quiz_sessions: SessionRegistry<QuizEngine>,
    pub arcade_sessions: SessionRegistry<ArcadeEngine>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let supply: Arc<dyn QuestionSupply> = match &config.supply.generator_url {
            Some(url) => {
                tracing::info!("Using question generator at {}", url);
                Arc::new(HttpQuestionSupply::new(
                    url.clone(),
                    Duration::from_millis(config.supply.generator_timeout_ms),
                ))
            }
            None => Arc::new(StaticQuestionTable::from_path(
                &config.supply.static_table_path,
            )?),
        };

        let recorder: Arc<dyn SessionRecorder> = match &config.recorder.url {
            Some(url) => {
                tracing::info!("Recording results to {}", url);
                Arc::new(HttpRecorder::new(
                    url.clone(),
                    config.recorder_attempt_timeout(),
                    config.recorder_retry(),
                ))
            }
            None => {
                tracing::warn!("No recorder URL configured, keeping results in memory");
                Arc::new(InMemoryRecorder::new())
            }
        };

        Ok(Self::with_services(config, supply, recorder))
    }

    pub fn with_services(
        config: Config,
        supply: Arc<dyn QuestionSupply>,
        recorder: Arc<dyn SessionRecorder>,
    ) -> Self {
        Self {
            config,
            supply,
            recorder,
            quiz_sessions: SessionRegistry::new(),
            arcade_sessions: SessionRegistry::new(),
        }
    }

    fn host_services(&self) -> HostServices {
        HostServices {
            supply: self.supply.clone(),
            recorder: self.recorder.clone(),
            tick_interval: self.config.tick_interval(),
            recorder_timeout: self.config.recorder_timeout(),
        }
    }

    fn session_rng(&self) -> StdRng {
        match self.config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    pub fn spawn_quiz(&self) -> GameHost<QuizEngine> {
        let rules = self.config.quiz.clone();
        let rng = self.session_rng();
        GameHost::spawn(self.host_services(), move |scheduler| {
            QuizEngine::new(rules, Box::new(scheduler), rng)
        })
    }

    /// Periodically drops sessions idle past `server.session_idle_ttl_seconds`.
    /// Ends by itself once the state is gone.
    pub fn spawn_session_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let state = Arc::downgrade(self);
        let ttl = self.config.session_idle_ttl();
        let period = self.config.session_reap_interval();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;

            loop {
                interval.tick().await;
                let Some(state) = state.upgrade() else {
                    break;
                };
                let quiz = state.quiz_sessions.reap_idle(ttl).await;
                let arcade = state.arcade_sessions.reap_idle(ttl).await;
                if quiz + arcade > 0 {
                    tracing::info!(
                        "Reaped idle sessions: quiz={}, arcade={}",
                        quiz,
                        arcade
                    );
                }
            }
        })
    }

    pub fn spawn_arcade(&self) -> GameHost<ArcadeEngine> {
        let rules = self.config.arcade_rules();
        let ghost = self.config.arcade.ghost;
        let rng = self.session_rng();
        GameHost::spawn(self.host_services(), move |scheduler| {
            ArcadeEngine::new(rules, Box::new(scheduler), rng, Box::new(ghost))
        })
    }
}

pub mod game_host;
pub mod question_supply;
pub mod session_recorder;
pub mod session_registry;

#[cfg(test)]
mod tests {
    use super::*;

    fn state(ttl: u64, every: u64) -> Arc<AppState> {
        let mut config = Config::default();
        config.server.session_idle_ttl_seconds = ttl;
        config.server.session_reap_interval_seconds = every;
        Arc::new(AppState::with_services(
            config,
            Arc::new(StaticQuestionTable::default()),
            Arc::new(InMemoryRecorder::new()),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn reaper_drops_sessions_nobody_touches() {
        let state = state(60, 10);
        let reaper = state.spawn_session_reaper();

        let quiz = state.quiz_sessions.insert(state.spawn_quiz()).await;
        state.arcade_sessions.insert(state.spawn_arcade()).await;

        tokio::time::sleep(Duration::from_secs(45)).await;
        assert!(state.quiz_sessions.get(&quiz).await.is_some());
        assert_eq!(state.arcade_sessions.len().await, 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        // Arcade idle for 75s, quiz touched 30s ago.
        assert!(state.arcade_sessions.is_empty().await);
        assert_eq!(state.quiz_sessions.len().await, 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(state.quiz_sessions.is_empty().await);

        drop(state);
        tokio::time::timeout(Duration::from_secs(20), reaper)
            .await
            .unwrap()
            .unwrap();
    }
}
