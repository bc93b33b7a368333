use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::ghost::GhostPolicy;
use super::scoring::ScoringRules;
use super::timer::{TimerScheduler, TimerSlot};
use super::{is_stale, Effect, GameEngine, PendingGeneration, PendingRecord};
use crate::error::{RecorderError, SupplyError};
use crate::metrics::{ANSWERS_SUBMITTED_TOTAL, GAME_SESSIONS_TOTAL};
use crate::models::snapshot::{ArcadeEndReason, ArcadeSnapshot, QuestionView};
use crate::models::{validate_question_set, GameMode, Question, SessionResult, SupplyRequest};

pub const STARTING_LIVES: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcadeRules {
    pub question_seconds: u32,
    /// Optional clock for the whole race, ticking alongside the question clock.
    #[serde(default)]
    pub session_seconds: Option<u32>,
    pub question_count: u32,
    #[serde(default)]
    pub scoring: ScoringRules,
}

impl Default for ArcadeRules {
    fn default() -> Self {
        Self {
            question_seconds: 15,
            session_seconds: None,
            question_count: 20,
            scoring: ScoringRules::default(),
        }
    }
}

/// Ghost race: per-question countdown, three lives, combo multiplier and a
/// simulated opponent track.
pub struct ArcadeEngine {
    rules: ArcadeRules,
    timer: TimerSlot,
    rng: StdRng,
    ghost: Box<dyn GhostPolicy>,
    epoch: u64,
    level_id: Option<String>,
    awaiting_questions: bool,
    deck: Vec<Question>,
    position: usize,
    is_playing: bool,
    score: u32,
    lives: u8,
    combo: u32,
    ghost_score: u32,
    time_left: u32,
    session_time_left: Option<u32>,
    elapsed_ticks: u32,
    answered: u32,
    end_reason: Option<ArcadeEndReason>,
    last_error: Option<String>,
}

impl ArcadeEngine {
    pub fn new(
        rules: ArcadeRules,
        scheduler: Box<dyn TimerScheduler>,
        rng: StdRng,
        ghost: Box<dyn GhostPolicy>,
    ) -> Self {
        Self {
            rules,
            timer: TimerSlot::new(scheduler),
            rng,
            ghost,
            epoch: 0,
            level_id: None,
            awaiting_questions: false,
            deck: Vec::new(),
            position: 0,
            is_playing: false,
            score: 0,
            lives: STARTING_LIVES,
            combo: 0,
            ghost_score: 0,
            time_left: 0,
            session_time_left: None,
            elapsed_ticks: 0,
            answered: 0,
            end_reason: None,
            last_error: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lives(&self) -> u8 {
        self.lives
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn ghost_score(&self) -> u32 {
        self.ghost_score
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn session_time_left(&self) -> Option<u32> {
        self.session_time_left
    }

    pub fn end_reason(&self) -> Option<ArcadeEndReason> {
        self.end_reason
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn current_question(&self) -> Option<&Question> {
        if self.is_playing {
            self.deck.get(self.position)
        } else {
            None
        }
    }

    /// Stops any running race and asks the supply for a fresh deck.
    pub fn request_start(&mut self, level_id: &str) -> PendingGeneration {
        self.clear_race();
        self.epoch += 1;
        self.awaiting_questions = true;
        self.level_id = Some(level_id.to_string());

        tracing::info!(
            "Arcade requesting questions: level={}, count={}, epoch={}",
            level_id,
            self.rules.question_count,
            self.epoch
        );

        PendingGeneration {
            epoch: self.epoch,
            request: SupplyRequest {
                topic: level_id.to_string(),
                count: self.rules.question_count,
                source_document: None,
            },
        }
    }

    /// Drops everything the previous race left behind.
    fn clear_race(&mut self) {
        self.timer.stop();
        self.deck.clear();
        self.position = 0;
        self.is_playing = false;
        self.score = 0;
        self.lives = STARTING_LIVES;
        self.combo = 0;
        self.ghost_score = 0;
        self.time_left = 0;
        self.session_time_left = None;
        self.elapsed_ticks = 0;
        self.answered = 0;
        self.end_reason = None;
        self.last_error = None;
    }

    /// Starts (or restarts) a race over the given deck.
    pub fn start_game(
        &mut self,
        level_id: &str,
        questions: Vec<Question>,
    ) -> Result<(), SupplyError> {
        self.timer.stop();
        self.is_playing = false;
        self.awaiting_questions = false;
        self.level_id = Some(level_id.to_string());

        if let Err(err) = validate_question_set(level_id, &questions) {
            tracing::warn!("Arcade start failed: level={}, error={}", level_id, err);
            GAME_SESSIONS_TOTAL
                .with_label_values(&[GameMode::Arcade.as_str(), "failed"])
                .inc();
            self.last_error = Some(err.to_string());
            return Err(err);
        }

        self.epoch += 1;
        self.deck = questions;
        self.shuffle_deck();
        self.position = 0;
        self.score = 0;
        self.lives = STARTING_LIVES;
        self.combo = 0;
        self.ghost_score = self.ghost.baseline(&mut self.rng);
        self.time_left = self.rules.question_seconds;
        self.session_time_left = self.rules.session_seconds;
        self.elapsed_ticks = 0;
        self.answered = 0;
        self.end_reason = None;
        self.last_error = None;
        self.is_playing = true;
        self.timer.start();

        GAME_SESSIONS_TOTAL
            .with_label_values(&[GameMode::Arcade.as_str(), "started"])
            .inc();
        tracing::info!(
            "Arcade race started: level={}, deck={}, ghost_baseline={}",
            level_id,
            self.deck.len(),
            self.ghost_score
        );
        Ok(())
    }

    fn shuffle_deck(&mut self) {
        self.deck.shuffle(&mut self.rng);
        for question in &mut self.deck {
            question.options.shuffle(&mut self.rng);
        }
    }

    /// Next question with a fresh clock. An exhausted deck is reshuffled.
    fn advance(&mut self) {
        self.position += 1;
        if self.position >= self.deck.len() {
            self.shuffle_deck();
            self.position = 0;
        }
        self.time_left = self.rules.question_seconds;
        self.timer.start();
    }

    fn miss(&mut self, reason: &str) -> Option<Effect> {
        self.answered += 1;
        self.lives = self.lives.saturating_sub(1);
        self.combo = 0;
        ANSWERS_SUBMITTED_TOTAL
            .with_label_values(&[GameMode::Arcade.as_str(), "false"])
            .inc();
        tracing::debug!("Arcade miss ({}): lives={}", reason, self.lives);

        if self.lives == 0 {
            return Some(self.end(ArcadeEndReason::OutOfLives));
        }
        self.advance();
        None
    }

    fn end(&mut self, reason: ArcadeEndReason) -> Effect {
        self.timer.stop();
        self.is_playing = false;
        self.end_reason = Some(reason);

        let level = self.level_id.clone().unwrap_or_default();
        GAME_SESSIONS_TOTAL
            .with_label_values(&[GameMode::Arcade.as_str(), "completed"])
            .inc();
        tracing::info!(
            "Arcade race over: level={}, reason={:?}, score={}, ghost={}",
            level,
            reason,
            self.score,
            self.ghost_score
        );

        Effect::RecordResult(PendingRecord {
            epoch: self.epoch,
            result: SessionResult {
                mode: GameMode::Arcade,
                session_topic: level,
                score: self.score,
                total_questions: self.answered,
                duration_seconds: self.elapsed_ticks,
                finished_at: Utc::now(),
            },
        })
    }
}

impl GameEngine for ArcadeEngine {
    type Snapshot = ArcadeSnapshot;

    fn mode(&self) -> GameMode {
        GameMode::Arcade
    }

    fn epoch(&self) -> u64 {
        self.epoch
    }

    fn is_active(&self) -> bool {
        self.is_playing
    }

    fn active_timer(&self) -> Option<u64> {
        self.timer.active_token()
    }

    fn tick(&mut self) -> Option<Effect> {
        if !self.is_playing {
            return None;
        }

        self.elapsed_ticks += 1;
        let gained = self.ghost.advance(self.elapsed_ticks, &mut self.rng);
        self.ghost_score = self.ghost_score.saturating_add(gained);

        if let Some(remaining) = self.session_time_left.as_mut() {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                return Some(self.end(ArcadeEndReason::OutOfTime));
            }
        }

        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            return self.miss("timeout");
        }
        None
    }

    fn submit_answer(&mut self, option: &str) -> Option<Effect> {
        if !self.is_playing {
            return None;
        }
        let correct = self
            .deck
            .get(self.position)
            .is_some_and(|q| q.is_correct(option));
        if !correct {
            return self.miss("wrong answer");
        }

        let points = self.rules.scoring.points_for(self.combo);
        self.score = self.score.saturating_add(points);
        self.combo += 1;
        self.answered += 1;
        ANSWERS_SUBMITTED_TOTAL
            .with_label_values(&[GameMode::Arcade.as_str(), "true"])
            .inc();
        tracing::debug!(
            "Arcade hit: points={}, score={}, combo={}",
            points,
            self.score,
            self.combo
        );
        self.advance();
        None
    }

    fn complete_generation(
        &mut self,
        epoch: u64,
        result: Result<Vec<Question>, SupplyError>,
    ) -> Option<Effect> {
        if is_stale(GameMode::Arcade, self.epoch, epoch, "generation") || !self.awaiting_questions
        {
            return None;
        }
        let level = self.level_id.clone().unwrap_or_default();
        match result {
            Ok(questions) => {
                // Failure is already recorded on the engine state.
                let _ = self.start_game(&level, questions);
            }
            Err(err) => {
                tracing::warn!("Arcade generation failed: level={}, error={}", level, err);
                GAME_SESSIONS_TOTAL
                    .with_label_values(&[GameMode::Arcade.as_str(), "failed"])
                    .inc();
                self.awaiting_questions = false;
                self.last_error = Some(err.to_string());
            }
        }
        None
    }

    fn complete_recording(&mut self, epoch: u64, outcome: Result<(), RecorderError>) {
        if is_stale(GameMode::Arcade, self.epoch, epoch, "recording") {
            return;
        }
        if let Err(e) = outcome {
            tracing::error!("Failed to record arcade result: {}", e);
        }
    }

    fn reset(&mut self) {
        self.clear_race();
        self.epoch += 1;
        self.level_id = None;
        self.awaiting_questions = false;
        tracing::info!("Arcade reset: epoch={}", self.epoch);
    }

    fn snapshot(&self) -> ArcadeSnapshot {
        ArcadeSnapshot {
            is_playing: self.is_playing,
            awaiting_questions: self.awaiting_questions,
            level_id: self.level_id.clone(),
            current_question: self.current_question().map(QuestionView::hidden),
            score: self.score,
            lives: self.lives,
            combo: self.combo,
            ghost_score: self.ghost_score,
            time_left: self.time_left,
            session_time_left: self.session_time_left,
            answered: self.answered,
            end_reason: self.end_reason,
            last_error: self.last_error.clone(),
        }
    }
}
