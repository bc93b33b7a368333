use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::timer::{TimerScheduler, TimerSlot};
use super::{is_stale, Effect, GameEngine, PendingGeneration, PendingRecord};
use crate::error::{RecorderError, SupplyError};
use crate::metrics::{ANSWERS_SUBMITTED_TOTAL, GAME_SESSIONS_TOTAL};
use crate::models::snapshot::{QuestionView, QuizSnapshot};
use crate::models::{
    validate_question_set, GameMode, Question, QuizStatus, SessionResult, SupplyRequest,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizRules {
    pub question_count: u32,
    pub default_time_limit_seconds: u32,
    #[serde(default)]
    pub topic_time_limits: HashMap<String, u32>,
}

impl Default for QuizRules {
    fn default() -> Self {
        Self {
            question_count: 10,
            default_time_limit_seconds: 300,
            topic_time_limits: HashMap::new(),
        }
    }
}

impl QuizRules {
    pub fn time_limit_for(&self, topic: &str) -> u32 {
        self.topic_time_limits
            .get(topic)
            .copied()
            .unwrap_or(self.default_time_limit_seconds)
    }
}

/// Timed linear quiz: one countdown for the whole session, free navigation
/// between questions, scoring deferred until the session is finished.
pub struct QuizEngine {
    rules: QuizRules,
    timer: TimerSlot,
    rng: StdRng,
    epoch: u64,
    status: QuizStatus,
    topic: Option<String>,
    questions: Vec<Question>,
    current_index: usize,
    answers: HashMap<String, String>,
    score: u32,
    time_left: u32,
    time_limit: u32,
    last_error: Option<String>,
}

impl QuizEngine {
    pub fn new(rules: QuizRules, scheduler: Box<dyn TimerScheduler>, rng: StdRng) -> Self {
        Self {
            rules,
            timer: TimerSlot::new(scheduler),
            rng,
            epoch: 0,
            status: QuizStatus::Idle,
            topic: None,
            questions: Vec::new(),
            current_index: 0,
            answers: HashMap::new(),
            score: 0,
            time_left: 0,
            time_limit: 0,
            last_error: None,
        }
    }

    pub fn status(&self) -> QuizStatus {
        self.status
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    pub fn answers(&self) -> &HashMap<String, String> {
        &self.answers
    }

    pub fn answer_for(&self, question_id: &str) -> Option<&str> {
        self.answers.get(question_id).map(String::as_str)
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn start_game(&mut self, topic: &str) -> Option<PendingGeneration> {
        self.start_game_with_document(topic, None)
    }

    /// Leaves `idle`/`completed` for `generating` and asks for questions.
    pub fn start_game_with_document(
        &mut self,
        topic: &str,
        source_document: Option<Vec<u8>>,
    ) -> Option<PendingGeneration> {
        if !matches!(self.status, QuizStatus::Idle | QuizStatus::Completed) {
            tracing::debug!("Ignoring quiz start in status {:?}", self.status);
            return None;
        }

        self.timer.stop();
        self.epoch += 1;
        self.clear_session();
        self.status = QuizStatus::Generating;
        self.topic = Some(topic.to_string());

        tracing::info!(
            "Quiz generating: topic={}, count={}, epoch={}",
            topic,
            self.rules.question_count,
            self.epoch
        );

        Some(PendingGeneration {
            epoch: self.epoch,
            request: SupplyRequest {
                topic: topic.to_string(),
                count: self.rules.question_count,
                source_document,
            },
        })
    }

    /// Free navigation is allowed while playing and for review afterwards.
    fn can_navigate(&self) -> bool {
        matches!(self.status, QuizStatus::Playing | QuizStatus::Completed)
    }

    pub fn next_question(&mut self) {
        if self.can_navigate() && self.current_index + 1 < self.questions.len() {
            self.current_index += 1;
            tracing::debug!("Quiz moved to question {}", self.current_index);
        }
    }

    pub fn prev_question(&mut self) {
        if self.can_navigate() && self.current_index > 0 {
            self.current_index -= 1;
            tracing::debug!("Quiz moved to question {}", self.current_index);
        }
    }

    /// Records or overwrites the answer for a question. Scored on finish.
    pub fn answer_question(&mut self, question_id: &str, option: &str) {
        if self.status != QuizStatus::Playing {
            return;
        }
        if !self.questions.iter().any(|q| q.id == question_id) {
            tracing::debug!("Ignoring answer for unknown question {}", question_id);
            return;
        }
        self.answers
            .insert(question_id.to_string(), option.to_string());
    }

    pub fn finish_game(&mut self) -> Option<Effect> {
        if self.status != QuizStatus::Playing {
            return None;
        }

        self.timer.stop();
        self.status = QuizStatus::Saving;

        let mut correct = 0u32;
        for question in &self.questions {
            let answered = self.answers.get(&question.id);
            let is_correct = answered.is_some_and(|a| question.is_correct(a));
            if answered.is_some() {
                let label = if is_correct { "true" } else { "false" };
                ANSWERS_SUBMITTED_TOTAL
                    .with_label_values(&[GameMode::Quiz.as_str(), label])
                    .inc();
            }
            if is_correct {
                correct += 1;
            }
        }
        self.score = correct;

        let topic = self.topic.clone().unwrap_or_default();
        tracing::info!(
            "Quiz finished: topic={}, score={}/{}, time_left={}",
            topic,
            self.score,
            self.questions.len(),
            self.time_left
        );

        Some(Effect::RecordResult(PendingRecord {
            epoch: self.epoch,
            result: SessionResult {
                mode: GameMode::Quiz,
                session_topic: topic,
                score: self.score,
                total_questions: self.questions.len() as u32,
                duration_seconds: self.time_limit.saturating_sub(self.time_left),
                finished_at: Utc::now(),
            },
        }))
    }

    fn clear_session(&mut self) {
        self.topic = None;
        self.questions.clear();
        self.current_index = 0;
        self.answers.clear();
        self.score = 0;
        self.time_left = 0;
        self.time_limit = 0;
        self.last_error = None;
    }

    fn fail_generation(&mut self, err: SupplyError) {
        tracing::warn!(
            "Quiz generation failed: topic={}, error={}",
            self.topic.as_deref().unwrap_or_default(),
            err
        );
        GAME_SESSIONS_TOTAL
            .with_label_values(&[GameMode::Quiz.as_str(), "failed"])
            .inc();
        self.status = QuizStatus::Idle;
        self.last_error = Some(err.to_string());
    }
}

impl GameEngine for QuizEngine {
    type Snapshot = QuizSnapshot;

    fn mode(&self) -> GameMode {
        GameMode::Quiz
    }

    fn epoch(&self) -> u64 {
        self.epoch
    }

    fn is_active(&self) -> bool {
        self.status == QuizStatus::Playing
    }

    fn active_timer(&self) -> Option<u64> {
        self.timer.active_token()
    }

    fn tick(&mut self) -> Option<Effect> {
        if self.status != QuizStatus::Playing {
            return None;
        }
        self.time_left = self.time_left.saturating_sub(1);
        tracing::debug!("Quiz tick: time_left={}", self.time_left);
        if self.time_left == 0 {
            tracing::info!("Quiz time expired");
            return self.finish_game();
        }
        None
    }

    /// Answers whichever question is currently shown.
    fn submit_answer(&mut self, option: &str) -> Option<Effect> {
        if let Some(id) = self.current_question().map(|q| q.id.clone()) {
            self.answer_question(&id, option);
        }
        None
    }

    fn complete_generation(
        &mut self,
        epoch: u64,
        result: Result<Vec<Question>, SupplyError>,
    ) -> Option<Effect> {
        if is_stale(GameMode::Quiz, self.epoch, epoch, "generation") {
            return None;
        }
        if self.status != QuizStatus::Generating {
            return None;
        }

        let topic = self.topic.clone().unwrap_or_default();
        let mut questions = match result
            .and_then(|qs| validate_question_set(&topic, &qs).map(|_| qs))
        {
            Ok(qs) => qs,
            Err(err) => {
                self.fail_generation(err);
                return None;
            }
        };

        questions.truncate(self.rules.question_count.max(1) as usize);
        for question in &mut questions {
            question.options.shuffle(&mut self.rng);
        }

        self.questions = questions;
        self.current_index = 0;
        self.answers.clear();
        self.score = 0;
        self.time_limit = self.rules.time_limit_for(&topic);
        self.time_left = self.time_limit;
        self.status = QuizStatus::Playing;
        self.timer.start();

        GAME_SESSIONS_TOTAL
            .with_label_values(&[GameMode::Quiz.as_str(), "started"])
            .inc();
        tracing::info!(
            "Quiz playing: topic={}, questions={}, time_limit={}s",
            topic,
            self.questions.len(),
            self.time_limit
        );
        None
    }

    fn complete_recording(&mut self, epoch: u64, outcome: Result<(), RecorderError>) {
        if is_stale(GameMode::Quiz, self.epoch, epoch, "recording") {
            return;
        }
        if self.status != QuizStatus::Saving {
            return;
        }
        if let Err(e) = outcome {
            tracing::error!("Failed to record quiz result: {}", e);
        }
        self.status = QuizStatus::Completed;
        GAME_SESSIONS_TOTAL
            .with_label_values(&[GameMode::Quiz.as_str(), "completed"])
            .inc();
    }

    fn reset(&mut self) {
        self.timer.stop();
        self.epoch += 1;
        self.clear_session();
        self.status = QuizStatus::Idle;
        tracing::info!("Quiz reset: epoch={}", self.epoch);
    }

    fn snapshot(&self) -> QuizSnapshot {
        let current_question = self.current_question().map(|q| {
            if self.status == QuizStatus::Completed {
                QuestionView::revealed(q)
            } else {
                QuestionView::hidden(q)
            }
        });

        QuizSnapshot {
            status: self.status,
            topic: self.topic.clone(),
            current_index: self.current_index,
            question_count: self.questions.len(),
            current_question,
            answers: self.answers.clone(),
            score: self.score,
            time_left: self.time_left,
            time_limit: self.time_limit,
            last_error: self.last_error.clone(),
        }
    }
}
