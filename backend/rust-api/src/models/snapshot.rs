use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Difficulty, Question, QuizStatus};

/// Player-facing view of a question. The answer key is only filled in once
/// revealing it can no longer affect the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub difficulty: Difficulty,
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuestionView {
    pub fn hidden(question: &Question) -> Self {
        Self {
            id: question.id.clone(),
            question: question.question.clone(),
            options: question.options.clone(),
            difficulty: question.difficulty,
            topic: question.topic.clone(),
            correct_answer: None,
            explanation: None,
        }
    }

    pub fn revealed(question: &Question) -> Self {
        Self {
            correct_answer: Some(question.correct_answer.clone()),
            explanation: Some(question.explanation.clone()),
            ..Self::hidden(question)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSnapshot {
    pub status: QuizStatus,
    pub topic: Option<String>,
    pub current_index: usize,
    pub question_count: usize,
    pub current_question: Option<QuestionView>,
    pub answers: HashMap<String, String>,
    pub score: u32,
    pub time_left: u32,
    pub time_limit: u32,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArcadeEndReason {
    OutOfLives,
    OutOfTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcadeSnapshot {
    pub is_playing: bool,
    pub awaiting_questions: bool,
    pub level_id: Option<String>,
    pub current_question: Option<QuestionView>,
    pub score: u32,
    pub lives: u8,
    pub combo: u32,
    pub ghost_score: u32,
    pub time_left: u32,
    pub session_time_left: Option<u32>,
    pub answered: u32,
    pub end_reason: Option<ArcadeEndReason>,
    pub last_error: Option<String>,
}
