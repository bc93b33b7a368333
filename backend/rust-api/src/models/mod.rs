use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::{Validate, ValidationError};

use crate::error::SupplyError;

pub mod answer;
pub mod event;
pub mod snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// A single multiple-choice question as delivered by a question supply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_correct_answer"))]
pub struct Question {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1))]
    pub question: String,
    #[validate(length(min = 2, max = 6))]
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub topic: String,
}

impl Question {
    pub fn is_correct(&self, option: &str) -> bool {
        self.correct_answer == option
    }
}

fn validate_correct_answer(question: &Question) -> Result<(), ValidationError> {
    if question.options.iter().any(|o| o == &question.correct_answer) {
        Ok(())
    } else {
        Err(ValidationError::new("correct_answer_not_in_options"))
    }
}

/// Checks a whole supply response. One bad record rejects the response.
pub fn validate_question_set(topic: &str, questions: &[Question]) -> Result<(), SupplyError> {
    if questions.is_empty() {
        return Err(SupplyError::Empty {
            topic: topic.to_string(),
        });
    }

    let mut seen = HashSet::with_capacity(questions.len());
    for question in questions {
        question
            .validate()
            .map_err(|e| SupplyError::Invalid(format!("question {}: {}", question.id, e)))?;
        if !seen.insert(question.id.as_str()) {
            return Err(SupplyError::Invalid(format!(
                "duplicate question id {}",
                question.id
            )));
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Quiz,
    Arcade,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Quiz => "quiz",
            GameMode::Arcade => "arcade",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizStatus {
    Idle,
    Generating,
    Playing,
    Saving,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyRequest {
    pub topic: String,
    pub count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_document: Option<Vec<u8>>,
}

/// Final outcome of a session, handed to the session recorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub mode: GameMode,
    pub session_topic: String,
    pub score: u32,
    pub total_questions: u32,
    pub duration_seconds: u32,
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, options: &[&str], correct: &str) -> Question {
        Question {
            id: id.to_string(),
            question: format!("prompt {}", id),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: correct.to_string(),
            explanation: String::new(),
            difficulty: Difficulty::Easy,
            topic: "grammar".to_string(),
        }
    }

    #[test]
    fn empty_set_is_rejected() {
        assert_eq!(
            validate_question_set("grammar", &[]),
            Err(SupplyError::Empty {
                topic: "grammar".to_string()
            })
        );
    }

    #[test]
    fn correct_answer_must_be_an_option() {
        let bad = question("q1", &["A", "B"], "C");
        assert!(matches!(
            validate_question_set("grammar", &[bad]),
            Err(SupplyError::Invalid(_))
        ));
    }

    #[test]
    fn option_count_is_bounded() {
        let single = question("q1", &["A"], "A");
        assert!(validate_question_set("grammar", &[single]).is_err());

        let seven = question("q2", &["A", "B", "C", "D", "E", "F", "G"], "A");
        assert!(validate_question_set("grammar", &[seven]).is_err());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let a = question("q1", &["A", "B"], "A");
        let b = question("q1", &["C", "D"], "D");
        assert!(matches!(
            validate_question_set("grammar", &[a, b]),
            Err(SupplyError::Invalid(msg)) if msg.contains("duplicate")
        ));
    }

    #[test]
    fn difficulty_defaults_when_missing() {
        let json = r#"{"id":"q1","question":"2+2?","options":["3","4"],"correct_answer":"4"}"#;
        let parsed: Question = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.difficulty, Difficulty::Medium);
        assert!(parsed.is_correct("4"));
    }
}
