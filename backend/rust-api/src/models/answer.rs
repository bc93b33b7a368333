use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct StartQuizRequest {
    pub topic: String,
    /// Base64-encoded document the generator should draw questions from.
    #[serde(default)]
    pub source_document: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StartArcadeRequest {
    pub level_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswerQuestionRequest {
    pub question_id: String,
    pub option: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitArcadeAnswerRequest {
    pub option: String,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse<S> {
    pub session_id: Uuid,
    pub snapshot: S,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}
