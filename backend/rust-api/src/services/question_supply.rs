use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::SupplyError;
use crate::metrics::track_supply_request;
use crate::models::{Question, SupplyRequest};

/// Source of question sets for a session.
#[async_trait]
pub trait QuestionSupply: Send + Sync {
    async fn fetch(&self, request: &SupplyRequest) -> Result<Vec<Question>, SupplyError>;
}

/// Fixed question bank keyed by topic.
#[derive(Debug, Clone, Default)]
pub struct StaticQuestionTable {
    topics: HashMap<String, Vec<Question>>,
}

#[derive(Debug, Deserialize)]
struct QuestionTableFile {
    questions: Vec<Question>,
}

impl StaticQuestionTable {
    pub fn new(questions: Vec<Question>) -> Self {
        let mut topics: HashMap<String, Vec<Question>> = HashMap::new();
        for question in questions {
            topics
                .entry(question.topic.clone())
                .or_default()
                .push(question);
        }
        Self { topics }
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let file: QuestionTableFile = serde_json::from_str(json)?;
        Ok(Self::new(file.questions))
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read question table {}: {}", path.display(), e)
        })?;
        let table = Self::from_json(&json)?;
        tracing::info!(
            "Loaded question table from {}: {} topics",
            path.display(),
            table.topics.len()
        );
        Ok(table)
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.topics.keys().map(String::as_str)
    }
}

#[async_trait]
impl QuestionSupply for StaticQuestionTable {
    async fn fetch(&self, request: &SupplyRequest) -> Result<Vec<Question>, SupplyError> {
        track_supply_request("static", async {
            let questions = self
                .topics
                .get(&request.topic)
                .filter(|qs| !qs.is_empty())
                .ok_or_else(|| SupplyError::Empty {
                    topic: request.topic.clone(),
                })?;
            Ok::<_, SupplyError>(
                questions
                    .iter()
                    .take(request.count as usize)
                    .cloned()
                    .collect(),
            )
        })
        .await
    }
}

#[derive(Debug, Serialize)]
struct GenerateQuestionsRequest<'a> {
    topic: &'a str,
    count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_document: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateQuestionsResponse {
    questions: Vec<Question>,
}

/// Client for the generative question service.
pub struct HttpQuestionSupply {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpQuestionSupply {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            timeout,
        }
    }

    async fn request_questions(
        &self,
        request: &SupplyRequest,
    ) -> Result<Vec<Question>, SupplyError> {
        let url = format!(
            "{}/internal/generate_questions",
            self.base_url.trim_end_matches('/')
        );
        let payload = GenerateQuestionsRequest {
            topic: &request.topic,
            count: request.count,
            source_document: request
                .source_document
                .as_ref()
                .map(|doc| general_purpose::STANDARD.encode(doc)),
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SupplyError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed: GenerateQuestionsResponse =
            serde_json::from_str(&body).map_err(|e| SupplyError::Malformed(e.to_string()))?;

        tracing::info!(
            "Question generator returned {} questions for topic {}",
            parsed.questions.len(),
            request.topic
        );
        Ok(parsed.questions)
    }
}

#[async_trait]
impl QuestionSupply for HttpQuestionSupply {
    async fn fetch(&self, request: &SupplyRequest) -> Result<Vec<Question>, SupplyError> {
        track_supply_request("generator", self.request_questions(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"{
        "questions": [
            {"id": "g1", "question": "Pick the noun", "options": ["run", "cat"], "correct_answer": "cat", "topic": "grammar"},
            {"id": "g2", "question": "Pick the verb", "options": ["jump", "blue"], "correct_answer": "jump", "topic": "grammar"},
            {"id": "h1", "question": "Year of Hastings", "options": ["1066", "1215"], "correct_answer": "1066", "topic": "history"}
        ]
    }"#;

    fn request(topic: &str, count: u32) -> SupplyRequest {
        SupplyRequest {
            topic: topic.to_string(),
            count,
            source_document: None,
        }
    }

    #[tokio::test]
    async fn static_table_serves_topic_in_order() {
        let table = StaticQuestionTable::from_json(TABLE).unwrap();
        let questions = table.fetch(&request("grammar", 10)).await.unwrap();
        let ids: Vec<&str> = questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["g1", "g2"]);
    }

    #[tokio::test]
    async fn static_table_honours_count() {
        let table = StaticQuestionTable::from_json(TABLE).unwrap();
        let questions = table.fetch(&request("grammar", 1)).await.unwrap();
        assert_eq!(questions.len(), 1);
    }

    #[tokio::test]
    async fn static_table_unknown_topic_is_empty_error() {
        let table = StaticQuestionTable::from_json(TABLE).unwrap();
        let err = table.fetch(&request("chemistry", 5)).await.unwrap_err();
        assert_eq!(
            err,
            SupplyError::Empty {
                topic: "chemistry".to_string()
            }
        );
    }

    #[test]
    fn malformed_table_is_rejected() {
        assert!(StaticQuestionTable::from_json(r#"{"questions": 3}"#).is_err());
    }

    #[test]
    fn generator_payload_encodes_document() {
        let payload = GenerateQuestionsRequest {
            topic: "history",
            count: 3,
            source_document: Some(general_purpose::STANDARD.encode(b"notes")),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["source_document"], "bm90ZXM=");
    }

    #[tokio::test]
    async fn unreachable_generator_is_transport_error() {
        let supply = HttpQuestionSupply::new("http://127.0.0.1:9", Duration::from_millis(200));
        let err = supply.fetch(&request("history", 3)).await.unwrap_err();
        assert!(matches!(err, SupplyError::Transport(_)));
    }
}
