//! JSON snapshot files exported from the backend.
//!
//! Each file holds an array of rows shaped like the backend tables.

use super::{decode_rows, EventSource, SourceError};
use crate::models::{AnswerEvent, QuestionRef};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Answers and questions read from two JSON files.
#[derive(Debug, Clone)]
pub struct SnapshotFiles {
    answers_path: PathBuf,
    questions_path: PathBuf,
}

impl SnapshotFiles {
    pub fn new(answers_path: PathBuf, questions_path: PathBuf) -> Self {
        Self {
            answers_path,
            questions_path,
        }
    }

    async fn read_rows(path: &Path) -> Result<Vec<Value>, SourceError> {
        debug!("Reading snapshot {}", path.display());

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SourceError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        serde_json::from_str(&content).map_err(|source| SourceError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[async_trait]
impl EventSource for SnapshotFiles {
    fn name(&self) -> &str {
        "files"
    }

    async fn fetch_answers(
        &self,
        student_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<AnswerEvent>, SourceError> {
        let rows = Self::read_rows(&self.answers_path).await?;

        let mut answers: Vec<AnswerEvent> = decode_rows::<AnswerEvent>(rows, "answer")
            .into_iter()
            .filter(|a| a.student_id == student_id)
            .filter(|a| a.occurred_at >= since && a.occurred_at < until)
            .collect();
        answers.sort_by_key(|a| a.occurred_at);

        Ok(answers)
    }

    async fn fetch_questions(&self, ids: &[String]) -> Result<Vec<QuestionRef>, SourceError> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let rows = Self::read_rows(&self.questions_path).await?;

        Ok(decode_rows::<QuestionRef>(rows, "question")
            .into_iter()
            .filter(|q| wanted.contains(q.id.as_str()))
            .collect())
    }
}
