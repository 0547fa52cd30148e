//! Event sources for answers and questions.
//!
//! The statistics engine never talks to storage directly; it asks an
//! [`EventSource`] for a snapshot of one student's answers and the questions
//! they reference.

pub mod files;
pub mod supabase;

pub use files::SnapshotFiles;
pub use supabase::SupabaseSource;

use crate::models::{AnswerEvent, QuestionRef};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors surfaced by event sources.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snapshot {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("request to {table} failed with status {status}")]
    Status {
        table: String,
        status: reqwest::StatusCode,
    },

    #[error("event source is not configured: {0}")]
    Config(String),
}

/// Backend that stores answers and questions.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Short name used in logs and report metadata.
    fn name(&self) -> &str;

    /// Answers given by `student_id` at or after `since` and before `until`.
    async fn fetch_answers(
        &self,
        student_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<AnswerEvent>, SourceError>;

    /// Questions with the given ids. Unknown ids are simply absent.
    async fn fetch_questions(&self, ids: &[String]) -> Result<Vec<QuestionRef>, SourceError>;
}

/// Everything the aggregator needs for one period.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub answers: Vec<AnswerEvent>,
    pub questions: Vec<QuestionRef>,
}

/// Fetch a student's answers in `[since, until)` and the questions they
/// reference.
pub async fn fetch_snapshot(
    source: &dyn EventSource,
    student_id: &str,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<Snapshot, SourceError> {
    let answers = source.fetch_answers(student_id, since, until).await?;

    let ids: Vec<String> = answers
        .iter()
        .map(|a| a.question_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let questions = if ids.is_empty() {
        Vec::new()
    } else {
        source.fetch_questions(&ids).await?
    };

    debug!(
        "{}: fetched {} answers and {} of {} questions",
        source.name(),
        answers.len(),
        questions.len(),
        ids.len()
    );

    Ok(Snapshot { answers, questions })
}

/// Decode rows one by one, skipping the ones that do not fit `T`.
pub(crate) fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>, what: &str) -> Vec<T> {
    let total = rows.len();
    let decoded: Vec<T> = rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(item) => Some(item),
            Err(e) => {
                debug!("Skipping malformed {} row: {}", what, e);
                None
            }
        })
        .collect();

    if decoded.len() < total {
        warn!("Skipped {} malformed {} rows", total - decoded.len(), what);
    }

    decoded
}
