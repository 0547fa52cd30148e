//! Supabase (PostgREST) event source.
//!
//! Answers are filtered server-side by student and date and read page by
//! page; questions are fetched by id in concurrent chunks.

use super::{decode_rows, EventSource, SourceError};
use crate::config::SourceConfig;
use crate::models::{AnswerEvent, QuestionRef};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::try_join_all;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Client for the answers and questions tables of a Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    answers_table: String,
    questions_table: String,
    page_size: usize,
    chunk_size: usize,
}

impl TryFrom<&SourceConfig> for SupabaseSource {
    type Error = SourceError;

    fn try_from(config: &SourceConfig) -> Result<Self, Self::Error> {
        let base_url = config
            .supabase_url
            .clone()
            .ok_or_else(|| SourceError::Config("supabase_url is not set".to_string()))?;
        let api_key = config
            .supabase_key
            .clone()
            .ok_or_else(|| SourceError::Config("supabase key is not set (SUPABASE_KEY)".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            answers_table: config.answers_table.clone(),
            questions_table: config.questions_table.clone(),
            page_size: config.page_size.max(1),
            chunk_size: config.question_chunk_size.max(1),
        })
    }
}

/// PostgREST filters for one student's answers in `[since, until)`.
fn answers_query(
    student_id: &str,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Vec<(&'static str, String)> {
    vec![
        ("select", "*".to_string()),
        ("aluno_id", format!("eq.{}", student_id)),
        (
            "created_at",
            format!("gte.{}", since.to_rfc3339_opts(SecondsFormat::Secs, true)),
        ),
        (
            "created_at",
            format!("lt.{}", until.to_rfc3339_opts(SecondsFormat::Secs, true)),
        ),
        ("order", "created_at.asc,id.asc".to_string()),
    ]
}

/// Double-quote an id for an `in.(...)` list, escaping `\` and `"`.
fn quote_id(id: &str) -> String {
    let mut quoted = String::with_capacity(id.len() + 2);
    quoted.push('"');
    for c in id.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// PostgREST filter selecting questions by id.
fn questions_query(ids: &[String]) -> Vec<(&'static str, String)> {
    let quoted: Vec<String> = ids.iter().map(|id| quote_id(id)).collect();
    vec![
        ("select", "*".to_string()),
        ("id", format!("in.({})", quoted.join(","))),
    ]
}

/// Offset of the next answers page, or `None` once a page comes back empty.
///
/// The server may cap a page below the requested size (`max-rows`), so a
/// short page does not mean the last one.
fn next_page(offset: usize, fetched: usize) -> Option<usize> {
    (fetched > 0).then(|| offset + fetched)
}

impl SupabaseSource {
    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn get_rows(
        &self,
        table: &str,
        query: &[(&'static str, String)],
        range: Option<(usize, usize)>,
    ) -> Result<Vec<Value>, SourceError> {
        let mut request = self
            .client
            .get(self.table_url(table))
            .query(query)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key);

        if let Some((from, to)) = range {
            request = request
                .header("Range-Unit", "items")
                .header("Range", format!("{}-{}", from, to));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                table: table.to_string(),
                status,
            });
        }

        Ok(response.json::<Vec<Value>>().await?)
    }
}

#[async_trait]
impl EventSource for SupabaseSource {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn fetch_answers(
        &self,
        student_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<AnswerEvent>, SourceError> {
        let query = answers_query(student_id, since, until);
        let mut rows = Vec::new();
        let mut offset = 0;

        loop {
            let page = self
                .get_rows(
                    &self.answers_table,
                    &query,
                    Some((offset, offset + self.page_size - 1)),
                )
                .await?;
            let fetched = page.len();
            rows.extend(page);
            debug!("{}: page at {} returned {} rows", self.answers_table, offset, fetched);

            match next_page(offset, fetched) {
                Some(next) => offset = next,
                None => break,
            }
        }

        info!("Fetched {} answers from {}", rows.len(), self.answers_table);
        Ok(decode_rows(rows, "answer"))
    }

    async fn fetch_questions(&self, ids: &[String]) -> Result<Vec<QuestionRef>, SourceError> {
        let requests = ids.chunks(self.chunk_size).map(|chunk| {
            let query = questions_query(chunk);
            async move { self.get_rows(&self.questions_table, &query, None).await }
        });

        let rows: Vec<Value> = try_join_all(requests).await?.into_iter().flatten().collect();

        info!(
            "Fetched {} of {} questions from {}",
            rows.len(),
            ids.len(),
            self.questions_table
        );
        Ok(decode_rows(rows, "question"))
    }
}
