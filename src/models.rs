//! Data models for the performance statistics engine.
//!
//! This module contains the answer/question rows consumed from the event
//! source, the hierarchical statistics produced by the aggregator, and the
//! report wrapper handed to the renderers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Banca used when neither the answer nor the question names one.
pub const NO_BANCA: &str = "no banca";
/// Topic used when no topic can be resolved.
pub const NO_TOPIC: &str = "no topic";
/// Subject used when no subject can be resolved.
pub const NO_SUBJECT: &str = "no subject";
/// Discipline used when the question has none.
pub const NO_DISCIPLINE: &str = "no discipline";

/// A list of labels that may arrive as a single string or as an array.
///
/// Anything else (numbers, objects, `null`) decodes to an empty list, and
/// non-string array items are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Labels(pub Vec<String>);

impl Labels {
    /// Trimmed, non-empty labels in their original order.
    pub fn cleaned(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|label| label.trim())
            .filter(|label| !label.is_empty())
            .map(String::from)
            .collect()
    }
}

impl<'de> Deserialize<'de> for Labels {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let labels = match Value::deserialize(deserializer)? {
            Value::String(label) => vec![label],
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(label) => Some(label),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        Ok(Labels(labels))
    }
}

#[cfg(test)]
impl From<Vec<&str>> for Labels {
    fn from(labels: Vec<&str>) -> Self {
        Labels(labels.into_iter().map(String::from).collect())
    }
}

/// Ids are strings in some tables and integers in others.
fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(de::Error::custom(format!("expected string or number id, got {}", other))),
    }
}

fn de_opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(id) => Ok(Some(id)),
        Value::Number(id) => Ok(Some(id.to_string())),
        other => Err(de::Error::custom(format!("expected string or number id, got {}", other))),
    }
}

/// One answer given by a student to one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerEvent {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(rename = "questao_id", deserialize_with = "de_id")]
    pub question_id: String,
    #[serde(rename = "aluno_id", deserialize_with = "de_id")]
    pub student_id: String,
    /// `None` when the backend did not grade the answer.
    #[serde(rename = "is_correta", default)]
    pub is_correct: Option<bool>,
    #[serde(rename = "opcao_id", default, deserialize_with = "de_opt_id")]
    pub selected_option_id: Option<String>,
    #[serde(rename = "banca", default)]
    pub banca_override: Option<String>,
    #[serde(rename = "topicos", default)]
    pub topics_override: Option<Labels>,
    #[serde(rename = "assuntos", default)]
    pub subjects_override: Option<Labels>,
    #[serde(rename = "created_at")]
    pub occurred_at: DateTime<Utc>,
}

impl AnswerEvent {
    /// Classify this answer. See [`Outcome::of`].
    pub fn outcome(&self) -> Outcome {
        Outcome::of(self)
    }
}

/// A question as seen by the statistics engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRef {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, alias = "disciplina")]
    pub discipline: Option<String>,
    /// Examining board of the question; the fallback banca for its answers.
    #[serde(default, alias = "instituicao")]
    pub institution: Option<String>,
    #[serde(default)]
    pub topics: Labels,
    #[serde(rename = "topicos", default)]
    pub topics_fallback: Labels,
    #[serde(rename = "assuntos", default)]
    pub subjects: Labels,
}

/// Result of a single answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Correct,
    Incorrect,
    Blank,
}

impl Outcome {
    /// An answer is resolved only when an option was selected and the
    /// backend graded it; everything else is blank.
    pub fn of(answer: &AnswerEvent) -> Self {
        match (&answer.selected_option_id, answer.is_correct) {
            (Some(_), Some(true)) => Outcome::Correct,
            (Some(_), Some(false)) => Outcome::Incorrect,
            _ => Outcome::Blank,
        }
    }
}

/// Percentage of correct answers, rounded half up, `0` for an empty total.
pub fn rate(correct: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((200 * correct + total) / (2 * total)) as u32
}

/// Counters shared by every level of the statistics tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub correct: u64,
    pub incorrect: u64,
    pub blank: u64,
    pub total: u64,
    pub rate: u32,
}

impl Tally {
    /// Count one answer and refresh the rate.
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Correct => self.correct += 1,
            Outcome::Incorrect => self.incorrect += 1,
            Outcome::Blank => self.blank += 1,
        }
        self.total += 1;
        self.rate = rate(self.correct, self.total);
    }

    /// Sum the counters of `tallies`, deriving the rate from the sums.
    pub fn sum<'a>(tallies: impl IntoIterator<Item = &'a Tally>) -> Tally {
        let mut sum = Tally::default();
        for tally in tallies {
            sum.correct += tally.correct;
            sum.incorrect += tally.incorrect;
            sum.blank += tally.blank;
            sum.total += tally.total;
        }
        sum.rate = rate(sum.correct, sum.total);
        sum
    }
}

/// Answers resolved on one calendar day. Blank answers are not counted here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub answered: u64,
    pub correct: u64,
    pub incorrect: u64,
}

impl DailyBucket {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            answered: 0,
            correct: 0,
            incorrect: 0,
        }
    }
}

/// Leaf of the statistics tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicStat {
    pub topic: String,
    /// Normalized banca shared by every answer counted here; `None` once
    /// answers from different bancas were merged into this topic.
    pub attributed_banca: Option<String>,
    #[serde(flatten)]
    pub tally: Tally,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectStat {
    pub subject: String,
    pub topics: Vec<TopicStat>,
    #[serde(flatten)]
    pub tally: Tally,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisciplineStat {
    pub discipline: String,
    pub subjects: Vec<SubjectStat>,
    /// Normalized keys of every banca seen under this discipline.
    pub distinct_bancas: BTreeSet<String>,
    #[serde(flatten)]
    pub tally: Tally,
}

/// Grand totals, counted once per answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub total: u64,
    pub correct: u64,
    pub incorrect: u64,
    pub rate: u32,
}

impl From<Tally> for Totals {
    fn from(tally: Tally) -> Self {
        Self {
            total: tally.total,
            correct: tally.correct,
            incorrect: tally.incorrect,
            rate: tally.rate,
        }
    }
}

/// A banca that can be offered in a selection control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BancaOption {
    /// Normalized comparison key.
    pub key: String,
    /// Display label derived from the key.
    pub label: String,
}

/// The full statistics for one student and period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    pub daily_buckets: Vec<DailyBucket>,
    pub disciplines: Vec<DisciplineStat>,
    pub totals: Totals,
    pub bancas: Vec<BancaOption>,
    /// Answers dropped because their question could not be found.
    pub skipped_answers: usize,
}

impl Aggregate {
    /// The all-zero aggregate over the given dense daily series.
    pub fn empty(daily_buckets: Vec<DailyBucket>) -> Self {
        Self {
            daily_buckets,
            disciplines: Vec::new(),
            totals: Totals::default(),
            bancas: Vec::new(),
            skipped_answers: 0,
        }
    }
}

/// Metadata about a rendered statistics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub student_id: String,
    pub period_days: u32,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    /// `all` or the normalized banca key.
    pub banca: String,
    pub source: String,
    pub generated_at: DateTime<Utc>,
}

/// A statistics view ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// Non-fatal, user-visible notice (e.g. the event source was unreachable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    pub stats: Aggregate,
}
