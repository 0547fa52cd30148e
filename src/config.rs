//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.desempenho.toml` files.

use crate::cli::{Args, OutputFormat, SourceKind};
use anyhow::{anyhow, Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".desempenho.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Event source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Offset from UTC, in minutes, that decides calendar days.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            utc_offset_minutes: 0,
        }
    }
}

impl GeneralConfig {
    /// The configured offset as a chrono timezone.
    pub fn utc_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .ok_or_else(|| anyhow!("Invalid UTC offset: {} minutes", self.utc_offset_minutes))
    }
}

fn default_output() -> PathBuf {
    PathBuf::from("desempenho_report.md")
}

/// Where answers and questions come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source backend.
    #[serde(default)]
    pub kind: SourceKind,

    /// JSON array of answer rows (files source).
    #[serde(default)]
    pub answers_path: Option<PathBuf>,

    /// JSON array of question rows (files source).
    #[serde(default)]
    pub questions_path: Option<PathBuf>,

    /// Supabase project URL.
    #[serde(default)]
    pub supabase_url: Option<String>,

    /// Supabase API key. Only taken from the CLI or environment.
    #[serde(skip)]
    pub supabase_key: Option<String>,

    /// Table holding answer rows.
    #[serde(default = "default_answers_table")]
    pub answers_table: String,

    /// Table holding question rows.
    #[serde(default = "default_questions_table")]
    pub questions_table: String,

    /// Rows per answers page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Question ids per `in.(...)` request.
    #[serde(default = "default_question_chunk_size")]
    pub question_chunk_size: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            answers_path: None,
            questions_path: None,
            supabase_url: None,
            supabase_key: None,
            answers_table: default_answers_table(),
            questions_table: default_questions_table(),
            page_size: default_page_size(),
            question_chunk_size: default_question_chunk_size(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_answers_table() -> String {
    "respostas_alunos".to_string()
}

fn default_questions_table() -> String {
    "questoes".to_string()
}

fn default_page_size() -> usize {
    1000 // PostgREST's usual max-rows
}

fn default_question_chunk_size() -> usize {
    100
}

fn default_timeout() -> u64 {
    30
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Default output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Include the daily activity table.
    #[serde(default = "default_true")]
    pub include_daily: bool,

    /// Include per-topic tables under each discipline.
    #[serde(default = "default_true")]
    pub include_topics: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            include_daily: true,
            include_topics: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings; only values
    /// given explicitly on the command line override the file.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.clone();
        }
        if let Some(minutes) = args.utc_offset_minutes {
            self.general.utc_offset_minutes = minutes;
        }

        if let Some(kind) = args.source {
            self.source.kind = kind;
        }
        if let Some(ref answers) = args.answers {
            self.source.answers_path = Some(answers.clone());
        }
        if let Some(ref questions) = args.questions {
            self.source.questions_path = Some(questions.clone());
        }
        if let Some(ref url) = args.supabase_url {
            self.source.supabase_url = Some(url.clone());
        }
        if let Some(ref key) = args.supabase_key {
            self.source.supabase_key = Some(key.clone());
        }

        if let Some(format) = args.format {
            self.report.format = format;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
