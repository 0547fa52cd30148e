//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use chrono::NaiveDate;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Desempenho - performance statistics for exam-prep answer histories
///
/// Aggregates a student's answers into discipline, subject and topic
/// statistics with a daily activity series, optionally filtered by banca.
///
/// Examples:
///   desempenho --student 42 --answers answers.json --questions questions.json
///   desempenho --student 42 --period 90 --banca fgv --format json
///   desempenho --student 42 --source supabase --supabase-url https://x.supabase.co
///   desempenho --student 42 --list-bancas
///   desempenho --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Student whose answers are aggregated
    #[arg(
        short,
        long,
        value_name = "ID",
        env = "DESEMPENHO_STUDENT",
        required_unless_present = "init_config"
    )]
    pub student: Option<String>,

    /// Number of days before today to include
    ///
    /// The report covers PERIOD + 1 calendar days, today included.
    #[arg(short, long, default_value = "30", value_name = "DAYS")]
    pub period: u32,

    /// Banca to filter the discipline tree by, or "all"
    #[arg(short, long, default_value = "all", value_name = "BANCA")]
    pub banca: String,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Event source (files, supabase)
    #[arg(long, value_name = "SOURCE")]
    pub source: Option<SourceKind>,

    /// JSON file with answer rows (files source)
    #[arg(long, value_name = "FILE")]
    pub answers: Option<PathBuf>,

    /// JSON file with question rows (files source)
    #[arg(long, value_name = "FILE")]
    pub questions: Option<PathBuf>,

    /// Supabase project URL
    #[arg(long, value_name = "URL", env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Supabase API key
    #[arg(long, value_name = "KEY", env = "SUPABASE_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,

    /// Calendar date to treat as today (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub today: Option<NaiveDate>,

    /// Offset from UTC in minutes used for calendar days (e.g. -180)
    #[arg(long, value_name = "MINUTES", allow_negative_numbers = true)]
    pub utc_offset_minutes: Option<i32>,

    /// Print the bancas found in the period and exit
    #[arg(long)]
    pub list_bancas: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .desempenho.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .desempenho.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Backend the answers are read from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// JSON snapshot files (default)
    #[default]
    Files,
    /// Supabase REST API
    Supabase,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The student id, empty if not set (should be validated first).
    pub fn student_id(&self) -> &str {
        self.student.as_deref().unwrap_or("")
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.student_id().trim().is_empty() {
            return Err("Student id must not be empty".to_string());
        }

        if !(1..=3650).contains(&self.period) {
            return Err("Period must be between 1 and 3650 days".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.supabase_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Supabase URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(minutes) = self.utc_offset_minutes {
            if !(-14 * 60..=14 * 60).contains(&minutes) {
                return Err("UTC offset must be within -840..=840 minutes".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_args() -> Args {
        Args {
            student: Some("s1".to_string()),
            period: 30,
            banca: "all".to_string(),
            output: None,
            format: None,
            source: None,
            answers: None,
            questions: None,
            supabase_url: None,
            supabase_key: None,
            today: None,
            utc_offset_minutes: None,
            list_bancas: false,
            config: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_valid_args() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_period_range() {
        let mut args = make_args();
        args.period = 0;
        assert!(args.validate().is_err());

        args.period = 365;
        assert!(args.validate().is_ok());

        args.period = 5000;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.supabase_url = Some("project.supabase.co".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_skipped_for_init_config() {
        let mut args = make_args();
        args.student = None;
        assert!(args.validate().is_err());

        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "desempenho",
            "--student",
            "42",
            "--period",
            "7",
            "--banca",
            "FGV",
            "--today",
            "2026-10-19",
            "--utc-offset-minutes",
            "-180",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(args.student_id(), "42");
        assert_eq!(args.period, 7);
        assert_eq!(args.banca, "FGV");
        assert_eq!(args.today, NaiveDate::from_ymd_opt(2026, 10, 19));
        assert_eq!(args.utc_offset_minutes, Some(-180));
        assert_eq!(args.format, Some(OutputFormat::Json));
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
