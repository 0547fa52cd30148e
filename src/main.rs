//! Desempenho - performance statistics for exam-prep answer histories
//!
//! A CLI tool that aggregates a student's answers into a discipline →
//! subject → topic report with a dense daily series, filterable by banca.
//!
//! Exit codes:
//!   0 - Success (including an unreachable event source, reported as a notice)
//!   1 - Runtime error (invalid arguments, config, unwritable output, etc.)

mod analysis;
mod cli;
mod config;
mod dashboard;
mod models;
mod report;
mod source;

use analysis::{BancaSelection, ReportWindow};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat, SourceKind};
use config::{Config, SourceConfig, CONFIG_FILE};
use dashboard::Dashboard;
use indicatif::{ProgressBar, ProgressStyle};
use models::{Report, ReportMetadata};
use source::{EventSource, SnapshotFiles, SupabaseSource};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("desempenho v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_report(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Report failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .desempenho.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to choose the event source, time zone and report layout.");
    Ok(())
}

/// Initialize logging based on verbosity settings. `RUST_LOG` wins if set.
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().to_string().to_lowercase()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Build the statistics for the requested period and write the report.
async fn run_report(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let offset = config.general.utc_offset()?;
    let today = args
        .today
        .unwrap_or_else(|| Utc::now().with_timezone(&offset).date_naive());
    let window = ReportWindow::new(args.period, today, offset);
    let selection: BancaSelection = args.banca.parse().unwrap_or_default();

    let source = build_source(&config.source)?;
    let mut dashboard = Dashboard::new(args.student_id());

    // Step 1: fetch and aggregate
    let spinner = fetch_spinner(args.quiet);
    spinner.set_message(format!(
        "Loading answers from {} ({} to {})...",
        source.name(),
        window.start(),
        window.today
    ));
    dashboard.refresh(source.as_ref(), window).await;
    spinner.finish_and_clear();

    if let Some(notice) = dashboard.notice() {
        eprintln!("⚠️  {}", notice);
    }

    // Step 2: list bancas and exit if asked
    if args.list_bancas {
        let options = dashboard.banca_options();
        if options.is_empty() {
            println!("No bancas found in this period.");
        }
        for option in options {
            println!("{}\t{}", option.key, option.label);
        }
        return Ok(0);
    }

    // Step 3: apply the banca filter and render
    dashboard.select_banca(selection);
    let stats = dashboard
        .view()
        .context("No statistics were published for the requested period")?;
    let window = *dashboard.window().context("No report window was published")?;
    let selection = dashboard.selection().to_string();

    let report = Report {
        metadata: ReportMetadata {
            student_id: dashboard.student_id().to_string(),
            period_days: window.period_days,
            window_start: window.start(),
            window_end: window.today,
            banca: selection.clone(),
            source: source.name().to_string(),
            generated_at: Utc::now(),
        },
        notice: dashboard.notice().map(String::from),
        stats,
    };

    let output = match config.report.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &config.report),
    };

    let path = &config.general.output;
    std::fs::write(path, &output)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    if !args.quiet {
        let totals = report.stats.totals;
        println!("\n📊 Performance Summary:");
        println!("   Period: {} to {}", window.start(), window.today);
        println!("   Banca: {}", selection);
        println!(
            "   Answered: {} | ✅ {} | ❌ {} | Rate: {}%",
            totals.total, totals.correct, totals.incorrect, totals.rate
        );
        println!("   Disciplines: {}", report.stats.disciplines.len());
        println!("\n✅ Report saved to: {}", path.display());
    }

    Ok(0)
}

/// Spinner shown while the event source is queried.
fn fetch_spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Create the configured event source.
fn build_source(config: &SourceConfig) -> Result<Box<dyn EventSource>> {
    match config.kind {
        SourceKind::Files => {
            let answers = config
                .answers_path
                .clone()
                .context("--answers (or source.answers_path) is required for the files source")?;
            let questions = config
                .questions_path
                .clone()
                .context("--questions (or source.questions_path) is required for the files source")?;
            Ok(Box::new(SnapshotFiles::new(answers, questions)))
        }
        SourceKind::Supabase => {
            let source = SupabaseSource::try_from(config).context("Failed to set up Supabase source")?;
            Ok(Box::new(source))
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
