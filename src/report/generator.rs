//! Markdown and JSON report generation.
//!
//! This module renders a statistics view (possibly banca-filtered) for
//! people (Markdown) or for a charting front end (JSON).

use crate::config::ReportConfig;
use crate::models::{Aggregate, DailyBucket, DisciplineStat, Report, ReportMetadata, Tally, Totals};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: &ReportConfig) -> String {
    let mut output = String::new();

    output.push_str("# Performance Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));

    if let Some(ref notice) = report.notice {
        output.push_str(&format!("> ⚠️ {}\n\n", notice));
    }

    output.push_str(&generate_summary_section(&report.stats));

    if options.include_daily {
        output.push_str(&generate_daily_section(&report.stats.daily_buckets));
    }

    output.push_str(&generate_disciplines_section(
        &report.stats.disciplines,
        options.include_topics,
    ));
    output.push_str(&generate_bancas_section(&report.stats));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Student:** {}\n", metadata.student_id));
    section.push_str(&format!(
        "- **Period:** {} days ({} to {})\n",
        metadata.period_days, metadata.window_start, metadata.window_end
    ));
    section.push_str(&format!("- **Banca:** {}\n", metadata.banca));
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push('\n');

    section
}

/// Generate the grand totals section.
fn generate_summary_section(stats: &Aggregate) -> String {
    let Totals {
        total,
        correct,
        incorrect,
        rate,
    } = stats.totals;
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Answered | ✅ Correct | ❌ Incorrect | ⬜ Blank | **Rate** |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | **{}%** |\n\n",
        total,
        correct,
        incorrect,
        total - correct - incorrect,
        rate
    ));

    section
}

/// Generate the daily activity table. Days without answers are listed too.
fn generate_daily_section(buckets: &[DailyBucket]) -> String {
    let mut section = String::new();

    section.push_str("## Daily Activity\n\n");
    section.push_str("| Date | Answered | Correct | Incorrect |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");

    for bucket in buckets {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            bucket.date, bucket.answered, bucket.correct, bucket.incorrect
        ));
    }
    section.push('\n');

    section
}

fn tally_cells(tally: &Tally) -> String {
    format!(
        "{} | {} | {} | {} | {}%",
        tally.correct, tally.incorrect, tally.blank, tally.total, tally.rate
    )
}

/// Generate the discipline overview and one block per discipline.
fn generate_disciplines_section(disciplines: &[DisciplineStat], include_topics: bool) -> String {
    let mut section = String::new();

    section.push_str("## Disciplines\n\n");

    if disciplines.is_empty() {
        section.push_str("No answers in this period.\n\n");
        return section;
    }

    section.push_str("| Discipline | Correct | Incorrect | Blank | Total | Rate |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|\n");
    for discipline in disciplines {
        section.push_str(&format!(
            "| {} | {} |\n",
            discipline.discipline,
            tally_cells(&discipline.tally)
        ));
    }
    section.push('\n');

    for discipline in disciplines {
        section.push_str(&generate_discipline_block(discipline, include_topics));
    }

    section
}

/// Generate the subject (and optionally topic) table for one discipline.
fn generate_discipline_block(discipline: &DisciplineStat, include_topics: bool) -> String {
    let mut block = String::new();

    block.push_str(&format!(
        "### {} ({}%)\n\n",
        discipline.discipline, discipline.tally.rate
    ));

    let bancas: Vec<&str> = discipline.distinct_bancas.iter().map(String::as_str).collect();
    block.push_str(&format!("*Bancas: {}*\n\n", bancas.join(", ")));

    block.push_str("| Subject | Topic | Correct | Incorrect | Blank | Total | Rate |\n");
    block.push_str("|:---|:---|:---:|:---:|:---:|:---:|:---:|\n");

    for subject in &discipline.subjects {
        block.push_str(&format!(
            "| **{}** | | {} |\n",
            subject.subject,
            tally_cells(&subject.tally)
        ));

        if include_topics {
            for topic in &subject.topics {
                block.push_str(&format!(
                    "| | {} | {} |\n",
                    topic.topic,
                    tally_cells(&topic.tally)
                ));
            }
        }
    }
    block.push('\n');

    block
}

/// Generate the banca list and the skipped-answer note.
fn generate_bancas_section(stats: &Aggregate) -> String {
    let mut section = String::new();

    if !stats.bancas.is_empty() {
        section.push_str("## Bancas\n\n");
        for banca in &stats.bancas {
            section.push_str(&format!("- {} (`{}`)\n", banca.label, banca.key));
        }
        section.push('\n');
    }

    if stats.skipped_answers > 0 {
        section.push_str(&format!(
            "*{} answers were left out because their question could not be found.*\n\n",
            stats.skipped_answers
        ));
    }

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by desempenho v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
