//! Run report generation.
//!
//! Renders a finished sweep as Markdown or JSON.

use crate::cli::OutputFormat;
use crate::models::{InvocationRecord, RunMetadata, RunReport, RunSummary, Stage};
use anyhow::{Context, Result};
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &RunReport) -> String {
    let mut output = String::new();

    output.push_str("# aucsweep Run Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(&report.summary));
    output.push_str(&generate_invocations_section(&report.invocations));
    output.push_str(&generate_failures_section(&report.invocations));

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &RunMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Started:** {}\n",
        metadata.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Data Directory:** `{}`\n", metadata.data_dir.display()));
    section.push_str(&format!(
        "- **Output Directory:** `{}`\n",
        metadata.output_dir.display()
    ));
    section.push_str(&format!("- **Plot Directory:** `{}`\n", metadata.plot_dir.display()));
    section.push_str(&format!("- **Folds:** {}\n", metadata.kfolds));
    section.push_str(&format!(
        "- **Seeds:** start {} step {}\n",
        metadata.seed_start, metadata.seed_step
    ));
    section.push_str(&format!("- **Statistic:** {}\n", metadata.statistic));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the summary section.
fn generate_summary_section(summary: &RunSummary) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Analyses | Failed | Result Files | Plot | Exit Code |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | **{}** |\n\n",
        summary.analysis_total,
        summary.analysis_failed,
        summary.result_files,
        if summary.plot_succeeded { "ok" } else { "failed" },
        summary.exit_code
    ));

    section
}

/// Generate the per-invocation table.
fn generate_invocations_section(records: &[InvocationRecord]) -> String {
    let mut section = String::new();

    section.push_str("## Invocations\n\n");
    section.push_str("| # | Stage | Input | Seed | Exit | Duration |\n");
    section.push_str("|:---:|:---|:---|:---:|:---:|:---:|\n");

    for (i, record) in records.iter().enumerate() {
        let input = match record.invocation.stage {
            Stage::Analysis => record
                .invocation
                .inputs
                .first()
                .map(|p| format!("`{}`", escape_cell(&p.display().to_string())))
                .unwrap_or_default(),
            Stage::Plot => format!("{} result files", record.invocation.inputs.len()),
        };
        let seed = record
            .invocation
            .seed
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());

        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {:.1}s |\n",
            i + 1,
            record.invocation.stage,
            input,
            seed,
            record.outcome.code,
            record.duration_seconds
        ));
    }
    section.push('\n');

    section
}

/// Escape pipes so a value cannot split a Markdown table cell.
fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

/// Generate the failures section, listing full command lines.
fn generate_failures_section(records: &[InvocationRecord]) -> String {
    let failed: Vec<_> = records.iter().filter(|r| !r.outcome.success).collect();
    if failed.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Failures\n\n");

    for record in failed {
        section.push_str(&format!(
            "- exit {}: `{}`\n",
            record.outcome.code,
            record.invocation.command_line()
        ));
        if let Some(ref error) = record.outcome.error {
            section.push_str(&format!("  - {}\n", error));
        }
    }
    section.push('\n');

    section
}

/// Generate a JSON report.
pub fn generate_json_report(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Render in the requested format and write to `path`.
pub fn write_report(report: &RunReport, format: OutputFormat, path: &Path) -> Result<()> {
    let content = match format {
        OutputFormat::Markdown => generate_markdown_report(report),
        OutputFormat::Json => generate_json_report(report)?,
    };

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExitOutcome, Invocation};
    use chrono::Utc;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_report() -> RunReport {
        let invocations = vec![
            InvocationRecord {
                invocation: Invocation {
                    stage: Stage::Analysis,
                    program: "python3".to_string(),
                    args: vec!["statistical_analyses.py".to_string(), "data/a.csv".to_string()],
                    inputs: vec![PathBuf::from("data/a.csv")],
                    seed: Some(100),
                },
                outcome: ExitOutcome::success(),
                duration_seconds: 2.0,
            },
            InvocationRecord {
                invocation: Invocation {
                    stage: Stage::Analysis,
                    program: "python3".to_string(),
                    args: vec!["statistical_analyses.py".to_string(), "data/b.csv".to_string()],
                    inputs: vec![PathBuf::from("data/b.csv")],
                    seed: Some(110),
                },
                outcome: ExitOutcome::failed(3),
                duration_seconds: 1.0,
            },
            InvocationRecord {
                invocation: Invocation {
                    stage: Stage::Plot,
                    program: "python3".to_string(),
                    args: vec!["mkplots.py".to_string(), "AUC".to_string()],
                    inputs: vec![PathBuf::from("out/a.csv")],
                    seed: None,
                },
                outcome: ExitOutcome::success(),
                duration_seconds: 0.5,
            },
        ];
        let summary = RunSummary::from_records(&invocations);

        RunReport {
            metadata: RunMetadata {
                started_at: Utc::now(),
                data_dir: PathBuf::from("data"),
                output_dir: PathBuf::from("out"),
                plot_dir: PathBuf::from("plots"),
                kfolds: 5,
                seed_start: 100,
                seed_step: 10,
                statistic: "AUC".to_string(),
                duration_seconds: 3.5,
            },
            invocations,
            summary,
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# aucsweep Run Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Summary"));
        assert!(markdown.contains("## Invocations"));
        assert!(markdown.contains("`data/a.csv`"));
        assert!(markdown.contains("| 3 | plot | 1 result files | - | 0 |"));
        assert!(markdown.contains("## Failures"));
        assert!(markdown.contains("exit 3: `python3 statistical_analyses.py data/b.csv`"));
    }

    #[test]
    fn test_no_failures_section_when_clean() {
        let mut report = create_test_report();
        report.invocations.remove(1);
        report.summary = RunSummary::from_records(&report.invocations);

        let markdown = generate_markdown_report(&report);
        assert!(!markdown.contains("## Failures"));
        assert!(markdown.contains("| 1 | 0 | 1 | ok | **0** |"));
    }

    #[test]
    fn test_pipe_in_input_name_stays_in_its_cell() {
        let mut report = create_test_report();
        report.invocations[0].invocation.inputs = vec![PathBuf::from("data/a|b.csv")];

        let section = generate_invocations_section(&report.invocations);
        let row = section
            .lines()
            .find(|line| line.starts_with("| 1 |"))
            .unwrap();

        assert!(row.contains("`data/a\\|b.csv`"));
    }

    #[test]
    fn test_generate_metadata_section() {
        let report = create_test_report();
        let section = generate_metadata_section(&report.metadata);

        assert!(section.contains("start 100 step 10"));
        assert!(section.contains("**Folds:** 5"));
        assert!(section.contains("**Statistic:** AUC"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"invocations\""));
        assert!(json.contains("\"stage\": \"analysis\""));
        assert!(json.contains("\"exit_code\": 3"));
    }

    #[test]
    fn test_write_report_to_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.json");

        write_report(&create_test_report(), OutputFormat::Json, &path).unwrap();

        let parsed: RunReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.summary.analysis_failed, 1);
        assert_eq!(parsed.invocations.len(), 3);
    }
}
