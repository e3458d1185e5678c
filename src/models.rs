//! Data models for the sweep.
//!
//! This module contains the core data structures used throughout the
//! application: assembled invocations, their outcomes, and the run report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Exit code used when the program could not be found.
pub const EXIT_NOT_FOUND: i32 = 127;

/// Exit code used when the program exists but could not be started.
pub const EXIT_CANNOT_EXECUTE: i32 = 126;

/// Which step of the sweep an invocation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Per-file cross-validation analysis.
    Analysis,
    /// Final plotting over all result files.
    Plot,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Analysis => write!(f, "analysis"),
            Stage::Plot => write!(f, "plot"),
        }
    }
}

/// A fully assembled external command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub stage: Stage,
    pub program: String,
    pub args: Vec<String>,
    /// Files the invocation consumes: one CSV for analysis, every
    /// result file for plotting. Also present in `args`.
    #[serde(default)]
    pub inputs: Vec<PathBuf>,
    /// Seed handed to the analysis, for analysis invocations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

impl Invocation {
    /// Render the command line for logs and dry runs.
    pub fn command_line(&self) -> String {
        let mut line = shell_quote(&self.program);
        for arg in &self.args {
            line.push(' ');
            line.push_str(&shell_quote(arg));
        }
        line
    }
}

fn shell_quote(s: &str) -> String {
    let plain = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

/// How an external process finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitOutcome {
    /// Whether the process reported success.
    pub success: bool,
    /// Exit code in shell convention: the process code, `128 + signal`
    /// when killed, 126/127 when it never started.
    pub code: i32,
    /// Set when the process could not be spawned or awaited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExitOutcome {
    pub fn success() -> Self {
        Self {
            success: true,
            code: 0,
            error: None,
        }
    }

    /// A process that ran and exited with a non-zero code.
    pub fn failed(code: i32) -> Self {
        Self {
            success: false,
            code,
            error: None,
        }
    }

    /// A process that never ran.
    pub fn not_started(code: i32, error: impl Into<String>) -> Self {
        Self {
            success: false,
            code,
            error: Some(error.into()),
        }
    }
}

/// An invocation paired with its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationRecord {
    pub invocation: Invocation,
    pub outcome: ExitOutcome,
    /// Wall-clock duration in seconds.
    pub duration_seconds: f64,
}

/// Summary counts for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of analysis invocations made.
    pub analysis_total: usize,
    /// Number of analysis invocations that failed.
    pub analysis_failed: usize,
    /// Whether the plotting invocation succeeded.
    pub plot_succeeded: bool,
    /// Number of result files handed to the plotting invocation.
    pub result_files: usize,
    /// Overall exit code of the run.
    pub exit_code: i32,
}

impl RunSummary {
    /// Build a summary from invocation records.
    ///
    /// The exit code is that of the last failing invocation, or 0.
    pub fn from_records(records: &[InvocationRecord]) -> Self {
        let mut summary = Self::default();

        for record in records {
            match record.invocation.stage {
                Stage::Analysis => {
                    summary.analysis_total += 1;
                    if !record.outcome.success {
                        summary.analysis_failed += 1;
                    }
                }
                Stage::Plot => {
                    summary.plot_succeeded = record.outcome.success;
                    summary.result_files = record.invocation.inputs.len();
                }
            }
        }

        summary.exit_code = records
            .iter()
            .rev()
            .find(|r| !r.outcome.success)
            .map(|r| nonzero(r.outcome.code))
            .unwrap_or(0);

        summary
    }

    pub fn all_succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

fn nonzero(code: i32) -> i32 {
    if code == 0 {
        1
    } else {
        code
    }
}

/// Metadata about a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub started_at: DateTime<Utc>,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub plot_dir: PathBuf,
    pub kfolds: u32,
    pub seed_start: i64,
    pub seed_step: i64,
    pub statistic: String,
    pub duration_seconds: f64,
}

/// The complete run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub metadata: RunMetadata,
    pub invocations: Vec<InvocationRecord>,
    pub summary: RunSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(seed: i64, input: &str) -> Invocation {
        Invocation {
            stage: Stage::Analysis,
            program: "python3".to_string(),
            args: vec![
                "statistical_analyses.py".to_string(),
                "--seed".to_string(),
                seed.to_string(),
                input.to_string(),
            ],
            inputs: vec![PathBuf::from(input)],
            seed: Some(seed),
        }
    }

    fn record(invocation: Invocation, outcome: ExitOutcome) -> InvocationRecord {
        InvocationRecord {
            invocation,
            outcome,
            duration_seconds: 0.5,
        }
    }

    fn plot(files: &[&str]) -> Invocation {
        let mut args = vec!["mkplots.py".to_string(), "--statistic".to_string(), "AUC".to_string()];
        args.extend(files.iter().map(|f| f.to_string()));
        Invocation {
            stage: Stage::Plot,
            program: "python3".to_string(),
            args,
            inputs: files.iter().map(PathBuf::from).collect(),
            seed: None,
        }
    }

    #[test]
    fn test_command_line_quoting() {
        let mut inv = analysis(7, "data/my file.csv");
        assert_eq!(
            inv.command_line(),
            "python3 statistical_analyses.py --seed 7 'data/my file.csv'"
        );

        inv.args = vec!["it's".to_string(), String::new()];
        assert_eq!(inv.command_line(), r"python3 'it'\''s' ''");
    }

    #[test]
    fn test_summary_all_succeeded() {
        let records = vec![
            record(analysis(1, "a.csv"), ExitOutcome::success()),
            record(analysis(11, "b.csv"), ExitOutcome::success()),
            record(plot(&["out/a.csv", "out/b.csv"]), ExitOutcome::success()),
        ];

        let summary = RunSummary::from_records(&records);
        assert_eq!(summary.analysis_total, 2);
        assert_eq!(summary.analysis_failed, 0);
        assert!(summary.plot_succeeded);
        assert_eq!(summary.result_files, 2);
        assert_eq!(summary.exit_code, 0);
        assert!(summary.all_succeeded());
    }

    #[test]
    fn test_summary_exit_code_is_last_failure() {
        let records = vec![
            record(analysis(1, "a.csv"), ExitOutcome::failed(3)),
            record(analysis(11, "b.csv"), ExitOutcome::success()),
            record(
                analysis(21, "c.csv"),
                ExitOutcome::not_started(EXIT_NOT_FOUND, "no such program"),
            ),
            record(plot(&[]), ExitOutcome::success()),
        ];

        let summary = RunSummary::from_records(&records);
        assert_eq!(summary.analysis_failed, 2);
        assert!(summary.plot_succeeded);
        assert_eq!(summary.result_files, 0);
        assert_eq!(summary.exit_code, EXIT_NOT_FOUND);
        assert!(!summary.all_succeeded());
    }

    #[test]
    fn test_summary_failure_never_reports_zero() {
        let records = vec![record(plot(&[]), ExitOutcome::failed(0))];
        assert_eq!(RunSummary::from_records(&records).exit_code, 1);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Analysis.to_string(), "analysis");
        assert_eq!(Stage::Plot.to_string(), "plot");
    }
}
