//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Options that also live in the config file
//! are optional here so they only override the file when given.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// aucsweep - seeded k-fold AUC analysis sweep
///
/// Runs the analysis command once per CSV file in the data directory,
/// each with its own seed, then runs the plotting command once over
/// every result file the analyses produced.
///
/// Examples:
///   aucsweep
///   aucsweep --data-dir datasets --kfolds 10
///   aucsweep --seed-start 100 --seed-step 10 --dry-run
///   aucsweep --report run.md
///   aucsweep --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory holding the input CSV files [default: data]
    #[arg(long, value_name = "DIR", env = "AUCSWEEP_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory the analysis writes its results into [default: out]
    ///
    /// Created if it does not exist.
    #[arg(short, long, value_name = "DIR", env = "AUCSWEEP_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Directory the plotting command writes figures into [default: plots]
    #[arg(long, value_name = "DIR", env = "AUCSWEEP_PLOT_DIR")]
    pub plot_dir: Option<PathBuf>,

    /// Number of cross-validation folds [default: 5]
    #[arg(short, long, value_name = "K", env = "AUCSWEEP_KFOLDS")]
    pub kfolds: Option<u32>,

    /// Seed for the first input file [default: 3241345]
    #[arg(long, value_name = "SEED", allow_negative_numbers = true)]
    pub seed_start: Option<i64>,

    /// Seed increment between consecutive files [default: 10]
    #[arg(long, value_name = "STEP", allow_negative_numbers = true)]
    pub seed_step: Option<i64>,

    /// Statistic passed to the plotting command [default: AUC]
    #[arg(long, value_name = "NAME")]
    pub statistic: Option<String>,

    /// Glob matched against input file names [default: *.csv]
    #[arg(long, value_name = "GLOB")]
    pub pattern: Option<String>,

    /// Glob matched against result file names [default: *.csv]
    #[arg(long, value_name = "GLOB")]
    pub result_pattern: Option<String>,

    /// Keep directory listing order instead of sorting by file name
    #[arg(long)]
    pub no_sort: bool,

    /// Analysis executable [default: python3]
    #[arg(long, value_name = "PROGRAM")]
    pub analysis_program: Option<String>,

    /// Arguments placed before the generated analysis options (comma-separated)
    ///
    /// Example: --analysis-args scripts/statistical_analyses.py
    #[arg(long, value_name = "ARGS", value_delimiter = ',')]
    pub analysis_args: Option<Vec<String>>,

    /// Plotting executable [default: python3]
    #[arg(long, value_name = "PROGRAM")]
    pub plot_program: Option<String>,

    /// Arguments placed before the generated plotting options (comma-separated)
    #[arg(long, value_name = "ARGS", value_delimiter = ',')]
    pub plot_args: Option<Vec<String>>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .aucsweep.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write a run report to this file
    #[arg(short, long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Run report format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Show a progress bar over the analysis invocations
    #[arg(long)]
    pub progress: bool,

    /// Dry run: list the invocations that would run and exit
    ///
    /// No processes are spawned and no directories are created.
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .aucsweep.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the run report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.kfolds == Some(0) {
            return Err("Fold count must be at least 1".to_string());
        }

        if let Some(step) = self.seed_step {
            if step < 1 {
                return Err(format!(
                    "Seed step must be at least 1 so every file gets a fresh seed (got {})",
                    step
                ));
            }
        }

        if let Some(ref statistic) = self.statistic {
            if statistic.trim().is_empty() {
                return Err("Statistic name must not be empty".to_string());
            }
        }

        for pattern in [&self.pattern, &self.result_pattern].into_iter().flatten() {
            if let Err(e) = crate::scanner::compile_pattern(pattern) {
                return Err(e.to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref data_dir) = self.data_dir {
            if data_dir.exists() && !data_dir.is_dir() {
                return Err(format!(
                    "Data path is not a directory: {}",
                    data_dir.display()
                ));
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
