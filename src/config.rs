//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.aucsweep.toml` files. Every field defaults to the constants the
//! sweep has always used, so an empty file is a valid configuration.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".aucsweep.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory and file selection settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Per-file analysis command settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Final plotting command settings.
    #[serde(default)]
    pub plot: PlotConfig,

    /// Run report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Directory layout and input selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Directory holding the input CSV files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory the analysis writes its result files into.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory the plotting command writes its figures into.
    #[serde(default = "default_plot_dir")]
    pub plot_dir: PathBuf,

    /// Glob matched against input file names.
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Glob matched against result file names in the output directory.
    #[serde(default = "default_pattern")]
    pub result_pattern: String,

    /// Sort matched files by name (shell glob order).
    #[serde(default = "default_true")]
    pub sort: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            plot_dir: default_plot_dir(),
            pattern: default_pattern(),
            result_pattern: default_pattern(),
            sort: true,
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

fn default_plot_dir() -> PathBuf {
    PathBuf::from("plots")
}

fn default_pattern() -> String {
    "*.csv".to_string()
}

fn default_true() -> bool {
    true
}

/// Analysis command template, invoked once per input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Executable to run.
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before the generated options.
    #[serde(default = "default_analysis_args")]
    pub args: Vec<String>,

    #[serde(default = "default_seed_flag")]
    pub seed_flag: String,

    #[serde(default = "default_out_dir_flag")]
    pub out_dir_flag: String,

    #[serde(default = "default_kfolds_flag")]
    pub kfolds_flag: String,

    /// Number of cross-validation folds.
    #[serde(default = "default_kfolds")]
    pub kfolds: u32,

    /// Seed handed to the first input file.
    #[serde(default = "default_seed_start")]
    pub seed_start: i64,

    /// Increment applied to the seed after each file.
    #[serde(default = "default_seed_step")]
    pub seed_step: i64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_analysis_args(),
            seed_flag: default_seed_flag(),
            out_dir_flag: default_out_dir_flag(),
            kfolds_flag: default_kfolds_flag(),
            kfolds: default_kfolds(),
            seed_start: default_seed_start(),
            seed_step: default_seed_step(),
        }
    }
}

fn default_program() -> String {
    "python3".to_string()
}

fn default_analysis_args() -> Vec<String> {
    vec!["statistical_analyses.py".to_string()]
}

fn default_seed_flag() -> String {
    "--seed".to_string()
}

fn default_out_dir_flag() -> String {
    "--out_dir".to_string()
}

fn default_kfolds_flag() -> String {
    "--kfolds".to_string()
}

fn default_kfolds() -> u32 {
    5
}

fn default_seed_start() -> i64 {
    3241345
}

fn default_seed_step() -> i64 {
    10
}

/// Plotting command template, invoked once after all analyses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlotConfig {
    /// Executable to run.
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before the generated options.
    #[serde(default = "default_plot_args")]
    pub args: Vec<String>,

    #[serde(default = "default_out_dir_flag")]
    pub out_dir_flag: String,

    #[serde(default = "default_statistic_flag")]
    pub statistic_flag: String,

    /// Statistic name handed to the plotting command.
    #[serde(default = "default_statistic")]
    pub statistic: String,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_plot_args(),
            out_dir_flag: default_out_dir_flag(),
            statistic_flag: default_statistic_flag(),
            statistic: default_statistic(),
        }
    }
}

fn default_plot_args() -> Vec<String> {
    vec!["mkplots.py".to_string()]
}

fn default_statistic_flag() -> String {
    "--statistic".to_string()
}

fn default_statistic() -> String {
    "AUC".to_string()
}

/// Run report settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// Where to write the run report. No report is written when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Report format.
    #[serde(default)]
    pub format: crate::cli::OutputFormat,
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

    /// Try to load `.aucsweep.toml` from a directory.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.data_dir {
            self.general.data_dir = dir.clone();
        }
        if let Some(ref dir) = args.output_dir {
            self.general.output_dir = dir.clone();
        }
        if let Some(ref dir) = args.plot_dir {
            self.general.plot_dir = dir.clone();
        }
        if let Some(ref pattern) = args.pattern {
            self.general.pattern = pattern.clone();
        }
        if let Some(ref pattern) = args.result_pattern {
            self.general.result_pattern = pattern.clone();
        }
        if args.no_sort {
            self.general.sort = false;
        }

        if let Some(ref program) = args.analysis_program {
            self.analysis.program = program.clone();
        }
        if let Some(ref analysis_args) = args.analysis_args {
            self.analysis.args = analysis_args.clone();
        }
        if let Some(kfolds) = args.kfolds {
            self.analysis.kfolds = kfolds;
        }
        if let Some(seed_start) = args.seed_start {
            self.analysis.seed_start = seed_start;
        }
        if let Some(seed_step) = args.seed_step {
            self.analysis.seed_step = seed_step;
        }

        if let Some(ref program) = args.plot_program {
            self.plot.program = program.clone();
        }
        if let Some(ref plot_args) = args.plot_args {
            self.plot.args = plot_args.clone();
        }
        if let Some(ref statistic) = args.statistic {
            self.plot.statistic = statistic.clone();
        }

        if let Some(ref report) = args.report {
            self.report.path = Some(report.clone());
        }
        if let Some(format) = args.format {
            self.report.format = format;
        }
    }

    /// Check values that the type system cannot.
    ///
    /// Applies to values loaded from files as well as CLI overrides.
    pub fn validate(&self) -> Result<()> {
        if self.analysis.kfolds == 0 {
            bail!("kfolds must be at least 1");
        }
        if self.analysis.seed_step < 1 {
            bail!(
                "seed_step must be at least 1 so seeds stay strictly increasing (got {})",
                self.analysis.seed_step
            );
        }
        if self.analysis.program.trim().is_empty() {
            bail!("analysis program must not be empty");
        }
        if self.plot.program.trim().is_empty() {
            bail!("plot program must not be empty");
        }
        if self.plot.statistic.trim().is_empty() {
            bail!("statistic must not be empty");
        }
        crate::scanner::compile_pattern(&self.general.pattern)?;
        crate::scanner::compile_pattern(&self.general.result_pattern)?;
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.data_dir, PathBuf::from("data"));
        assert_eq!(config.general.output_dir, PathBuf::from("out"));
        assert_eq!(config.general.plot_dir, PathBuf::from("plots"));
        assert_eq!(config.analysis.seed_start, 3241345);
        assert_eq!(config.analysis.seed_step, 10);
        assert_eq!(config.analysis.kfolds, 5);
        assert_eq!(config.plot.statistic, "AUC");
        assert!(config.general.sort);
        assert!(config.report.path.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
data_dir = "datasets"
sort = false

[analysis]
program = "python"
args = ["scripts/statistical_analyses.py"]
kfolds = 10
seed_start = 100

[plot]
statistic = "AUPRC"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.data_dir, PathBuf::from("datasets"));
        assert_eq!(config.general.output_dir, PathBuf::from("out"));
        assert!(!config.general.sort);
        assert_eq!(config.analysis.program, "python");
        assert_eq!(config.analysis.args, vec!["scripts/statistical_analyses.py"]);
        assert_eq!(config.analysis.kfolds, 10);
        assert_eq!(config.analysis.seed_start, 100);
        assert_eq!(config.analysis.seed_step, 10);
        assert_eq!(config.analysis.seed_flag, "--seed");
        assert_eq!(config.plot.statistic, "AUPRC");
        assert_eq!(config.plot.args, vec!["mkplots.py"]);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let misspelled = r#"
[analysis]
seedstart = 100
"#;
        assert!(toml::from_str::<Config>(misspelled).is_err());

        let unknown_section = r#"
[plots]
statistic = "AUC"
"#;
        assert!(toml::from_str::<Config>(unknown_section).is_err());
    }

    #[test]
    fn test_load_from_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(Config::load_from_dir(temp.path()).unwrap().is_none());

        std::fs::write(
            temp.path().join(DEFAULT_CONFIG_FILE),
            "[analysis]\nseed_start = 42\n",
        )
        .unwrap();
        let config = Config::load_from_dir(temp.path()).unwrap().unwrap();
        assert_eq!(config.analysis.seed_start, 42);

        std::fs::write(
            temp.path().join(DEFAULT_CONFIG_FILE),
            "[analysis]\nseed_start = \"oops\"\n",
        )
        .unwrap();
        let err = Config::load_from_dir(temp.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = Config::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.analysis.kfolds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.analysis.seed_step = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.analysis.seed_step = -10;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.plot.statistic = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.general.pattern = "[*.csv".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[analysis]"));
        assert!(toml_str.contains("[plot]"));
        assert!(toml_str.contains("seed_start = 3241345"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.plot.statistic, "AUC");
    }
}
