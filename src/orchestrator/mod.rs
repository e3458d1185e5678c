//! Sweep orchestration.
//!
//! Runs the analysis command once per input file, strictly in sequence and
//! each with a fresh seed, then runs the plotting command exactly once over
//! whatever result files the analyses left in the output directory.

pub mod seed;

pub use seed::SeedSequence;

use crate::config::{AnalysisConfig, Config, PlotConfig};
use crate::models::{Invocation, InvocationRecord, RunSummary, Stage};
use crate::runner::ProcessRunner;
use crate::scanner::{FileScanner, ScanConfig};
use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Everything needed to carry out one sweep.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub plot_dir: PathBuf,
    pub input_scan: ScanConfig,
    pub result_scan: ScanConfig,
    pub analysis: AnalysisConfig,
    pub plot: PlotConfig,
}

impl From<&Config> for RunPlan {
    fn from(config: &Config) -> Self {
        Self {
            data_dir: config.general.data_dir.clone(),
            output_dir: config.general.output_dir.clone(),
            plot_dir: config.general.plot_dir.clone(),
            input_scan: ScanConfig {
                pattern: config.general.pattern.clone(),
                sort: config.general.sort,
            },
            result_scan: ScanConfig {
                pattern: config.general.result_pattern.clone(),
                sort: true,
            },
            analysis: config.analysis.clone(),
            plot: config.plot.clone(),
        }
    }
}

impl RunPlan {
    /// Fresh seed sequence for this plan.
    pub fn seeds(&self) -> SeedSequence {
        SeedSequence::new(self.analysis.seed_start, self.analysis.seed_step)
    }

    /// List the input files in enumeration order.
    pub fn scan_inputs(&self) -> Result<Vec<PathBuf>> {
        FileScanner::new(self.data_dir.clone(), &self.input_scan)?
            .scan()
            .with_context(|| format!("Failed to list input files in {}", self.data_dir.display()))
    }

    /// List the result files currently in the output directory.
    pub fn scan_results(&self) -> Result<Vec<PathBuf>> {
        FileScanner::new(self.output_dir.clone(), &self.result_scan)?
            .scan()
            .with_context(|| {
                format!(
                    "Failed to list result files in {}",
                    self.output_dir.display()
                )
            })
    }

    /// Assemble the analysis command for one input file.
    pub fn analysis_invocation(&self, input: &Path, seed: i64) -> Invocation {
        let analysis = &self.analysis;
        let mut args = analysis.args.clone();
        args.push(analysis.seed_flag.clone());
        args.push(seed.to_string());
        args.push(analysis.out_dir_flag.clone());
        args.push(self.output_dir.to_string_lossy().into_owned());
        args.push(analysis.kfolds_flag.clone());
        args.push(analysis.kfolds.to_string());
        args.push(input.to_string_lossy().into_owned());

        Invocation {
            stage: Stage::Analysis,
            program: analysis.program.clone(),
            args,
            inputs: vec![input.to_path_buf()],
            seed: Some(seed),
        }
    }

    /// Pair each input file with the next seed and assemble its command.
    ///
    /// Fails if the seed sequence would overflow before every file has one.
    pub fn plan_analysis(
        &self,
        files: &[PathBuf],
        mut seeds: SeedSequence,
    ) -> Result<Vec<Invocation>> {
        let mut invocations = Vec::with_capacity(files.len());

        for (index, file) in files.iter().enumerate() {
            let Some(seed) = seeds.next() else {
                bail!(
                    "Seed overflow: cannot assign a seed to file {} of {} ({})",
                    index + 1,
                    files.len(),
                    file.display()
                );
            };
            invocations.push(self.analysis_invocation(file, seed));
        }

        Ok(invocations)
    }

    /// Assemble the single plotting command over all result files.
    pub fn plot_invocation(&self, result_files: &[PathBuf]) -> Invocation {
        let plot = &self.plot;
        let mut args = plot.args.clone();
        args.push(plot.out_dir_flag.clone());
        args.push(self.plot_dir.to_string_lossy().into_owned());
        args.push(plot.statistic_flag.clone());
        args.push(plot.statistic.clone());
        args.extend(
            result_files
                .iter()
                .map(|p| p.to_string_lossy().into_owned()),
        );

        Invocation {
            stage: Stage::Plot,
            program: plot.program.clone(),
            args,
            inputs: result_files.to_vec(),
            seed: None,
        }
    }

    /// Create the output and plot directories if they are absent.
    pub fn prepare_directories(&self) -> Result<()> {
        for dir in [&self.output_dir, &self.plot_dir] {
            if dir.exists() && !dir.is_dir() {
                bail!("Output path exists but is not a directory: {}", dir.display());
            }
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            debug!("Directory ready: {}", dir.display());
        }
        Ok(())
    }
}

/// Result of a completed sweep.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Every invocation in execution order; the plot invocation is last.
    pub records: Vec<InvocationRecord>,
    pub summary: RunSummary,
}

/// Drives a sweep through a [`ProcessRunner`].
pub struct Orchestrator<R> {
    runner: R,
    progress: Option<ProgressBar>,
}

impl<R: ProcessRunner> Orchestrator<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            progress: None,
        }
    }

    /// Report analysis progress on the given bar.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run the whole sweep.
    ///
    /// Setup problems (directories, listing, seed overflow) are errors and
    /// happen before any process starts. Failing invocations are not: they
    /// are recorded and the sweep carries on.
    pub async fn run(&self, plan: &RunPlan) -> Result<RunOutcome> {
        let files = plan.scan_inputs()?;
        let analyses = plan.plan_analysis(&files, plan.seeds())?;
        plan.prepare_directories()?;

        info!(
            "Running analysis on {} files from {}",
            analyses.len(),
            plan.data_dir.display()
        );

        if let Some(ref pb) = self.progress {
            pb.set_length(analyses.len() as u64);
        }

        let mut records = Vec::with_capacity(analyses.len() + 1);
        let total = analyses.len();

        for (index, invocation) in analyses.into_iter().enumerate() {
            if let Some(ref pb) = self.progress {
                pb.set_message(display_inputs(&invocation));
            }
            info!(
                "[{}/{}] {} (seed {})",
                index + 1,
                total,
                display_inputs(&invocation),
                invocation.seed.unwrap_or_default()
            );

            records.push(self.execute(invocation).await);

            if let Some(ref pb) = self.progress {
                pb.inc(1);
            }
        }

        if let Some(ref pb) = self.progress {
            pb.finish_with_message("analysis complete");
        }

        let result_files = plan.scan_results()?;
        info!(
            "Plotting {} over {} result files into {}",
            plan.plot.statistic,
            result_files.len(),
            plan.plot_dir.display()
        );
        records.push(self.execute(plan.plot_invocation(&result_files)).await);

        let summary = RunSummary::from_records(&records);
        Ok(RunOutcome { records, summary })
    }

    /// Run one invocation and record how it ended.
    async fn execute(&self, invocation: Invocation) -> InvocationRecord {
        debug!("Command: {}", invocation.command_line());
        let start = Instant::now();

        let outcome = match self.runner.run(&invocation).await {
            Ok(outcome) => {
                if outcome.success {
                    info!(
                        "{} {} exited successfully",
                        invocation.stage,
                        display_inputs(&invocation)
                    );
                } else {
                    warn!(
                        "{} {} failed with exit code {}",
                        invocation.stage,
                        display_inputs(&invocation),
                        outcome.code
                    );
                }
                outcome
            }
            Err(e) => {
                error!("{} {}: {}", invocation.stage, display_inputs(&invocation), e);
                e.into_outcome()
            }
        };

        InvocationRecord {
            invocation,
            outcome,
            duration_seconds: start.elapsed().as_secs_f64(),
        }
    }
}

fn display_inputs(invocation: &Invocation) -> String {
    match invocation.stage {
        Stage::Analysis => invocation
            .inputs
            .first()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        Stage::Plot => format!("({} files)", invocation.inputs.len()),
    }
}
