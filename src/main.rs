//! aucsweep - seeded k-fold AUC analysis sweep
//!
//! A CLI tool that runs a cross-validation analysis command once per CSV
//! file in a data directory, each with its own deterministic seed, and
//! then runs a plotting command once over all of the produced results.
//!
//! Exit codes:
//!   0 - Every invocation succeeded
//!   N - Exit code of the last failing invocation (126/127 if it could
//!       not be started, 128+signal if it was killed)
//!   1 - Setup error (configuration, directories, report output)

mod cli;
mod config;
mod models;
mod orchestrator;
mod report;
mod runner;
mod scanner;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::{RunMetadata, RunReport};
use orchestrator::{Orchestrator, RunPlan};
use runner::SystemRunner;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("aucsweep v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let result = run_sweep(args, Path::new(".")).await;
    if let Err(ref e) = result {
        error!("Sweep failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
    }
    std::process::exit(exit_code(&result));
}

/// Map a sweep result to the process exit code; setup errors exit 1.
fn exit_code(result: &Result<i32>) -> i32 {
    match result {
        Ok(code) => *code,
        Err(_) => 1,
    }
}

/// Handle --init-config: generate a default .aucsweep.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize directories, seeds, folds, and commands.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete sweep. Returns the process exit code.
///
/// `base_dir` is where the default `.aucsweep.toml` is looked up.
async fn run_sweep(args: Args, base_dir: &Path) -> Result<i32> {
    let start_time = Instant::now();
    let started_at = Utc::now();

    let mut config = load_config(&args, base_dir)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;
    debug!("Resolved configuration: {:?}", config);

    let plan = RunPlan::from(&config);

    if args.dry_run {
        return handle_dry_run(&plan);
    }

    println!("🔬 Running {} sweep", plan.plot.statistic);
    println!("   Data: {}", plan.data_dir.display());
    println!("   Results: {}", plan.output_dir.display());
    println!(
        "   Seeds: {} (+{} per file) | Folds: {}",
        plan.analysis.seed_start, plan.analysis.seed_step, plan.analysis.kfolds
    );

    let mut orchestrator = Orchestrator::new(SystemRunner);
    if args.progress && !args.quiet {
        orchestrator = orchestrator.with_progress(analysis_progress_bar());
    }

    let outcome = orchestrator.run(&plan).await?;
    let summary = outcome.summary.clone();
    let duration = start_time.elapsed().as_secs_f64();

    if let Some(ref report_path) = config.report.path {
        let report = RunReport {
            metadata: RunMetadata {
                started_at,
                data_dir: plan.data_dir.clone(),
                output_dir: plan.output_dir.clone(),
                plot_dir: plan.plot_dir.clone(),
                kfolds: plan.analysis.kfolds,
                seed_start: plan.analysis.seed_start,
                seed_step: plan.analysis.seed_step,
                statistic: plan.plot.statistic.clone(),
                duration_seconds: duration,
            },
            invocations: outcome.records,
            summary: summary.clone(),
        };
        report::write_report(&report, config.report.format, report_path)?;
        info!("Report written to {}", report_path.display());
    }

    println!("\n📊 Sweep Summary:");
    println!(
        "   Analyses: {} ({} failed)",
        summary.analysis_total, summary.analysis_failed
    );
    println!(
        "   Plot: {} over {} result files",
        if summary.plot_succeeded { "ok" } else { "failed" },
        summary.result_files
    );
    println!("   Duration: {:.1}s", duration);

    if summary.all_succeeded() {
        println!("\n✅ Sweep complete! Plots in: {}", plan.plot_dir.display());
    } else {
        warn!("Sweep finished with failures");
        eprintln!(
            "\n⛔ One or more invocations failed (exit code {}).",
            summary.exit_code
        );
    }

    Ok(summary.exit_code)
}

/// Handle --dry-run: list the invocations that would run, exit.
fn handle_dry_run(plan: &RunPlan) -> Result<i32> {
    println!("\n🔍 Dry run: nothing will be executed\n");

    let files = plan.scan_inputs()?;
    let analyses = plan.plan_analysis(&files, plan.seeds())?;

    if analyses.is_empty() {
        println!("   No input files match in {}.", plan.data_dir.display());
    } else {
        println!("   {} analysis invocations:\n", analyses.len());
        for invocation in &analyses {
            println!("     {}", invocation.command_line());
        }
    }

    let plot = plan.plot_invocation(&[]);
    println!("\n   Then one plot invocation:\n");
    println!(
        "     {} <result files in {}>",
        plot.command_line(),
        plan.output_dir.display()
    );

    println!("\n✅ Dry run complete. No processes were started.");
    Ok(0)
}

/// Progress bar over the analysis loop.
fn analysis_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Load configuration from file or use defaults.
///
/// A config file that exists but does not parse is an error, never a
/// silent fallback to defaults.
fn load_config(args: &Args, base_dir: &Path) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_from_dir(base_dir)? {
        Some(config) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}
