//! Headless combat runner.
//!
//! Runs combat scenarios without graphics and prints JSON results.
//! Designed for CI testing, tuning and determinism verification.
//!
//! # Usage
//!
//! ```bash
//! # Run a single scenario
//! cargo run -p brawl_headless -- run --scenario duel
//!
//! # Run batch over many seeds
//! cargo run -p brawl_headless -- batch --scenario gauntlet --count 1000 --output results/
//!
//! # Verify determinism
//! cargo run -p brawl_headless -- verify --scenario gauntlet --seed 42 --runs 5
//!
//! # Validate a config file
//! cargo run -p brawl_headless -- validate tuning.ron
//! ```
//!
//! Output (stdout): JSON
//! Logs (stderr): Debug information

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use brawl_core::config::CombatConfig;
use brawl_headless::{
    batch::{run_batch, BatchConfig},
    runner::{verify, ScenarioRunner},
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "brawl_headless")]
#[command(about = "Headless combat runner for scenario testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file overriding the scenario's config
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single scenario
    Run {
        /// Preset name (duel, gauntlet) or scenario file
        #[arg(short, long, default_value = "duel")]
        scenario: String,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Override the scenario's tick limit
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Run a batch of seeds for tuning
    Batch {
        /// Preset name (duel, gauntlet) or scenario file
        #[arg(short, long, default_value = "gauntlet")]
        scenario: String,

        /// Number of runs
        #[arg(short = 'n', long, default_value = "100")]
        count: u32,

        /// Worker threads (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Verify determinism by running the same seed several times
    Verify {
        /// Preset name (duel, gauntlet) or scenario file
        #[arg(short, long, default_value = "gauntlet")]
        scenario: String,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "3")]
        runs: u32,
    },

    /// Validate config files
    Validate {
        /// Config files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for JSON
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let override_config = match cli.config.as_ref().map(CombatConfig::load).transpose() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load config");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Run {
            scenario,
            seed,
            ticks,
        } => cmd_run(&scenario, seed, ticks, override_config.as_ref()),
        Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
        } => cmd_batch(&scenario, count, parallel, output, seed, override_config.as_ref()),
        Commands::Verify {
            scenario,
            seed,
            runs,
        } => cmd_verify(&scenario, seed, runs, override_config.as_ref()),
        Commands::Validate { files } => cmd_validate(&files),
    };

    match result {
        Ok(code) => code,
        Err(message) => {
            tracing::error!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn load_scenario(name: &str, override_config: Option<&CombatConfig>) -> Result<(Scenario, CombatConfig), String> {
    let scenario = Scenario::resolve(name).map_err(|e| e.to_string())?;
    let config = scenario.combat_config(override_config);
    config.validate().map_err(|e| e.to_string())?;
    Ok((scenario, config))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

/// Run a single scenario
fn cmd_run(
    name: &str,
    seed: u64,
    ticks: Option<u64>,
    override_config: Option<&CombatConfig>,
) -> Result<ExitCode, String> {
    let (mut scenario, config) = load_scenario(name, override_config)?;
    if let Some(ticks) = ticks {
        scenario.max_ticks = ticks;
    }
    tracing::info!(scenario = %scenario.name, seed, max_ticks = scenario.max_ticks, "Starting run");

    let metrics = ScenarioRunner::new(scenario, config, seed)
        .map_err(|e| e.to_string())?
        .run();
    print_json(&metrics)?;
    Ok(ExitCode::SUCCESS)
}

/// Run batch of seeds
fn cmd_batch(
    name: &str,
    count: u32,
    parallel: u32,
    output: PathBuf,
    seed: u64,
    override_config: Option<&CombatConfig>,
) -> Result<ExitCode, String> {
    let (scenario, config) = load_scenario(name, override_config)?;

    std::fs::create_dir_all(&output)
        .map_err(|e| format!("Cannot create output directory '{}': {e}", output.display()))?;

    let batch = BatchConfig {
        scenario: name.to_string(),
        run_count: count,
        parallel_runs: parallel,
        output_dir: output.clone(),
        seed_start: seed,
    };
    let results = run_batch(batch, &scenario, &config);

    let results_path = output.join("batch_results.json");
    results
        .save(&results_path)
        .map_err(|e| format!("Failed to save results: {e}"))?;

    tracing::info!(
        runs = results.runs.len(),
        failed = results.errors.len(),
        survival_rate = results.summary.survival_rate,
        clear_rate = results.summary.clear_rate,
        path = %results_path.display(),
        "Results saved"
    );
    for error in results.errors.iter().take(10) {
        tracing::warn!(run = error.run_index, seed = error.seed, "{}", error.message);
    }

    print_json(&results.summary)?;
    Ok(if results.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Verify determinism
fn cmd_verify(
    name: &str,
    seed: u64,
    runs: u32,
    override_config: Option<&CombatConfig>,
) -> Result<ExitCode, String> {
    let (scenario, config) = load_scenario(name, override_config)?;
    let report = verify(&scenario, &config, seed, runs.max(2)).map_err(|e| e.to_string())?;
    print_json(&report)?;
    if report.deterministic {
        tracing::info!(scenario = %report.scenario, seed, "Deterministic");
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!(scenario = %report.scenario, seed, hashes = ?report.hashes, "Runs diverged");
        Ok(ExitCode::FAILURE)
    }
}

/// Validate config files
fn cmd_validate(files: &[PathBuf]) -> Result<ExitCode, String> {
    let mut failures = 0;
    for file in files {
        match CombatConfig::load(file) {
            Ok(config) => {
                tracing::info!(path = %file.display(), templates = config.templates.len(), "Config valid");
            }
            Err(e) => {
                failures += 1;
                tracing::error!(path = %file.display(), error = %e, "Config invalid");
            }
        }
    }
    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
