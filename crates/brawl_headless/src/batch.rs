//! Batch scenario runner for tuning.
//!
//! Runs one scenario over many consecutive seeds in parallel using rayon
//! and aggregates the results.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use brawl_core::config::CombatConfig;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metrics::{BatchSummary, RunMetrics};
use crate::runner::ScenarioRunner;
use crate::scenario::Scenario;

/// Configuration for a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario preset name or path
    pub scenario: String,
    /// Number of runs
    pub run_count: u32,
    /// Worker threads (0 = rayon default)
    pub parallel_runs: u32,
    /// Output directory for results
    pub output_dir: PathBuf,
    /// First seed; run `i` uses `seed_start + i`
    pub seed_start: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: "gauntlet".to_string(),
            run_count: 100,
            parallel_runs: 0,
            output_dir: PathBuf::from("results"),
            seed_start: 0,
        }
    }
}

impl BatchConfig {
    /// Create config for a specific scenario
    pub fn new(scenario: &str, run_count: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            run_count,
            ..Default::default()
        }
    }

    /// Set output directory
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }
}

/// Error during batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Run index
    pub run_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual run metrics, in seed order
    pub runs: Vec<RunMetrics>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

fn run_one(scenario: &Scenario, config: &CombatConfig, seed: u64) -> Result<RunMetrics, String> {
    ScenarioRunner::new(scenario.clone(), config.clone(), seed)
        .map(ScenarioRunner::run)
        .map_err(|e| e.to_string())
}

/// Run a batch of seeds.
pub fn run_batch(batch: BatchConfig, scenario: &Scenario, config: &CombatConfig) -> BatchResults {
    let start = Instant::now();
    let completed = AtomicU32::new(0);

    info!(
        runs = batch.run_count,
        scenario = %scenario.name,
        seed_start = batch.seed_start,
        "Starting batch run"
    );

    let run_all = || -> Vec<Result<RunMetrics, BatchError>> {
        (0..batch.run_count)
            .into_par_iter()
            .map(|i| {
                let seed = batch.seed_start.wrapping_add(u64::from(i));
                let result = run_one(scenario, config, seed).map_err(|message| {
                    warn!(run = i, seed, error = %message, "Run failed");
                    BatchError {
                        run_index: i,
                        seed,
                        message,
                    }
                });
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if done % 10 == 0 {
                    debug!("Progress: {}/{}", done, batch.run_count);
                }
                result
            })
            .collect()
    };

    let results = if batch.parallel_runs > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(batch.parallel_runs as usize)
            .build()
        {
            Ok(pool) => pool.install(run_all),
            Err(e) => {
                warn!(error = %e, "Thread pool unavailable; using the global pool");
                run_all()
            }
        }
    } else {
        run_all()
    };

    let (runs, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let runs: Vec<RunMetrics> = runs.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_runs(&runs);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} runs in {:.1}s ({:.1} runs/sec)",
        runs.len(),
        duration_seconds,
        runs.len() as f64 / duration_seconds.max(0.001)
    );

    BatchResults {
        config: batch,
        runs,
        summary,
        duration_seconds,
        errors,
    }
}
