//! Headless combat runner for scenario testing and CI verification.
//!
//! Drives `brawl_core` without a renderer or audio. This enables:
//!
//! - **Scenario runs**: Play a scripted scenario and report metrics as JSON
//! - **Batch tuning**: Run one scenario over many seeds in parallel
//! - **Determinism checks**: Replay the same seed and compare state hashes
//! - **Config validation**: Reject broken tuning files before they ship
//!
//! # Output
//!
//! - **stdout**: JSON results
//! - **stderr**: Logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! # Run a preset scenario
//! cargo run -p brawl_headless -- run --scenario gauntlet --seed 7
//!
//! # Run a batch of 500 seeds
//! cargo run -p brawl_headless -- batch --scenario gauntlet --count 500 --output results/
//!
//! # Verify determinism
//! cargo run -p brawl_headless -- verify --scenario duel --runs 5
//! ```

pub mod batch;
pub mod metrics;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, BatchConfig, BatchResults};
pub use metrics::{BatchSummary, MetricsCollector, Outcome, RunMetrics};
pub use runner::{verify, ScenarioRunner, VerifyReport};
pub use scenario::{InputScript, Scenario, ScenarioError};
