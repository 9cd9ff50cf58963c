//! Run metrics collection.
//!
//! Aggregates the per-tick event stream of a scenario run into numbers
//! useful for tuning: damage traded, kills, combo peaks, how much time was
//! spent dilated, and the final state hash for determinism checks.

use std::collections::BTreeMap;

use brawl_core::components::{ActorKind, EntityId};
use brawl_core::events::{ComboEvent, RoomEvent, TickEvents};
use serde::{Deserialize, Serialize};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Outcome {
    /// Tick limit reached with the player alive.
    #[default]
    Timeout,
    /// Every room cleared and no enemies left.
    Cleared,
    /// The player died.
    PlayerDied,
}

/// Complete metrics for a single run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Scenario name.
    pub scenario: String,
    /// Random seed used.
    pub seed: u64,
    /// Ticks simulated.
    pub duration_ticks: u64,
    /// How the run ended.
    pub outcome: Outcome,
    /// Hits landed by the player.
    pub hits_landed: u32,
    /// Hits the player received.
    pub hits_taken: u32,
    /// Damage dealt by the player.
    pub damage_dealt: u64,
    /// Damage the player received.
    pub damage_taken: u64,
    /// Deaths by actor kind.
    pub deaths: BTreeMap<String, u32>,
    /// Largest combo reached.
    pub best_combo: u32,
    /// Combos that ran out.
    pub combos_ended: u32,
    /// Final score.
    pub score: u64,
    /// Rooms cleared.
    pub rooms_cleared: u32,
    /// Waves spawned.
    pub waves_spawned: u32,
    /// Ticks spent with time scale below 1.
    pub dilated_ticks: u64,
    /// Lowest time scale seen.
    pub min_time_scale: f32,
    /// Host feedback commands emitted.
    pub feedback_commands: u64,
    /// Final simulation state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl RunMetrics {
    /// Create empty metrics for a run.
    #[must_use]
    pub fn new(scenario: impl Into<String>, seed: u64) -> Self {
        Self {
            scenario: scenario.into(),
            seed,
            min_time_scale: 1.0,
            ..Default::default()
        }
    }

    /// Enemies killed.
    #[must_use]
    pub fn enemies_killed(&self) -> u32 {
        self.deaths.get(kind_name(ActorKind::Enemy)).copied().unwrap_or(0)
    }
}

fn kind_name(kind: ActorKind) -> &'static str {
    match kind {
        ActorKind::Player => "player",
        ActorKind::Enemy => "enemy",
        ActorKind::Projectile => "projectile",
        ActorKind::Prop => "prop",
    }
}

/// Folds tick events into [`RunMetrics`].
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    metrics: RunMetrics,
    player: Option<EntityId>,
}

impl MetricsCollector {
    /// Start collecting for a run.
    #[must_use]
    pub fn new(scenario: impl Into<String>, seed: u64, player: Option<EntityId>) -> Self {
        Self {
            metrics: RunMetrics::new(scenario, seed),
            player,
        }
    }

    /// Metrics so far.
    #[must_use]
    pub const fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    /// Fold one tick's events.
    pub fn record(&mut self, events: &TickEvents) {
        let m = &mut self.metrics;
        m.duration_ticks += 1;

        for hit in &events.hits {
            if Some(hit.attacker) == self.player {
                m.hits_landed += 1;
                m.damage_dealt += u64::from(hit.damage);
            }
            if Some(hit.target) == self.player {
                m.hits_taken += 1;
            }
        }
        for damage in &events.damage {
            if Some(damage.entity) == self.player {
                m.damage_taken += u64::from(damage.amount);
            }
        }
        for death in &events.deaths {
            *m.deaths.entry(kind_name(death.kind).to_string()).or_insert(0) += 1;
        }
        for combo in &events.combo {
            m.best_combo = m.best_combo.max(combo.count());
            if matches!(combo, ComboEvent::Ended { .. }) {
                m.combos_ended += 1;
            }
        }
        for room in &events.rooms {
            match room {
                RoomEvent::Cleared(_) => m.rooms_cleared += 1,
                RoomEvent::WaveSpawned { .. } => m.waves_spawned += 1,
                RoomEvent::Activated(_) => {}
            }
        }
        if events.time_scale < 1.0 {
            m.dilated_ticks += 1;
        }
        m.min_time_scale = m.min_time_scale.min(events.time_scale);
        m.feedback_commands += events.feedback.len() as u64;
    }

    /// Finish the run.
    #[must_use]
    pub fn finish(mut self, outcome: Outcome, score: u64, state_hash: u64) -> RunMetrics {
        self.metrics.outcome = outcome;
        self.metrics.score = score;
        self.metrics.final_state_hash = state_hash;
        self.metrics
    }
}

/// Aggregate over many runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Runs summarised.
    pub runs: u32,
    /// Fraction of runs the player survived (0.0 to 1.0).
    pub survival_rate: f64,
    /// Fraction of runs that cleared every room.
    pub clear_rate: f64,
    /// Mean run length in ticks.
    pub avg_ticks: f64,
    /// Mean final score.
    pub avg_score: f64,
    /// Mean best combo.
    pub avg_best_combo: f64,
    /// Mean damage the player received.
    pub avg_damage_taken: f64,
    /// Mean enemies killed.
    pub avg_enemies_killed: f64,
}

impl BatchSummary {
    /// Summarise a set of runs.
    #[must_use]
    pub fn from_runs(runs: &[RunMetrics]) -> Self {
        if runs.is_empty() {
            return Self::default();
        }
        let n = runs.len() as f64;
        let mean = |f: &dyn Fn(&RunMetrics) -> f64| runs.iter().map(f).sum::<f64>() / n;
        Self {
            runs: runs.len() as u32,
            survival_rate: mean(&|r| f64::from(u8::from(r.outcome != Outcome::PlayerDied))),
            clear_rate: mean(&|r| f64::from(u8::from(r.outcome == Outcome::Cleared))),
            avg_ticks: mean(&|r| r.duration_ticks as f64),
            avg_score: mean(&|r| r.score as f64),
            avg_best_combo: mean(&|r| f64::from(r.best_combo)),
            avg_damage_taken: mean(&|r| r.damage_taken as f64),
            avg_enemies_killed: mean(&|r| f64::from(r.enemies_killed())),
        }
    }
}
