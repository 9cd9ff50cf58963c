//! Fixed-step scenario runner.
//!
//! Drives a [`CombatWorld`] at 60 ticks per second with the scenario's
//! scripted input until the player dies, every room is cleared or the tick
//! limit is reached.

use brawl_core::components::ActorKind;
use brawl_core::config::CombatConfig;
use brawl_core::events::TickEvents;
use brawl_core::spawner::RoomState;
use brawl_core::world::CombatWorld;
use serde::{Deserialize, Serialize};

use crate::metrics::{MetricsCollector, Outcome, RunMetrics};
use crate::scenario::{Scenario, ScenarioError};

/// Simulation rate of headless runs.
pub const TICKS_PER_SECOND: u32 = 60;

/// Frame time handed to the world each tick.
pub const TICK_DT: f32 = 1.0 / TICKS_PER_SECOND as f32;

/// Runs one scenario with one seed.
#[derive(Debug)]
pub struct ScenarioRunner {
    scenario: Scenario,
    world: CombatWorld,
    collector: MetricsCollector,
}

impl ScenarioRunner {
    /// Build the scenario's world.
    pub fn new(scenario: Scenario, config: CombatConfig, seed: u64) -> Result<Self, ScenarioError> {
        let world = scenario.build_world(config, seed)?;
        let collector = MetricsCollector::new(scenario.name.clone(), seed, world.player());
        Ok(Self {
            scenario,
            world,
            collector,
        })
    }

    /// The world being driven.
    #[must_use]
    pub const fn world(&self) -> &CombatWorld {
        &self.world
    }

    /// Metrics collected so far.
    #[must_use]
    pub const fn metrics(&self) -> &RunMetrics {
        self.collector.metrics()
    }

    /// Advance one tick with the scripted input.
    pub fn step(&mut self) -> TickEvents {
        let intent = self.scenario.input.intent_at(self.world.tick_count());
        self.world.apply_player_intent(intent);
        let events = self.world.tick(TICK_DT);
        self.collector.record(&events);
        events
    }

    /// How the run stands right now, or `None` while it should continue.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        let player_dead = self
            .world
            .player()
            .and_then(|p| self.world.get(p))
            .map_or(true, |p| p.is_dead());
        if player_dead {
            return Some(Outcome::PlayerDied);
        }

        let rooms_done = self
            .world
            .rooms()
            .iter()
            .all(|r| r.state() == RoomState::Cleared);
        let has_content = !self.world.rooms().is_empty() || !self.scenario.actors.is_empty();
        if has_content && rooms_done && self.world.count_alive(ActorKind::Enemy) == 0 {
            return Some(Outcome::Cleared);
        }

        if self.world.tick_count() >= self.scenario.max_ticks {
            return Some(Outcome::Timeout);
        }
        None
    }

    /// Run to completion and return the metrics.
    pub fn run(mut self) -> RunMetrics {
        let outcome = loop {
            if let Some(outcome) = self.outcome() {
                break outcome;
            }
            self.step();
        };
        tracing::info!(
            scenario = %self.scenario.name,
            seed = self.world.seed(),
            ticks = self.world.tick_count(),
            ?outcome,
            score = self.world.score().total(),
            "Run finished"
        );
        let score = self.world.score().total();
        let hash = self.world.state_hash();
        self.collector.finish(outcome, score, hash)
    }
}

/// Result of running one seed several times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Scenario name.
    pub scenario: String,
    /// Seed verified.
    pub seed: u64,
    /// Final hash per run.
    pub hashes: Vec<u64>,
    /// Ticks per run.
    pub ticks: Vec<u64>,
    /// Whether every run matched.
    pub deterministic: bool,
}

/// Run the same scenario and seed `runs` times and compare final hashes.
pub fn verify(
    scenario: &Scenario,
    config: &CombatConfig,
    seed: u64,
    runs: u32,
) -> Result<VerifyReport, ScenarioError> {
    let mut hashes = Vec::with_capacity(runs as usize);
    let mut ticks = Vec::with_capacity(runs as usize);
    for run in 0..runs {
        let metrics = ScenarioRunner::new(scenario.clone(), config.clone(), seed)?.run();
        tracing::debug!(run, hash = metrics.final_state_hash, "Verification run");
        hashes.push(metrics.final_state_hash);
        ticks.push(metrics.duration_ticks);
    }
    let deterministic = hashes.windows(2).all(|w| w[0] == w[1]) && ticks.windows(2).all(|w| w[0] == w[1]);
    Ok(VerifyReport {
        scenario: scenario.name.clone(),
        seed,
        hashes,
        ticks,
        deterministic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_scenario_times_out() {
        let scenario = Scenario {
            max_ticks: 30,
            ..Scenario::default()
        };
        let metrics = ScenarioRunner::new(scenario, CombatConfig::default(), 0)
            .unwrap()
            .run();
        assert_eq!(metrics.outcome, Outcome::Timeout);
        assert_eq!(metrics.duration_ticks, 30);
    }

    #[test]
    fn test_duel_player_fights() {
        let scenario = Scenario::duel();
        let config = scenario.combat_config(None);
        let metrics = ScenarioRunner::new(scenario, config, 3).unwrap().run();
        assert!(metrics.hits_landed > 0, "player should land hits: {metrics:?}");
        assert!(metrics.damage_dealt > 0);
        assert!(metrics.best_combo >= 1);
    }

    #[test]
    fn test_verify_duel() {
        let scenario = Scenario::duel();
        let report = verify(&scenario, &CombatConfig::default(), 9, 3).unwrap();
        assert!(report.deterministic, "{report:?}");
        assert_eq!(report.hashes.len(), 3);
    }

    #[test]
    fn test_gauntlet_spawns_waves() {
        let scenario = Scenario {
            max_ticks: 60 * 5,
            ..Scenario::gauntlet()
        };
        let metrics = ScenarioRunner::new(scenario, CombatConfig::default(), 1)
            .unwrap()
            .run();
        assert!(metrics.waves_spawned >= 1, "{metrics:?}");
    }
}
