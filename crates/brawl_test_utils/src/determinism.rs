//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the combat world produces
//! identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! A scenario replayed with the same seed and the same input script must
//! end in the same state. Sources of non-determinism include:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Every system iterates in sorted entity ID order.
//!
//! - **System randomness**: Weapon spread draws from a `ChaCha8Rng`
//!   seeded by the world seed, never from the thread RNG.
//!
//! - **Wall-clock time**: The world only sees the `dt` it is handed.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual system determinism
//! 2. **Property tests**: Random input scripts must still replay exactly
//! 3. **Parallel tests**: Running N worlds on separate threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use brawl_core::world::{CombatWorld, PlayerIntent};
use serde::{Deserialize, Serialize};

use crate::fixtures::DT;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic world).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Combat world is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of ticks per run
/// * `setup` - Creates the initial state
/// * `step` - Advances the state by one tick
/// * `hash` - Computes the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a world twice with the same input script and compare final hashes.
///
/// # Example
///
/// ```
/// use brawl_test_utils::determinism::verify_world_determinism;
/// use brawl_test_utils::fixtures::{attack_every, duel};
///
/// let result = verify_world_determinism(|| duel(3).0, attack_every(20), 120);
/// result.assert_deterministic();
/// ```
pub fn verify_world_determinism<F, I>(setup_fn: F, input: I, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> CombatWorld,
    I: Fn(u64) -> PlayerIntent,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |world| step(world, &input),
        CombatWorld::state_hash,
    )
}

fn step(world: &mut CombatWorld, input: &impl Fn(u64) -> PlayerIntent) {
    world.apply_player_intent(input(world.tick_count()));
    world.tick(DT);
}

/// Result of parallel runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelRunResult {
    /// Final state hash from each world.
    pub hashes: Vec<u64>,
    /// Number of ticks each world ran.
    pub ticks: u64,
    /// Number of worlds run.
    pub num_worlds: usize,
}

impl ParallelRunResult {
    /// Check if all worlds produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all worlds matched.
    ///
    /// # Panics
    ///
    /// Panics if worlds produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel worlds diverged!\n\
                 Worlds: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_worlds,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run N worlds on scoped threads and collect final hashes.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_worlds<F, I>(
    setup_fn: F,
    input: I,
    num_worlds: usize,
    num_ticks: u64,
) -> ParallelRunResult
where
    F: Fn() -> CombatWorld + Sync,
    I: Fn(u64) -> PlayerIntent + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_worlds)
            .map(|_| {
                s.spawn(|| {
                    let mut world = setup_fn();
                    for _ in 0..num_ticks {
                        step(&mut world, &input);
                    }
                    world.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("world thread panicked"))
            .collect()
    });

    ParallelRunResult {
        hashes,
        ticks: num_ticks,
        num_worlds,
    }
}

/// Compare two runs tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs match, `Some(tick)` if they diverge at that tick.
pub fn find_first_divergence<F, I>(setup_fn: F, input: I, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> CombatWorld,
    I: Fn(u64) -> PlayerIntent,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        step(&mut a, &input);
        step(&mut b, &input);

        if a.state_hash() != b.state_hash() {
            tracing::warn!(tick, left = a.state_hash(), right = b.state_hash(), "worlds diverged");
            return Some(tick);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for combat testing.
pub mod strategies {
    use brawl_core::math::Vec2;
    use brawl_core::world::PlayerIntent;
    use proptest::prelude::*;

    /// Health values (1-1000).
    pub fn arb_health() -> impl Strategy<Value = u32> {
        1u32..1000u32
    }

    /// Damage values (0-200).
    pub fn arb_damage() -> impl Strategy<Value = u32> {
        0u32..200u32
    }

    /// Interleaved damage (`true`) and heal (`false`) amounts.
    pub fn arb_health_ops(max_len: usize) -> impl Strategy<Value = Vec<(bool, u32)>> {
        proptest::collection::vec((any::<bool>(), arb_damage()), 0..max_len)
    }

    /// Frame deltas between 1 ms and 50 ms.
    pub fn arb_frame_dt() -> impl Strategy<Value = f32> {
        (1u32..=50u32).prop_map(|ms| ms as f32 / 1000.0)
    }

    /// Position inside a 40 x 20 arena.
    pub fn arb_position() -> impl Strategy<Value = Vec2> {
        (-20i32..20, -10i32..10).prop_map(|(x, y)| Vec2::new(x as f32, y as f32))
    }

    /// Movement axis with each component in `[-1, 1]`.
    pub fn arb_move_axis() -> impl Strategy<Value = Vec2> {
        (-4i32..=4, -4i32..=4).prop_map(|(x, y)| Vec2::new(x as f32 / 4.0, y as f32 / 4.0))
    }

    /// One tick of player input. Pause is left out so scripts keep time
    /// moving.
    pub fn arb_intent() -> impl Strategy<Value = PlayerIntent> {
        (arb_move_axis(), any::<bool>(), prop::bool::weighted(0.1)).prop_map(
            |(move_axis, attack, interact)| PlayerIntent {
                move_axis,
                attack,
                interact,
                ..PlayerIntent::default()
            },
        )
    }

    /// Input script, one entry per tick.
    pub fn arb_intent_script(max_len: usize) -> impl Strategy<Value = Vec<PlayerIntent>> {
        proptest::collection::vec(arb_intent(), 1..max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{arena, attack_every, duel, empty_world, world_with_player};
    use proptest::prelude::*;

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_empty_world_determinism() {
        verify_world_determinism(|| empty_world(1), |_| PlayerIntent::default(), 100)
            .assert_deterministic();
    }

    #[test]
    fn test_duel_determinism() {
        verify_world_determinism(|| duel(11).0, attack_every(15), 600).assert_deterministic();
    }

    #[test]
    fn test_arena_determinism() {
        // Gunner spread draws from the seeded RNG, so the arena covers it.
        verify_world_determinism(|| arena(5).0, attack_every(12), 900).assert_deterministic();
    }

    #[test]
    fn test_find_divergence_on_deterministic_world() {
        assert_eq!(find_first_divergence(|| arena(2).0, attack_every(10), 300), None);
    }

    #[test]
    fn test_different_seeds_still_replay() {
        for seed in [0, 1, 99] {
            verify_world_determinism(|| arena(seed).0, attack_every(8), 300)
                .assert_deterministic();
        }
    }

    #[test]
    fn test_parallel_arena_worlds() {
        run_parallel_worlds(|| arena(8).0, attack_every(10), 4, 300).assert_deterministic();
    }

    #[test]
    fn test_compute_hash_is_stable() {
        assert_eq!(compute_hash(&(1u32, "x")), compute_hash(&(1u32, "x")));
    }

    proptest! {
        /// Any input script replays to the same state.
        #[test]
        fn prop_input_scripts_are_replayable(
            script in strategies::arb_intent_script(120),
        ) {
            let input = |tick: u64| {
                script
                    .get(tick as usize)
                    .copied()
                    .unwrap_or_default()
            };
            let result = verify_world_determinism(|| duel(4).0, input, 150);
            prop_assert!(result.is_deterministic);
        }

        /// Spawn position does not break replay.
        #[test]
        fn prop_spawn_positions_are_deterministic(
            position in strategies::arb_position(),
        ) {
            let setup = move || {
                let (mut world, _) = world_with_player(3);
                world
                    .spawn_template("grunt", position)
                    .expect("grunt template exists");
                world
            };
            let result = verify_world_determinism(setup, attack_every(10), 200);
            prop_assert!(result.is_deterministic);
        }
    }

    #[test]
    fn test_idle_world_hash_advances_with_tick() {
        let mut world = empty_world(1);
        let before = world.state_hash();
        world.tick(DT);
        assert_ne!(before, world.state_hash());
    }
}
