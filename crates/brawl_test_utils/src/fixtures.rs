//! Test fixtures and helpers.
//!
//! Pre-built combat worlds and actors for consistent testing.

use brawl_core::components::{Actor, ActorKind, EntityId, Faction, LayerMask};
use brawl_core::config::CombatConfig;
use brawl_core::health::HealthPool;
use brawl_core::math::Vec2;
use brawl_core::spawner::{Room, Wave, WaveEntry};
use brawl_core::world::{CombatWorld, PlayerIntent};

/// Fixed frame time used by fixtures (60 Hz).
pub const DT: f32 = 1.0 / 60.0;

/// Empty world with the default config.
///
/// # Panics
///
/// Panics if the default config stops validating.
#[must_use]
pub fn empty_world(seed: u64) -> CombatWorld {
    CombatWorld::new(CombatConfig::default(), seed).expect("default config must validate")
}

/// World with the player at the origin.
///
/// # Panics
///
/// Panics if the default config has no player template.
#[must_use]
pub fn world_with_player(seed: u64) -> (CombatWorld, EntityId) {
    let mut world = empty_world(seed);
    let player = world
        .spawn_player(Vec2::ZERO)
        .expect("default config must have a player template");
    (world, player)
}

/// Player facing a single grunt three units to the right.
///
/// # Panics
///
/// Panics if the default templates are missing.
#[must_use]
pub fn duel(seed: u64) -> (CombatWorld, EntityId, EntityId) {
    let (mut world, player) = world_with_player(seed);
    let grunt = world
        .spawn_template("grunt", Vec2::new(3.0, 0.0))
        .expect("default config must have a grunt template");
    (world, player, grunt)
}

/// Player standing inside a room with two waves (two grunts, then a gunner
/// and a drone).
///
/// # Panics
///
/// Panics if the default templates are missing.
#[must_use]
pub fn arena(seed: u64) -> (CombatWorld, EntityId, usize) {
    let (mut world, player) = world_with_player(seed);
    let entry = |template: &str, x: f32| WaveEntry {
        template: template.to_string(),
        position: Vec2::new(x, 0.0),
    };
    let room = world.add_room(Room::new(
        "arena",
        Vec2::new(-10.0, -5.0),
        Vec2::new(10.0, 5.0),
        vec![
            Wave {
                delay: 0.25,
                entries: vec![entry("grunt", 4.0), entry("grunt", -4.0)],
            },
            Wave {
                delay: 0.5,
                entries: vec![entry("gunner", 6.0), entry("drone", -6.0)],
            },
        ],
    ));
    (world, player, room)
}

/// Hostile punching bag with health and a sprite but no brain.
pub fn spawn_dummy(world: &mut CombatWorld, position: Vec2, max_health: u32) -> EntityId {
    world.spawn_actor(
        Actor::new(ActorKind::Enemy, position)
            .with_faction(Faction::Enemy, LayerMask::ENEMY)
            .with_health(HealthPool::new(max_health))
            .with_sprite(),
    )
}

/// Scripted input: walk right and swing every `period` ticks.
#[must_use]
pub fn attack_every(period: u64) -> impl Fn(u64) -> PlayerIntent + Clone {
    move |tick| PlayerIntent {
        move_axis: Vec2::new(0.25, 0.0),
        attack: period > 0 && tick % period == 0,
        ..PlayerIntent::default()
    }
}

/// Run `ticks` frames feeding `input` each tick.
pub fn run_scripted(world: &mut CombatWorld, ticks: u64, input: impl Fn(u64) -> PlayerIntent) {
    for _ in 0..ticks {
        world.apply_player_intent(input(world.tick_count()));
        world.tick(DT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duel_layout() {
        let (world, player, grunt) = duel(1);
        assert_eq!(world.player(), Some(player));
        assert!(world.get(grunt).is_some_and(|g| g.enemy.is_some()));
        assert_eq!(world.count_alive(ActorKind::Enemy), 1);
    }

    #[test]
    fn test_attack_script() {
        let script = attack_every(10);
        assert!(script(0).attack);
        assert!(!script(5).attack);
        assert!(script(20).attack);
        assert!(!attack_every(0)(0).attack);
    }
}
