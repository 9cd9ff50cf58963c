//! Health pools and the damage/death state machine.
//!
//! A [`HealthPool`] is the only place an actor's hit points change.
//! `current` always stays in `[0, max]`, and the dead latch only ever moves
//! from alive to dead. Death side effects are keyed off the first
//! transition reported by [`HealthPool::die`], so calling it again on a dead
//! actor is harmless.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// Result of a damage application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DamageOutcome {
    /// The pool was already dead; nothing changed.
    AlreadyDead,
    /// The pool is inside its post-hit invulnerability window.
    Invulnerable,
    /// Damage was applied.
    Applied {
        /// Hit points actually removed.
        applied: u32,
        /// Hit points left.
        remaining: u32,
        /// This hit caused the alive-to-dead transition.
        killed: bool,
        /// Direction the hit came from.
        direction: Vec2,
    },
}

impl DamageOutcome {
    /// Whether this hit was the killing blow.
    #[must_use]
    pub const fn killed(&self) -> bool {
        matches!(self, Self::Applied { killed: true, .. })
    }

    /// Hit points removed by this hit.
    #[must_use]
    pub const fn applied(&self) -> u32 {
        match *self {
            Self::Applied { applied, .. } => applied,
            _ => 0,
        }
    }
}

/// What changed during a [`HealthPool::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthTick {
    /// Hit points regenerated this tick.
    pub healed: u32,
    /// The hurt flash ended this tick and the tint should be restored.
    pub flash_ended: bool,
}

/// Capability of anything that can be hurt, healed and killed.
pub trait Damageable {
    /// Remove `amount` hit points, killing at zero.
    fn take_damage(&mut self, amount: u32, direction: Vec2) -> DamageOutcome;
    /// Restore up to `amount` hit points. Returns the amount restored.
    fn add_health(&mut self, amount: u32) -> u32;
    /// Force the dead state. Returns `true` only on the first transition.
    fn die(&mut self) -> bool;
    /// Whether the dead latch is set.
    fn is_dead(&self) -> bool;
}

/// Per-actor mutable health pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthPool {
    current: u32,
    max: u32,
    dead: bool,
    /// Hit points regenerated per second while alive.
    pub regen_per_second: f32,
    /// Seconds after the last damage before regeneration starts.
    pub regen_delay: f32,
    /// Seconds of invulnerability granted after each applied hit.
    pub invulnerability: f32,
    /// Seconds the hurt flash lasts.
    pub flash_duration: f32,
    since_damage: f32,
    regen_accumulator: f32,
    flash_remaining: f32,
    invulnerable_remaining: f32,
}

impl HealthPool {
    /// Create a full pool with no regeneration.
    #[must_use]
    pub fn new(max: u32) -> Self {
        Self {
            current: max,
            max,
            dead: max == 0,
            regen_per_second: 0.0,
            regen_delay: 0.0,
            invulnerability: 0.0,
            flash_duration: 0.1,
            since_damage: 0.0,
            regen_accumulator: 0.0,
            flash_remaining: 0.0,
            invulnerable_remaining: 0.0,
        }
    }

    /// Builder: regenerate `per_second` after `delay` seconds without damage.
    #[must_use]
    pub fn with_regen(mut self, per_second: f32, delay: f32) -> Self {
        self.regen_per_second = per_second.max(0.0);
        self.regen_delay = delay.max(0.0);
        self
    }

    /// Builder: grant `seconds` of invulnerability after each hit.
    #[must_use]
    pub fn with_invulnerability(mut self, seconds: f32) -> Self {
        self.invulnerability = seconds.max(0.0);
        self
    }

    /// Current hit points.
    #[must_use]
    pub const fn current(&self) -> u32 {
        self.current
    }

    /// Maximum hit points.
    #[must_use]
    pub const fn max(&self) -> u32 {
        self.max
    }

    /// Health as a fraction of max (0.0..=1.0).
    #[must_use]
    pub fn fraction(&self) -> f32 {
        if self.max == 0 {
            0.0
        } else {
            self.current as f32 / self.max as f32
        }
    }

    /// Whether the pool is below max.
    #[must_use]
    pub const fn is_injured(&self) -> bool {
        !self.dead && self.current < self.max
    }

    /// Whether the hurt flash is showing.
    #[must_use]
    pub fn is_flashing(&self) -> bool {
        self.flash_remaining > 0.0
    }

    /// Advance regeneration and feedback timers by `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> HealthTick {
        let mut result = HealthTick::default();

        if self.flash_remaining > 0.0 {
            self.flash_remaining -= dt;
            if self.flash_remaining <= 0.0 {
                self.flash_remaining = 0.0;
                result.flash_ended = true;
            }
        }
        self.invulnerable_remaining = (self.invulnerable_remaining - dt).max(0.0);

        if self.dead {
            return result;
        }

        self.since_damage += dt;
        result.healed = self.regenerate(dt);
        result
    }

    /// Regenerate hit points if the post-damage delay has elapsed.
    pub fn regenerate(&mut self, dt: f32) -> u32 {
        if self.dead || self.regen_per_second <= 0.0 || self.since_damage < self.regen_delay {
            return 0;
        }
        if self.current >= self.max {
            self.regen_accumulator = 0.0;
            return 0;
        }

        self.regen_accumulator += self.regen_per_second * dt;
        let whole = self.regen_accumulator.floor();
        if whole < 1.0 {
            return 0;
        }
        self.regen_accumulator -= whole;
        self.add_health(whole as u32)
    }
}

impl Damageable for HealthPool {
    fn take_damage(&mut self, amount: u32, direction: Vec2) -> DamageOutcome {
        if self.dead {
            return DamageOutcome::AlreadyDead;
        }
        if self.invulnerable_remaining > 0.0 {
            return DamageOutcome::Invulnerable;
        }

        let applied = amount.min(self.current);
        self.current -= applied;
        self.since_damage = 0.0;
        self.regen_accumulator = 0.0;
        self.flash_remaining = self.flash_duration;
        self.invulnerable_remaining = self.invulnerability;

        let killed = self.current == 0 && self.die();

        DamageOutcome::Applied {
            applied,
            remaining: self.current,
            killed,
            direction,
        }
    }

    fn add_health(&mut self, amount: u32) -> u32 {
        if self.dead {
            return 0;
        }
        let headroom = self.max - self.current;
        let actual = amount.min(headroom);
        self.current += actual;
        actual
    }

    fn die(&mut self) -> bool {
        let first = !self.dead;
        self.dead = true;
        self.current = 0;
        first
    }

    fn is_dead(&self) -> bool {
        self.dead
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_then_overkill() {
        let mut pool = HealthPool::new(100);

        let first = pool.take_damage(25, Vec2::RIGHT);
        assert_eq!(pool.current(), 75);
        assert!(!pool.is_dead());
        assert!(!first.killed());

        let second = pool.take_damage(100, Vec2::RIGHT);
        assert_eq!(pool.current(), 0);
        assert!(pool.is_dead());
        assert!(second.killed());
        assert_eq!(second.applied(), 75);
    }

    #[test]
    fn test_damage_after_death_is_noop() {
        let mut pool = HealthPool::new(10);
        pool.take_damage(10, Vec2::ZERO);
        assert_eq!(pool.take_damage(5, Vec2::ZERO), DamageOutcome::AlreadyDead);
        assert_eq!(pool.current(), 0);
    }

    #[test]
    fn test_die_reports_first_transition_only() {
        let mut pool = HealthPool::new(10);
        assert!(pool.die());
        assert!(!pool.die());
        assert!(!pool.die());
        assert!(pool.is_dead());
        assert_eq!(pool.current(), 0);
    }

    #[test]
    fn test_add_health_clamps_and_never_revives() {
        let mut pool = HealthPool::new(50);
        pool.take_damage(20, Vec2::ZERO);
        assert_eq!(pool.add_health(100), 20);
        assert_eq!(pool.current(), 50);

        pool.die();
        assert_eq!(pool.add_health(10), 0);
        assert!(pool.is_dead());
    }

    #[test]
    fn test_zero_damage_does_not_kill() {
        let mut pool = HealthPool::new(1);
        let outcome = pool.take_damage(0, Vec2::ZERO);
        assert!(!outcome.killed());
        assert!(!pool.is_dead());
    }

    #[test]
    fn test_invulnerability_window() {
        let mut pool = HealthPool::new(100).with_invulnerability(0.5);
        pool.take_damage(10, Vec2::ZERO);
        assert_eq!(pool.take_damage(10, Vec2::ZERO), DamageOutcome::Invulnerable);
        pool.tick(0.6);
        assert_eq!(pool.take_damage(10, Vec2::ZERO).applied(), 10);
        assert_eq!(pool.current(), 80);
    }

    #[test]
    fn test_regen_waits_for_delay() {
        let mut pool = HealthPool::new(100).with_regen(10.0, 1.0);
        pool.take_damage(30, Vec2::ZERO);

        assert_eq!(pool.tick(0.5).healed, 0);
        let mut healed = 0;
        for _ in 0..15 {
            healed += pool.tick(0.1).healed;
        }
        assert!((8..=11).contains(&healed), "healed {healed}");
    }

    #[test]
    fn test_flash_ends() {
        let mut pool = HealthPool::new(10);
        pool.take_damage(1, Vec2::ZERO);
        assert!(pool.is_flashing());
        assert!(!pool.tick(0.05).flash_ended);
        assert!(pool.tick(0.06).flash_ended);
        assert!(!pool.is_flashing());
    }

    #[test]
    fn test_zero_max_starts_dead() {
        let pool = HealthPool::new(0);
        assert!(pool.is_dead());
    }
}
