//! Movement capability shared by the player and enemies.
//!
//! [`Locomotion`] turns a desired direction into a velocity. A stun blocks
//! input for a fixed time without touching health; a lunge overrides the
//! desired velocity until it is ended.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// Knockback velocity lost per second.
pub const KNOCKBACK_FRICTION: f32 = 8.0;

/// Anything that can be steered.
pub trait Mover {
    /// Velocity this mover wants for a steering `direction`.
    fn desired_velocity(&self, direction: Vec2) -> Vec2;
    /// Block steering input for `seconds`. A longer stun extends the
    /// current one; a shorter one does nothing.
    fn apply_stun(&mut self, seconds: f32);
    /// Whether steering input is blocked.
    fn is_stunned(&self) -> bool;
}

/// Per-actor movement state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locomotion {
    /// Base speed in units per second.
    pub move_speed: f32,
    /// Multiplier from momentum or status effects.
    pub speed_multiplier: f32,
    /// Ignores the ground (drones).
    pub flying: bool,
    stun_remaining: f32,
    lunge: Option<Vec2>,
    knockback: Vec2,
}

impl Locomotion {
    /// Create an unstunned mover.
    #[must_use]
    pub fn new(move_speed: f32, flying: bool) -> Self {
        Self {
            move_speed,
            speed_multiplier: 1.0,
            flying,
            stun_remaining: 0.0,
            lunge: None,
            knockback: Vec2::ZERO,
        }
    }

    /// Seconds of stun left.
    #[must_use]
    pub const fn stun_remaining(&self) -> f32 {
        self.stun_remaining
    }

    /// Override steering with a fixed velocity.
    pub fn start_lunge(&mut self, velocity: Vec2) {
        if velocity.is_finite() {
            self.lunge = Some(velocity);
        }
    }

    /// Return to normal steering.
    pub fn end_lunge(&mut self) {
        self.lunge = None;
    }

    /// Active lunge velocity.
    #[must_use]
    pub const fn lunge(&self) -> Option<Vec2> {
        self.lunge
    }

    /// Add a knockback impulse.
    pub fn push(&mut self, impulse: Vec2) {
        if impulse.is_finite() {
            self.knockback += impulse;
        }
    }

    /// Remaining knockback velocity.
    #[must_use]
    pub const fn knockback(&self) -> Vec2 {
        self.knockback
    }

    /// Velocity for this tick given a steering direction.
    #[must_use]
    pub fn velocity(&self, direction: Vec2) -> Vec2 {
        let steering = match self.lunge {
            Some(lunge) => lunge,
            None if self.is_stunned() => Vec2::ZERO,
            None => self.desired_velocity(direction),
        };
        steering + self.knockback
    }

    /// Count down stun and bleed off knockback. Returns `true` when a stun
    /// ended this tick.
    pub fn tick(&mut self, dt: f32) -> bool {
        let decay = (1.0 - KNOCKBACK_FRICTION * dt).max(0.0);
        self.knockback = self.knockback * decay;
        if self.knockback.length_squared() < 1e-4 {
            self.knockback = Vec2::ZERO;
        }

        if self.stun_remaining > 0.0 {
            self.stun_remaining -= dt;
            if self.stun_remaining <= 0.0 {
                self.stun_remaining = 0.0;
                return true;
            }
        }
        false
    }
}

impl Mover for Locomotion {
    fn desired_velocity(&self, direction: Vec2) -> Vec2 {
        direction.normalize_or_zero() * (self.move_speed * self.speed_multiplier.max(0.0))
    }

    fn apply_stun(&mut self, seconds: f32) {
        if seconds.is_finite() && seconds > 0.0 {
            self.stun_remaining = self.stun_remaining.max(seconds);
        }
    }

    fn is_stunned(&self) -> bool {
        self.stun_remaining > 0.0
    }
}
