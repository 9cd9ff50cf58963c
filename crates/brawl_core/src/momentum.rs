//! Player momentum: a decaying multiplier built up by scoring.
//!
//! Momentum stays still until combat starts. From then on it loses a fixed
//! amount on a fixed cadence; reaching zero reports
//! [`MomentumTick::Depleted`] once, and the world kills the owning actor.

use serde::{Deserialize, Serialize};

use crate::clock::{ClockDomain, FrameTime};
use crate::config::MomentumConfig;

/// Values at or below this count as empty.
const EMPTY: f32 = 1e-4;

/// What a [`Momentum::update`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MomentumTick {
    /// Nothing changed.
    Steady,
    /// One or more decay steps were applied.
    Decayed,
    /// Momentum reached zero. Reported once.
    Depleted,
}

/// Bounded decaying multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Momentum {
    value: f32,
    max: f32,
    decay_amount: f32,
    decay_interval: f32,
    gain_per_point: f32,
    clock: ClockDomain,
    combat_started: bool,
    since_decay: f32,
    depleted: bool,
}

impl Momentum {
    /// Create momentum at its initial value, combat not started.
    #[must_use]
    pub fn new(config: &MomentumConfig) -> Self {
        Self {
            value: config.initial.clamp(0.0, config.max),
            max: config.max,
            decay_amount: config.decay_amount,
            decay_interval: config.decay_interval,
            gain_per_point: config.gain_per_point,
            clock: config.clock,
            combat_started: false,
            since_decay: 0.0,
            depleted: false,
        }
    }

    /// Begin decaying. Further calls do nothing.
    pub fn start_combat(&mut self) {
        if !self.combat_started {
            self.combat_started = true;
            tracing::debug!(value = self.value, "momentum decay started");
        }
    }

    /// Whether decay has started.
    #[must_use]
    pub const fn combat_started(&self) -> bool {
        self.combat_started
    }

    /// Current value in `[0, max]`.
    #[must_use]
    pub const fn value(&self) -> f32 {
        self.value
    }

    /// Whether momentum ran out.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.depleted
    }

    /// Multiplier applied to movement and animation speed.
    #[must_use]
    pub fn speed_multiplier(&self) -> f32 {
        self.value.clamp(0.0, self.max)
    }

    /// Gain momentum from scoring. Returns the amount gained.
    pub fn add_score(&mut self, points: u32) -> f32 {
        if self.depleted {
            return 0.0;
        }
        let before = self.value;
        self.value = (self.value + points as f32 * self.gain_per_point).min(self.max);
        self.value - before
    }

    /// Apply decay steps that came due during this frame.
    pub fn update(&mut self, frame: &FrameTime) -> MomentumTick {
        if !self.combat_started || self.depleted || self.decay_interval <= 0.0 {
            return MomentumTick::Steady;
        }

        self.since_decay += frame.delta(self.clock);
        let mut decayed = false;
        while self.since_decay >= self.decay_interval {
            self.since_decay -= self.decay_interval;
            self.value = (self.value - self.decay_amount).max(0.0);
            decayed = true;
        }

        if self.value <= EMPTY {
            self.value = 0.0;
            self.depleted = true;
            tracing::info!("momentum depleted");
            return MomentumTick::Depleted;
        }
        if decayed {
            MomentumTick::Decayed
        } else {
            MomentumTick::Steady
        }
    }

    /// HUD text for the current value.
    #[must_use]
    pub fn display_text(&self) -> String {
        format!("x{:.2}", self.value)
    }
}

impl Default for Momentum {
    fn default() -> Self {
        Self::new(&MomentumConfig::default())
    }
}
