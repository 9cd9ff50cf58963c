//! Consecutive-hit streaks.
//!
//! ```text
//! Idle --hit--> Active --hit--> Active
//!                  |
//!             timeout elapses
//!                  v
//!                Ended (discarded; next hit starts a fresh instance)
//! ```
//!
//! The timeout counts down on the clock chosen in [`ComboConfig`]. With the
//! default scaled clock, slow motion stretches the combo window by the same
//! factor it stretches everything else.

use serde::{Deserialize, Serialize};

use crate::clock::{ClockDomain, FrameTime};
use crate::config::ComboConfig;
use crate::events::ComboEvent;

/// One live streak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComboInstance {
    count: u32,
    has_ended: bool,
    remaining: f32,
}

impl ComboInstance {
    fn start(timeout: f32) -> Self {
        Self {
            count: 1,
            has_ended: false,
            remaining: timeout,
        }
    }

    /// Hits in the streak.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Whether the timeout elapsed.
    #[must_use]
    pub const fn has_ended(&self) -> bool {
        self.has_ended
    }

    /// Seconds until the streak ends without another hit.
    #[must_use]
    pub const fn remaining(&self) -> f32 {
        self.remaining
    }

    fn extend(&mut self, timeout: f32) {
        self.count = self.count.saturating_add(1);
        self.remaining = timeout;
    }

    fn tick(&mut self, dt: f32) -> bool {
        if self.has_ended {
            return false;
        }
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.remaining = 0.0;
            self.has_ended = true;
            return true;
        }
        false
    }
}

/// Owner of the player's current streak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboManager {
    timeout: f32,
    clock: ClockDomain,
    display_threshold: u32,
    current: Option<ComboInstance>,
    best: u32,
}

impl ComboManager {
    /// Create a manager with no live streak.
    #[must_use]
    pub fn new(config: &ComboConfig) -> Self {
        Self {
            timeout: config.timeout,
            clock: config.clock,
            display_threshold: config.display_threshold,
            current: None,
            best: 0,
        }
    }

    /// Record a landed hit.
    pub fn register_hit(&mut self) -> ComboEvent {
        match self.current.as_mut() {
            Some(combo) if !combo.has_ended => {
                combo.extend(self.timeout);
                let count = combo.count;
                self.best = self.best.max(count);
                ComboEvent::Extended { count }
            }
            _ => {
                self.current = Some(ComboInstance::start(self.timeout));
                self.best = self.best.max(1);
                tracing::debug!("combo started");
                ComboEvent::Started { count: 1 }
            }
        }
    }

    /// Count down the timeout. Returns the end event when it elapses.
    pub fn update(&mut self, frame: &FrameTime) -> Option<ComboEvent> {
        let dt = frame.delta(self.clock);
        let combo = self.current.as_mut()?;
        if combo.tick(dt) {
            let count = combo.count;
            self.current = None;
            tracing::debug!(count, "combo ended");
            return Some(ComboEvent::Ended { count });
        }
        None
    }

    /// The live streak, if any.
    #[must_use]
    pub const fn current(&self) -> Option<&ComboInstance> {
        self.current.as_ref()
    }

    /// Hits in the live streak, zero when idle.
    #[must_use]
    pub fn current_count(&self) -> u32 {
        self.current.map_or(0, |c| c.count)
    }

    /// Longest streak seen.
    #[must_use]
    pub const fn best(&self) -> u32 {
        self.best
    }

    /// Display multiplier: the hit count, never below 1.
    #[must_use]
    pub fn multiplier(&self) -> u32 {
        self.current_count().max(1)
    }

    /// HUD text for the streak, or `None` below the display threshold.
    #[must_use]
    pub fn display_text(&self) -> Option<String> {
        let count = self.current_count();
        (count >= self.display_threshold.max(1)).then(|| format!("x{count} COMBO"))
    }

    /// Drop the live streak without an end event.
    pub fn reset(&mut self) {
        self.current = None;
    }
}
