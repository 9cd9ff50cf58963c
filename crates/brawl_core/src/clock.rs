//! Simulation clocks.
//!
//! Every tick carries two deltas: the real (unscaled) frame time supplied
//! by the host, and the scaled time the gameplay systems advance by. The
//! ratio between them is the time scale owned by
//! [`TimeManager`](crate::time_dilation::TimeManager).

use serde::{Deserialize, Serialize};

/// Which clock a timer or decay process runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ClockDomain {
    /// Game time, slowed by hit-stop, slow motion and pause.
    #[default]
    Scaled,
    /// Wall-clock time, unaffected by time dilation.
    Real,
}

/// Deltas for one simulation tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameTime {
    /// Unscaled seconds elapsed since the previous tick.
    pub real_dt: f32,
    /// Scaled seconds elapsed since the previous tick.
    pub scaled_dt: f32,
    /// Time scale applied this tick.
    pub time_scale: f32,
}

impl FrameTime {
    /// Build a frame from a real delta and the scale in effect.
    #[must_use]
    pub fn new(real_dt: f32, time_scale: f32) -> Self {
        let real_dt = if real_dt.is_finite() { real_dt.max(0.0) } else { 0.0 };
        Self {
            real_dt,
            scaled_dt: real_dt * time_scale,
            time_scale,
        }
    }

    /// A frame with no time dilation.
    #[must_use]
    pub fn unscaled(real_dt: f32) -> Self {
        Self::new(real_dt, 1.0)
    }

    /// Delta for the given clock.
    #[must_use]
    pub const fn delta(&self, domain: ClockDomain) -> f32 {
        match domain {
            ClockDomain::Scaled => self.scaled_dt,
            ClockDomain::Real => self.real_dt,
        }
    }
}

/// Accumulated elapsed time on both clocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Clocks {
    real: f64,
    scaled: f64,
}

impl Clocks {
    /// Advance both clocks by one frame.
    pub fn advance(&mut self, frame: &FrameTime) {
        self.real += f64::from(frame.real_dt);
        self.scaled += f64::from(frame.scaled_dt);
    }

    /// Elapsed seconds on the given clock.
    #[must_use]
    pub const fn now(&self, domain: ClockDomain) -> f64 {
        match domain {
            ClockDomain::Scaled => self.scaled,
            ClockDomain::Real => self.real,
        }
    }
}
