//! Global time-scale control: hit-stop, slow motion and pause.
//!
//! The [`TimeManager`] owns the single time scale of the simulation. It is
//! driven by real (unscaled) time so that its own recovery is never slowed
//! by the dilation it applies.
//!
//! # Arbitration
//!
//! Requests never overwrite each other blindly:
//!
//! - Pause beats everything. While paused no timer advances, so an in-flight
//!   hit-stop or slow-motion recovery resumes where it left off.
//! - Hit-stop beats slow motion. Overlapping hit-stops keep the longest
//!   remaining duration. The slow-motion hold and ramp wait until the freeze
//!   is over.
//! - Overlapping slow-motion requests keep the lowest rate and restart the
//!   hold. The ramp back to 1 only starts once no newer request arrived
//!   within the hold.
//!
//! The scale therefore always returns to exactly 1 within
//! `hit_stop + slow_motion_hold + recovery_duration` real seconds of the
//! last request.

use serde::{Deserialize, Serialize};

use crate::config::TimeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct SlowMotion {
    factor: f32,
    hold_remaining: f32,
    recovery_elapsed: f32,
}

impl SlowMotion {
    fn rate(&self, recovery_duration: f32) -> f32 {
        if self.hold_remaining > 0.0 {
            return self.factor;
        }
        let t = (self.recovery_elapsed / recovery_duration).clamp(0.0, 1.0);
        self.factor + (1.0 - self.factor) * t
    }
}

/// Single owner of the simulation time scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeManager {
    config: TimeConfig,
    hit_stop_remaining: f32,
    slow: Option<SlowMotion>,
    paused: bool,
    cached_scale: f32,
    scale: f32,
}

impl TimeManager {
    /// Create a manager running at normal speed.
    #[must_use]
    pub fn new(config: &TimeConfig) -> Self {
        Self {
            config: config.clone(),
            hit_stop_remaining: 0.0,
            slow: None,
            paused: false,
            cached_scale: 1.0,
            scale: 1.0,
        }
    }

    /// Freeze the simulation for `seconds` of real time.
    pub fn do_hit_stop(&mut self, seconds: f32) {
        if !seconds.is_finite() || seconds <= 0.0 {
            return;
        }
        self.hit_stop_remaining = self.hit_stop_remaining.max(seconds);
        self.refresh_scale();
    }

    /// Slow the simulation to `factor`, then ramp back to 1.
    pub fn do_slow_motion(&mut self, factor: f32) {
        if !factor.is_finite() {
            return;
        }
        let factor = factor.clamp(self.config.min_slow_motion, 1.0);
        if factor >= 1.0 {
            return;
        }
        let factor = match self.slow {
            Some(slow) => factor.min(slow.rate(self.config.recovery_duration)),
            None => factor,
        };
        self.slow = Some(SlowMotion {
            factor,
            hold_remaining: self.config.slow_motion_hold,
            recovery_elapsed: 0.0,
        });
        self.refresh_scale();
    }

    /// Pause or resume. Resuming restores the cached scale and lets any
    /// recovery continue.
    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.paused = false;
            self.scale = self.cached_scale;
            self.refresh_scale();
            tracing::debug!(scale = self.scale, "resumed");
        } else {
            self.cached_scale = self.scale;
            self.paused = true;
            self.scale = 0.0;
            tracing::debug!("paused");
        }
    }

    /// Whether the simulation is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether any hit-stop or slow motion is in effect.
    #[must_use]
    pub fn is_dilated(&self) -> bool {
        self.hit_stop_remaining > 0.0 || self.slow.is_some()
    }

    /// Current scale.
    #[must_use]
    pub const fn time_scale(&self) -> f32 {
        self.scale
    }

    /// Real seconds until the scale is back to 1, ignoring pause.
    #[must_use]
    pub fn time_to_recover(&self) -> f32 {
        let slow = self.slow.map_or(0.0, |s| {
            s.hold_remaining + (self.config.recovery_duration - s.recovery_elapsed).max(0.0)
        });
        self.hit_stop_remaining + slow
    }

    /// Advance by `real_dt` unscaled seconds and return the new scale.
    pub fn update(&mut self, real_dt: f32) -> f32 {
        if self.paused {
            return self.scale;
        }
        let mut dt = if real_dt.is_finite() { real_dt.max(0.0) } else { 0.0 };

        if self.hit_stop_remaining > 0.0 {
            let used = dt.min(self.hit_stop_remaining);
            self.hit_stop_remaining -= used;
            dt -= used;
            if self.hit_stop_remaining <= 0.0 {
                self.hit_stop_remaining = 0.0;
                tracing::debug!("hit-stop over");
            }
        }

        if let Some(slow) = self.slow.as_mut() {
            if slow.hold_remaining > 0.0 {
                let used = dt.min(slow.hold_remaining);
                slow.hold_remaining -= used;
                dt -= used;
            }
            slow.recovery_elapsed += dt;
            if slow.hold_remaining <= 0.0 && slow.recovery_elapsed >= self.config.recovery_duration {
                self.slow = None;
                tracing::debug!("slow motion recovered");
            }
        }

        self.refresh_scale();
        self.scale
    }

    fn refresh_scale(&mut self) {
        if self.paused {
            return;
        }
        self.scale = if self.hit_stop_remaining > 0.0 {
            self.config.hit_stop_scale
        } else if let Some(slow) = self.slow {
            slow.rate(self.config.recovery_duration)
        } else {
            1.0
        };
    }
}

impl Default for TimeManager {
    fn default() -> Self {
        Self::new(&TimeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(manager: &mut TimeManager, seconds: f32) -> f32 {
        let steps = (seconds / 0.01).round() as usize;
        let mut scale = manager.time_scale();
        for _ in 0..steps {
            scale = manager.update(0.01);
        }
        scale
    }

    #[test]
    fn test_hit_stop_restores() {
        let mut time = TimeManager::default();
        time.do_hit_stop(0.1);
        assert!(time.time_scale() < 0.1);
        run(&mut time, 0.05);
        assert!(time.time_scale() < 0.1);
        assert_eq!(run(&mut time, 0.06), 1.0);
        assert!(!time.is_dilated());
    }

    #[test]
    fn test_overlapping_hit_stops_keep_longest() {
        let mut time = TimeManager::default();
        time.do_hit_stop(0.2);
        time.do_hit_stop(0.05);
        run(&mut time, 0.1);
        assert!(time.time_scale() < 0.1);
        assert_eq!(run(&mut time, 0.11), 1.0);
    }

    #[test]
    fn test_slow_motion_holds_then_ramps() {
        let config = TimeConfig {
            slow_motion_hold: 0.2,
            recovery_duration: 0.4,
            ..TimeConfig::default()
        };
        let mut time = TimeManager::new(&config);
        time.do_slow_motion(0.5);
        assert_eq!(time.time_scale(), 0.5);

        let held = run(&mut time, 0.1);
        assert_eq!(held, 0.5);

        let ramping = run(&mut time, 0.3);
        assert!(ramping > 0.5 && ramping < 1.0, "scale {ramping}");

        assert_eq!(run(&mut time, 0.25), 1.0);
    }

    #[test]
    fn test_most_extreme_slow_motion_wins() {
        let mut time = TimeManager::default();
        time.do_slow_motion(0.3);
        time.do_slow_motion(0.6);
        assert_eq!(time.time_scale(), 0.3);
    }

    #[test]
    fn test_hit_stop_overrides_slow_motion() {
        let mut time = TimeManager::default();
        time.do_slow_motion(0.4);
        time.do_hit_stop(0.1);
        assert_eq!(time.time_scale(), TimeConfig::default().hit_stop_scale);
        run(&mut time, 0.15);
        assert_eq!(time.time_scale(), 0.4);
    }

    #[test]
    fn test_pause_freezes_recovery() {
        let mut time = TimeManager::default();
        time.do_slow_motion(0.5);
        let remaining = time.time_to_recover();

        time.toggle_pause();
        assert!(time.is_paused());
        assert_eq!(time.time_scale(), 0.0);
        run(&mut time, 5.0);
        assert_eq!(time.time_to_recover(), remaining);

        time.toggle_pause();
        assert_eq!(time.time_scale(), 0.5);
        assert_eq!(run(&mut time, remaining + 0.05), 1.0);
    }

    #[test]
    fn test_invalid_requests_ignored() {
        let mut time = TimeManager::default();
        time.do_hit_stop(-1.0);
        time.do_hit_stop(f32::NAN);
        time.do_slow_motion(f32::NAN);
        time.do_slow_motion(1.0);
        assert!(!time.is_dilated());
        assert_eq!(time.update(f32::NAN), 1.0);
    }

    #[test]
    fn test_restores_within_bound() {
        let mut time = TimeManager::default();
        time.do_hit_stop(0.2);
        time.do_slow_motion(0.1);
        let bound = time.time_to_recover();
        assert_eq!(run(&mut time, bound + 0.05), 1.0);
    }
}
