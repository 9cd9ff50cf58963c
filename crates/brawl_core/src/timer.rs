//! Explicit timers driven by the simulation tick.
//!
//! Delayed and periodic behaviour (delayed destruction, hitbox windows,
//! burst fire, wave spawns) is expressed as entries in a [`Scheduler`]
//! instead of suspended coroutines. Entries fire in a deterministic order:
//! real-clock entries before scaled-clock entries, then by due time, then by
//! scheduling order.

use serde::{Deserialize, Serialize};

use crate::clock::{ClockDomain, Clocks, FrameTime};
use crate::components::EntityId;

/// Handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(u64);

/// What happens when a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerAction {
    /// Remove an actor from the world.
    Despawn(EntityId),
    /// Open an actor's hitbox window.
    ArmHitbox(EntityId),
    /// Close an actor's hitbox window.
    DisarmHitbox(EntityId),
    /// Stop a melee lunge.
    EndLunge(EntityId),
    /// Fire the next shot of a burst.
    FireShot {
        /// Shooting actor.
        shooter: EntityId,
        /// Zero-based index within the burst.
        shot: u32,
    },
    /// Spawn a room's wave.
    SpawnWave {
        /// Room index.
        room: usize,
        /// Wave index within the room.
        wave: usize,
    },
}

impl TimerAction {
    /// The actor this action addresses, if any.
    #[must_use]
    pub const fn entity(&self) -> Option<EntityId> {
        match *self {
            Self::Despawn(id)
            | Self::ArmHitbox(id)
            | Self::DisarmHitbox(id)
            | Self::EndLunge(id)
            | Self::FireShot { shooter: id, .. } => Some(id),
            Self::SpawnWave { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TimerEntry {
    id: TimerId,
    domain: ClockDomain,
    due: f64,
    action: TimerAction,
}

/// Pending timers on both clocks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scheduler {
    clocks: Clocks,
    entries: Vec<TimerEntry>,
    next_id: u64,
}

impl Scheduler {
    /// Create an empty scheduler at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current elapsed time on a clock.
    #[must_use]
    pub const fn now(&self, domain: ClockDomain) -> f64 {
        self.clocks.now(domain)
    }

    /// Schedule `action` to fire after `delay` seconds on `domain`.
    ///
    /// A non-positive delay fires on the next [`advance`](Self::advance).
    pub fn schedule(&mut self, domain: ClockDomain, delay: f32, action: TimerAction) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let delay = if delay.is_finite() { delay.max(0.0) } else { 0.0 };
        self.entries.push(TimerEntry {
            id,
            domain,
            due: self.clocks.now(domain) + f64::from(delay),
            action,
        });
        id
    }

    /// Cancel a pending timer. Returns `false` if it already fired.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Cancel every pending timer addressing `entity`.
    pub fn cancel_for(&mut self, entity: EntityId) {
        self.entries.retain(|e| e.action.entity() != Some(entity));
    }

    /// Number of pending timers on a clock.
    #[must_use]
    pub fn pending(&self, domain: ClockDomain) -> usize {
        self.entries.iter().filter(|e| e.domain == domain).count()
    }

    /// Whether an identical action is already pending.
    #[must_use]
    pub fn is_pending(&self, action: &TimerAction) -> bool {
        self.entries.iter().any(|e| e.action == *action)
    }

    /// Advance both clocks and return the actions that became due.
    pub fn advance(&mut self, frame: &FrameTime) -> Vec<TimerAction> {
        self.clocks.advance(frame);

        let clocks = self.clocks;
        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| e.due <= clocks.now(e.domain));
        self.entries = pending;

        due.sort_by(|a, b| {
            domain_rank(a.domain)
                .cmp(&domain_rank(b.domain))
                .then(a.due.total_cmp(&b.due))
                .then(a.id.cmp(&b.id))
        });
        due.into_iter().map(|e| e.action).collect()
    }
}

const fn domain_rank(domain: ClockDomain) -> u8 {
    match domain {
        ClockDomain::Real => 0,
        ClockDomain::Scaled => 1,
    }
}

/// A countdown that is ready once it reaches zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cooldown {
    remaining: f32,
}

impl Cooldown {
    /// A cooldown that is ready immediately.
    #[must_use]
    pub const fn ready() -> Self {
        Self { remaining: 0.0 }
    }

    /// Restart the countdown.
    pub fn start(&mut self, seconds: f32) {
        self.remaining = seconds.max(0.0);
    }

    /// Count down by `dt`.
    pub fn tick(&mut self, dt: f32) {
        self.remaining = (self.remaining - dt).max(0.0);
    }

    /// Whether the countdown has elapsed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Seconds left.
    #[must_use]
    pub const fn remaining(&self) -> f32 {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_fires_after_delay() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(ClockDomain::Scaled, 0.5, TimerAction::Despawn(7));

        assert!(scheduler.advance(&FrameTime::unscaled(0.25)).is_empty());
        let fired = scheduler.advance(&FrameTime::unscaled(0.25));
        assert_eq!(fired, vec![TimerAction::Despawn(7)]);
        assert_eq!(scheduler.pending(ClockDomain::Scaled), 0);
    }

    #[test]
    fn test_scaled_timer_waits_during_slow_motion() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(ClockDomain::Scaled, 0.5, TimerAction::Despawn(1));
        scheduler.schedule(ClockDomain::Real, 0.5, TimerAction::Despawn(2));

        let fired = scheduler.advance(&FrameTime::new(0.5, 0.1));
        assert_eq!(fired, vec![TimerAction::Despawn(2)]);
        assert_eq!(scheduler.pending(ClockDomain::Scaled), 1);
    }

    #[test]
    fn test_due_order_is_deterministic() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(ClockDomain::Scaled, 0.2, TimerAction::Despawn(3));
        scheduler.schedule(ClockDomain::Scaled, 0.1, TimerAction::Despawn(2));
        scheduler.schedule(ClockDomain::Scaled, 0.1, TimerAction::Despawn(1));
        scheduler.schedule(ClockDomain::Real, 0.3, TimerAction::Despawn(9));

        let fired = scheduler.advance(&FrameTime::unscaled(1.0));
        assert_eq!(
            fired,
            vec![
                TimerAction::Despawn(9),
                TimerAction::Despawn(2),
                TimerAction::Despawn(1),
                TimerAction::Despawn(3),
            ]
        );
    }

    #[test]
    fn test_cancel() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.schedule(ClockDomain::Real, 1.0, TimerAction::ArmHitbox(4));
        scheduler.schedule(ClockDomain::Real, 1.0, TimerAction::DisarmHitbox(4));
        scheduler.schedule(ClockDomain::Real, 1.0, TimerAction::DisarmHitbox(5));
        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        scheduler.cancel_for(4);
        assert_eq!(
            scheduler.advance(&FrameTime::unscaled(2.0)),
            vec![TimerAction::DisarmHitbox(5)]
        );
    }

    #[test]
    fn test_cooldown() {
        let mut cd = Cooldown::ready();
        assert!(cd.is_ready());
        cd.start(1.0);
        cd.tick(0.6);
        assert!(!cd.is_ready());
        cd.tick(0.6);
        assert!(cd.is_ready());
        assert_eq!(cd.remaining(), 0.0);
    }
}
