//! Enemy AI and attack state machines.
//!
//! Every enemy runs the same perception and movement state machine in
//! [`EnemyAi`]:
//!
//! ```text
//! Idle --sees target--> Aware --out of range--> Approaching
//!                         |                         |
//!                         +---in range, ready-------+--> Attacking
//! any --Die()--> Dead (terminal)
//! ```
//!
//! What an attack actually does is delegated to an [`Attacker`]
//! implementation: [`MeleeAttack`], [`ShooterAttack`] or [`DroneSupport`].
//! Attackers never touch the world; they return [`AttackCommand`]s which
//! the world executes.

mod drone;
mod melee;
mod shooter;

pub use drone::{DroneProfile, DroneSupport};
pub use melee::{MeleeAttack, MeleeProfile};
pub use shooter::{ShooterAttack, WeaponStats};

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::config::{AiConfig, EnemyTemplate};
use crate::math::Vec2;
use crate::pathfinding::{PathOracle, PathTicket};
use crate::targeting::{in_range, VisionCone};
use crate::timer::{Cooldown, TimerAction};

/// Perception and attack state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EnemyState {
    /// No target in sight.
    #[default]
    Idle,
    /// Target seen, holding position.
    Aware,
    /// Following a path toward the target.
    Approaching,
    /// Executing an attack.
    Attacking,
    /// Terminal.
    Dead,
}

/// An ally as seen by a support attacker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllyStatus {
    /// Ally id.
    pub id: EntityId,
    /// Ally position.
    pub position: Vec2,
    /// Ally health fraction.
    pub health_fraction: f32,
}

/// What an attacker can see while acting.
#[derive(Debug)]
pub struct AttackContext<'a> {
    /// The attacking actor.
    pub me: EntityId,
    /// Its position.
    pub position: Vec2,
    /// Its facing direction.
    pub facing: Vec2,
    /// Target position, if the target is still valid.
    pub target: Option<Vec2>,
    /// Living allies.
    pub allies: &'a [AllyStatus],
    /// World random stream.
    pub rng: &'a mut ChaCha8Rng,
}

/// Side effect requested by an attacker.
#[derive(Debug, Clone, PartialEq)]
pub enum AttackCommand {
    /// Schedule a timer on the scaled clock.
    Schedule {
        /// Seconds until it fires.
        delay: f32,
        /// What fires.
        action: TimerAction,
    },
    /// Override steering with a fixed velocity until `EndLunge`.
    Lunge {
        /// Lunge velocity.
        velocity: Vec2,
    },
    /// Spawn a projectile.
    Fire {
        /// Travel direction.
        direction: Vec2,
        /// Copy of the weapon at the moment of the shot.
        weapon: WeaponStats,
    },
    /// Push the attacker.
    Recoil {
        /// Impulse.
        impulse: Vec2,
    },
    /// Restore an ally's health.
    Heal {
        /// Ally to heal.
        target: EntityId,
        /// Hit points to restore.
        amount: u32,
    },
}

/// Archetype-specific attack behaviour.
pub trait Attacker {
    /// Start an attack.
    fn begin_attack(&mut self, ctx: &mut AttackContext<'_>) -> Vec<AttackCommand>;
    /// React to one of this attacker's own timers firing.
    fn on_timer(&mut self, action: &TimerAction, ctx: &mut AttackContext<'_>) -> Vec<AttackCommand>;
    /// Whether an attack is in progress.
    fn is_busy(&self) -> bool;
    /// Abandon an attack in progress.
    fn cancel(&mut self);
}

/// Serializable choice of attack behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArchetypeSpec {
    /// Lunge and swing.
    Melee(MeleeProfile),
    /// Burst fire.
    Shooter(WeaponStats),
    /// Heal allies and retreat.
    Drone(DroneProfile),
}

/// Runtime attack driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Archetype {
    /// Melee driver.
    Melee(MeleeAttack),
    /// Ranged driver.
    Shooter(ShooterAttack),
    /// Support driver.
    Drone(DroneSupport),
}

impl Archetype {
    /// Build a fresh driver.
    #[must_use]
    pub fn from_spec(spec: &ArchetypeSpec) -> Self {
        match spec {
            ArchetypeSpec::Melee(p) => Self::Melee(MeleeAttack::new(p.clone())),
            ArchetypeSpec::Shooter(w) => Self::Shooter(ShooterAttack::new(w.clone())),
            ArchetypeSpec::Drone(p) => Self::Drone(DroneSupport::new(p.clone())),
        }
    }

    fn as_attacker(&mut self) -> &mut dyn Attacker {
        match self {
            Self::Melee(a) => a,
            Self::Shooter(a) => a,
            Self::Drone(a) => a,
        }
    }
}

impl Attacker for Archetype {
    fn begin_attack(&mut self, ctx: &mut AttackContext<'_>) -> Vec<AttackCommand> {
        self.as_attacker().begin_attack(ctx)
    }

    fn on_timer(&mut self, action: &TimerAction, ctx: &mut AttackContext<'_>) -> Vec<AttackCommand> {
        self.as_attacker().on_timer(action, ctx)
    }

    fn is_busy(&self) -> bool {
        match self {
            Self::Melee(a) => a.is_busy(),
            Self::Shooter(a) => a.is_busy(),
            Self::Drone(a) => a.is_busy(),
        }
    }

    fn cancel(&mut self) {
        self.as_attacker().cancel();
    }
}

/// The target as seen by the AI this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetView {
    /// Target position.
    pub position: Vec2,
    /// Target is busy with something that blocks attacks on it.
    pub interacting: bool,
}

/// Per-tick AI input.
#[derive(Debug, Clone, Copy)]
pub struct AiInput<'a> {
    /// Enemy position.
    pub position: Vec2,
    /// Enemy facing.
    pub facing: Vec2,
    /// Moves without a path.
    pub flying: bool,
    /// Resolved target, `None` when missing or dead.
    pub target: Option<TargetView>,
    /// Scaled seconds since the last tick.
    pub dt: f32,
    /// AI cadence.
    pub config: &'a AiConfig,
}

/// Per-tick AI decision.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AiOutput {
    /// Steering direction, zero to hold still.
    pub steer: Vec2,
    /// New facing, if it should change.
    pub face: Option<Vec2>,
    /// Begin an attack this tick.
    pub attack: bool,
}

/// Enemy brain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyAi {
    state: EnemyState,
    /// Vision check.
    pub vision: VisionCone,
    /// Distance at which attacks start.
    pub attack_range: f32,
    attack_cooldown: Cooldown,
    cooldown_duration: f32,
    path: Vec<Vec2>,
    waypoint: usize,
    path_timer: Cooldown,
    #[serde(skip)]
    pending_path: Option<PathTicket>,
    /// Score awarded on death.
    pub score_value: u32,
    /// Template or host prefab dropped on death.
    pub loot: Option<String>,
    /// Attack driver.
    pub archetype: Archetype,
    reward_claimed: bool,
}

impl EnemyAi {
    /// Create an idle brain.
    #[must_use]
    pub fn new(vision: VisionCone, attack_range: f32, cooldown: f32, archetype: Archetype) -> Self {
        Self {
            state: EnemyState::Idle,
            vision,
            attack_range,
            attack_cooldown: Cooldown::ready(),
            cooldown_duration: cooldown.max(0.0),
            path: Vec::new(),
            waypoint: 0,
            path_timer: Cooldown::ready(),
            pending_path: None,
            score_value: 0,
            loot: None,
            archetype,
            reward_claimed: false,
        }
    }

    /// Build from a template section.
    #[must_use]
    pub fn from_template(template: &EnemyTemplate) -> Self {
        let vision = VisionCone {
            radius: template.vision_radius,
            half_angle_deg: template.vision_half_angle_deg,
        };
        Self {
            score_value: template.score_value,
            loot: template.loot.clone(),
            ..Self::new(
                vision,
                template.attack_range,
                template.attack_cooldown,
                Archetype::from_spec(&template.archetype),
            )
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> EnemyState {
        self.state
    }

    /// Remaining waypoints.
    #[must_use]
    pub fn remaining_path(&self) -> &[Vec2] {
        self.path.get(self.waypoint..).unwrap_or(&[])
    }

    /// Whether a path request is outstanding.
    #[must_use]
    pub const fn awaiting_path(&self) -> bool {
        self.pending_path.is_some()
    }

    fn set_state(&mut self, next: EnemyState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "enemy state");
            self.state = next;
        }
    }

    fn drop_path(&mut self, oracle: &mut dyn PathOracle) {
        if let Some(ticket) = self.pending_path.take() {
            oracle.cancel(ticket);
        }
        self.path.clear();
        self.waypoint = 0;
    }

    /// Run one tick of perception and movement.
    pub fn think(&mut self, input: &AiInput<'_>, oracle: &mut dyn PathOracle) -> AiOutput {
        if self.state == EnemyState::Dead {
            return AiOutput::default();
        }
        self.attack_cooldown.tick(input.dt);
        self.path_timer.tick(input.dt);

        let Some(target) = input.target else {
            if self.state != EnemyState::Idle {
                self.drop_path(oracle);
                self.set_state(EnemyState::Idle);
            }
            return AiOutput::default();
        };

        if self.state == EnemyState::Idle {
            if !self.vision.can_see(input.position, input.facing, target.position) {
                return AiOutput::default();
            }
            self.set_state(EnemyState::Aware);
        }

        let to_target = target.position - input.position;
        let face = (to_target.x.abs() > crate::math::EPSILON)
            .then(|| Vec2::new(to_target.x.signum(), 0.0));

        if self.archetype.is_busy() {
            self.set_state(EnemyState::Attacking);
            return AiOutput::default();
        }

        if in_range(input.position, target.position, self.attack_range) {
            self.drop_path(oracle);
            if self.attack_cooldown.is_ready() && !target.interacting {
                self.attack_cooldown.start(self.cooldown_duration);
                self.set_state(EnemyState::Attacking);
                return AiOutput {
                    steer: Vec2::ZERO,
                    face,
                    attack: true,
                };
            }
            if self.state != EnemyState::Attacking {
                self.set_state(EnemyState::Aware);
            }
            return AiOutput {
                face,
                ..AiOutput::default()
            };
        }

        self.set_state(EnemyState::Approaching);
        let steer = if input.flying {
            to_target.normalize_or_zero()
        } else {
            self.follow_path(input, target.position, oracle)
        };
        AiOutput {
            steer,
            face,
            attack: false,
        }
    }

    fn follow_path(&mut self, input: &AiInput<'_>, goal: Vec2, oracle: &mut dyn PathOracle) -> Vec2 {
        if let Some(ticket) = self.pending_path {
            match oracle.poll(ticket) {
                Some(Ok(path)) => {
                    self.pending_path = None;
                    self.path = path;
                    self.waypoint = 0;
                }
                Some(Err(err)) => {
                    self.pending_path = None;
                    self.path.clear();
                    self.waypoint = 0;
                    tracing::debug!(error = %err, "path request failed; retrying on next interval");
                }
                None => {}
            }
        }

        if self.pending_path.is_none() && self.path_timer.is_ready() {
            self.pending_path = Some(oracle.request(input.position, goal));
            self.path_timer.start(input.config.path_recompute_interval);
        }

        let tolerance_sq = input.config.waypoint_tolerance * input.config.waypoint_tolerance;
        while let Some(next) = self.path.get(self.waypoint) {
            if next.distance_squared(input.position) > tolerance_sq {
                return (*next - input.position).normalize_or_zero();
            }
            self.waypoint += 1;
        }
        Vec2::ZERO
    }

    /// Enter the terminal state. Returns `true` on the first call only.
    pub fn die(&mut self, oracle: &mut dyn PathOracle) -> bool {
        if self.state == EnemyState::Dead {
            return false;
        }
        self.drop_path(oracle);
        self.archetype.cancel();
        self.set_state(EnemyState::Dead);
        true
    }

    /// Claim the death reward. Returns `true` exactly once, after death.
    pub fn claim_reward(&mut self) -> bool {
        if self.state != EnemyState::Dead || self.reward_claimed {
            return false;
        }
        self.reward_claimed = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::pathfinding::{GridPathOracle, NavGrid};

    fn grunt() -> EnemyAi {
        EnemyAi::new(
            VisionCone {
                radius: 10.0,
                half_angle_deg: 90.0,
            },
            1.5,
            1.0,
            Archetype::from_spec(&ArchetypeSpec::Melee(MeleeProfile::default())),
        )
    }

    fn oracle() -> GridPathOracle {
        GridPathOracle::new(NavGrid::new(32, 32, 1.0).unwrap(), false)
    }

    fn input<'a>(config: &'a AiConfig, position: Vec2, target: Option<Vec2>) -> AiInput<'a> {
        AiInput {
            position,
            facing: Vec2::RIGHT,
            flying: false,
            target: target.map(|position| TargetView {
                position,
                interacting: false,
            }),
            dt: 1.0 / 60.0,
            config,
        }
    }

    #[test]
    fn test_idle_until_target_seen() {
        let config = AiConfig::default();
        let mut ai = grunt();
        let mut oracle = oracle();

        ai.think(&input(&config, Vec2::new(5.0, 5.0), Some(Vec2::new(2.0, 5.0))), &mut oracle);
        assert_eq!(ai.state(), EnemyState::Idle);

        ai.think(&input(&config, Vec2::new(5.0, 5.0), Some(Vec2::new(9.0, 5.0))), &mut oracle);
        assert_eq!(ai.state(), EnemyState::Approaching);
    }

    #[test]
    fn test_approach_follows_oracle_path() {
        let config = AiConfig::default();
        let mut ai = grunt();
        let mut oracle = oracle();
        let me = Vec2::new(2.5, 2.5);
        let target = Some(Vec2::new(10.5, 2.5));

        let first = ai.think(&input(&config, me, target), &mut oracle);
        assert_eq!(first.steer, Vec2::ZERO);
        assert!(ai.awaiting_path());

        oracle.tick();
        let second = ai.think(&input(&config, me, target), &mut oracle);
        assert!(!ai.awaiting_path());
        assert!(second.steer.x > 0.0);
        assert!(!ai.remaining_path().is_empty());
    }

    #[test]
    fn test_attack_when_in_range_and_ready() {
        let config = AiConfig::default();
        let mut ai = grunt();
        let mut oracle = oracle();
        let me = Vec2::new(2.0, 2.0);
        let target = Some(Vec2::new(3.0, 2.0));

        let out = ai.think(&input(&config, me, target), &mut oracle);
        assert!(out.attack);
        assert_eq!(ai.state(), EnemyState::Attacking);

        let again = ai.think(&input(&config, me, target), &mut oracle);
        assert!(!again.attack);
    }

    #[test]
    fn test_interacting_target_is_not_attacked() {
        let config = AiConfig::default();
        let mut ai = grunt();
        let mut oracle = oracle();
        let mut tick = input(&config, Vec2::new(2.0, 2.0), Some(Vec2::new(3.0, 2.0)));
        if let Some(target) = tick.target.as_mut() {
            target.interacting = true;
        }
        assert!(!ai.think(&tick, &mut oracle).attack);
        assert_eq!(ai.state(), EnemyState::Aware);
    }

    #[test]
    fn test_lost_target_returns_to_idle() {
        let config = AiConfig::default();
        let mut ai = grunt();
        let mut oracle = oracle();
        ai.think(&input(&config, Vec2::new(2.0, 2.0), Some(Vec2::new(8.0, 2.0))), &mut oracle);
        assert!(ai.awaiting_path());

        let out = ai.think(&input(&config, Vec2::new(2.0, 2.0), None), &mut oracle);
        assert_eq!(out, AiOutput::default());
        assert_eq!(ai.state(), EnemyState::Idle);
        assert_eq!(oracle.outstanding(), 0);
    }

    #[test]
    fn test_die_once_and_reward_once() {
        let mut ai = grunt();
        let mut oracle = oracle();
        assert!(!ai.claim_reward());
        assert!(ai.die(&mut oracle));
        assert!(!ai.die(&mut oracle));
        assert!(ai.claim_reward());
        assert!(!ai.claim_reward());

        let config = AiConfig::default();
        let out = ai.think(&input(&config, Vec2::ZERO, Some(Vec2::new(1.0, 0.0))), &mut oracle);
        assert_eq!(out, AiOutput::default());
    }

    struct FailingOracle {
        requests: u32,
    }

    impl PathOracle for FailingOracle {
        fn request(&mut self, _start: Vec2, _goal: Vec2) -> PathTicket {
            self.requests += 1;
            PathTicket(u64::from(self.requests))
        }

        fn poll(&mut self, _ticket: PathTicket) -> Option<Result<Vec<Vec2>>> {
            Some(Err(crate::error::GameError::PathNotFound {
                from_x: 0.0,
                from_y: 0.0,
                to_x: 1.0,
                to_y: 1.0,
            }))
        }

        fn cancel(&mut self, _ticket: PathTicket) {}

        fn tick(&mut self) {}
    }

    #[test]
    fn test_path_failure_retries_on_interval() {
        let config = AiConfig::default();
        let mut ai = grunt();
        let mut oracle = FailingOracle { requests: 0 };
        let tick = input(&config, Vec2::ZERO, Some(Vec2::new(8.0, 0.0)));

        for _ in 0..10 {
            ai.think(&tick, &mut oracle);
        }
        assert_eq!(oracle.requests, 1);

        for _ in 0..30 {
            ai.think(&tick, &mut oracle);
        }
        assert_eq!(oracle.requests, 2);
    }
}
