//! The combat world: owner of every actor and global feedback system.
//!
//! [`CombatWorld`] advances the whole pipeline in a fixed order. Each call
//! to [`CombatWorld::tick`] takes the host's real frame time and returns the
//! [`TickEvents`] produced since the previous call, including any produced
//! by direct API calls (`apply_damage`, `kill`, ...) made between ticks.
//!
//! # Tick order
//!
//! 1. **Input** - pause toggle, player steering and attack
//! 2. **Time** - time manager produces this frame's scale
//! 3. **Timers** - due scheduled actions fire
//! 4. **AI** - path oracle resolves, enemies think and start attacks
//! 5. **Movement** - locomotion and projectiles
//! 6. **Combo timeout**, then **hits** - reported and detected overlaps
//!    resolve one at a time
//! 7. **Health** - regeneration and hurt flash
//! 8. **Momentum**, **camera**
//! 9. **Rooms** - activation by the player
//! 10. **Cleanup** - kill plane and removal of spent actors
//!
//! A hit resolves completely (health, death latch, notifications, then
//! combo, feedback, score and momentum) before the next one starts. A hit
//! landing on the frame its streak times out starts a fresh streak.
//!
//! # Pause
//!
//! While paused a tick only handles the pause toggle. Every other step is
//! skipped, real-clock consumers included: momentum does not decay, the
//! camera holds, player input other than unpause is dropped and armed
//! hitboxes stay armed without resolving overlaps. Unpausing resumes every
//! in-flight timer where it stopped.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::camera::{CameraRig, CameraState};
use crate::clock::{ClockDomain, FrameTime};
use crate::combo::ComboManager;
use crate::components::{Actor, ActorKind, Color, EntityId, LayerMask, Sprite};
use crate::config::{ActorTemplate, CombatConfig};
use crate::enemy::{AiInput, AllyStatus, AttackCommand, AttackContext, Attacker, EnemyAi, TargetView};
use crate::error::{GameError, Result};
use crate::events::{
    DamageTaken, DeathEvent, Feedback, HitEvent, HudSlot, RoomEvent, SubscriptionId,
    Subscribers, TickEvents,
};
use crate::feedback::HitFeedback;
use crate::health::{DamageOutcome, Damageable, HealthPool};
use crate::hitbox::{
    compute_damage, in_same_hierarchy, knockback_impulse, speed_multiplier, HitFilter, HitParty,
    HitRejection, Hitbox,
};
use crate::locomotion::{Locomotion, Mover};
use crate::math::Vec2;
use crate::momentum::{Momentum, MomentumTick};
use crate::pathfinding::{GridPathOracle, NavGrid, PathOracle};
use crate::projectile::Projectile;
use crate::score::ScoreBoard;
use crate::spawner::{Room, RoomProgress};
use crate::time_dilation::TimeManager;
use crate::timer::{Cooldown, Scheduler, TimerAction};

/// Storage for all actors.
///
/// Uses a `HashMap` for lookup by id, with deterministic iteration via
/// sorted keys when running systems.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityStorage {
    actors: HashMap<EntityId, Actor>,
    next_id: EntityId,
}

impl EntityStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            actors: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert an actor and return its new id.
    pub fn insert(&mut self, mut actor: Actor) -> EntityId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        actor.id = id;
        self.actors.insert(id, actor);
        id
    }

    /// Remove an actor.
    pub fn remove(&mut self, id: EntityId) -> Option<Actor> {
        self.actors.remove(&id)
    }

    /// Get an actor.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    /// Get an actor mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    /// Whether an actor exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.actors.contains_key(&id)
    }

    /// Number of actors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    /// Whether storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Sorted ids for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.actors.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all actors (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &Actor)> {
        self.actors.iter()
    }
}

/// Input device family, used for aim handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ControlScheme {
    /// Aim is a world-space cursor position.
    #[default]
    KeyboardMouse,
    /// Aim is a stick direction.
    Gamepad,
}

/// Player input for one tick, polled by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerIntent {
    /// Movement axis, each component in `[-1, 1]`.
    pub move_axis: Vec2,
    /// Attack button pressed this tick.
    pub attack: bool,
    /// Interaction held (grapple); blocks incoming enemy attacks.
    pub interact: bool,
    /// Pause button pressed this tick.
    pub pause: bool,
    /// Cursor position or stick direction, per `control_scheme`.
    pub aim: Option<Vec2>,
    /// Active device family.
    pub control_scheme: ControlScheme,
}

#[derive(Debug, Clone, Copy)]
struct AttackerView {
    owner: EntityId,
    party: HitParty,
    position: Vec2,
    velocity: Vec2,
    direction: Vec2,
    base_damage: u32,
    knockback: f32,
    mask: LayerMask,
    ranged: bool,
}

/// Deterministic combat simulation.
pub struct CombatWorld {
    config: CombatConfig,
    tick: u64,
    seed: u64,
    entities: EntityStorage,
    player: Option<EntityId>,
    intent: PlayerIntent,
    player_attack: Cooldown,
    scheduler: Scheduler,
    time: TimeManager,
    combo: ComboManager,
    camera: CameraRig,
    momentum: Momentum,
    score: ScoreBoard,
    oracle: Box<dyn PathOracle + Send>,
    rooms: Vec<Room>,
    rng: ChaCha8Rng,
    filter: HitFilter,
    pending_overlaps: Vec<(EntityId, EntityId)>,
    on_hit: Subscribers<HitEvent>,
    on_death: Subscribers<DeathEvent>,
    on_damage: Subscribers<DamageTaken>,
    events: TickEvents,
    last_camera: CameraState,
}

impl fmt::Debug for CombatWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombatWorld")
            .field("tick", &self.tick)
            .field("seed", &self.seed)
            .field("actors", &self.entities.len())
            .field("player", &self.player)
            .field("time_scale", &self.time.time_scale())
            .field("rooms", &self.rooms.len())
            .finish_non_exhaustive()
    }
}

/// Side length of the default open navigation grid.
const DEFAULT_GRID_SIZE: u32 = 128;

impl CombatWorld {
    /// Create a world with an open navigation grid centred on the origin.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] if the config does not validate.
    pub fn new(config: CombatConfig, seed: u64) -> Result<Self> {
        let half = DEFAULT_GRID_SIZE as f32 / 2.0;
        let grid = NavGrid::with_origin(
            DEFAULT_GRID_SIZE,
            DEFAULT_GRID_SIZE,
            1.0,
            Vec2::new(-half, -half),
        )?;
        Self::with_oracle(config, seed, Box::new(GridPathOracle::new(grid, true)))
    }

    /// Create a world with a custom path oracle.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] if the config does not validate.
    pub fn with_oracle(
        config: CombatConfig,
        seed: u64,
        oracle: Box<dyn PathOracle + Send>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tick: 0,
            seed,
            entities: EntityStorage::new(),
            player: None,
            intent: PlayerIntent::default(),
            player_attack: Cooldown::ready(),
            scheduler: Scheduler::new(),
            time: TimeManager::new(&config.time),
            combo: ComboManager::new(&config.combo),
            camera: CameraRig::new(&config.camera),
            momentum: Momentum::new(&config.momentum),
            score: ScoreBoard::new(),
            oracle,
            rooms: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            filter: HitFilter {
                friendly_fire: config.hit.friendly_fire,
            },
            pending_overlaps: Vec::new(),
            on_hit: Subscribers::new(),
            on_death: Subscribers::new(),
            on_damage: Subscribers::new(),
            events: TickEvents::default(),
            last_camera: CameraState::default(),
            config,
        })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Ticks run so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Seed of the random stream.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// Actor storage.
    #[must_use]
    pub const fn entities(&self) -> &EntityStorage {
        &self.entities
    }

    /// Look up an actor.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Actor> {
        self.entities.get(id)
    }

    /// Look up an actor, failing if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if the id is unknown.
    pub fn actor(&self, id: EntityId) -> Result<&Actor> {
        self.entities.get(id).ok_or(GameError::EntityNotFound(id))
    }

    /// Look up an actor mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Actor> {
        self.entities.get_mut(id)
    }

    /// The player actor id.
    #[must_use]
    pub const fn player(&self) -> Option<EntityId> {
        self.player
    }

    /// Time manager.
    #[must_use]
    pub const fn time(&self) -> &TimeManager {
        &self.time
    }

    /// Current time scale.
    #[must_use]
    pub const fn time_scale(&self) -> f32 {
        self.time.time_scale()
    }

    /// Combo manager.
    #[must_use]
    pub const fn combo(&self) -> &ComboManager {
        &self.combo
    }

    /// Camera rig.
    #[must_use]
    pub const fn camera(&self) -> &CameraRig {
        &self.camera
    }

    /// Player momentum.
    #[must_use]
    pub const fn momentum(&self) -> &Momentum {
        &self.momentum
    }

    /// Score board.
    #[must_use]
    pub const fn score(&self) -> &ScoreBoard {
        &self.score
    }

    /// Rooms in registration order.
    #[must_use]
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// Pending timers.
    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Living actors of a kind.
    #[must_use]
    pub fn count_alive(&self, kind: ActorKind) -> usize {
        self.entities
            .iter()
            .filter(|(_, a)| a.kind == kind && a.is_alive())
            .count()
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// Observe resolved hits.
    pub fn on_hit(&mut self, callback: impl FnMut(&HitEvent) + Send + 'static) -> SubscriptionId {
        self.on_hit.subscribe(callback)
    }

    /// Stop observing hits.
    pub fn unsubscribe_hit(&mut self, id: SubscriptionId) -> bool {
        self.on_hit.unsubscribe(id)
    }

    /// Observe deaths.
    pub fn on_death(&mut self, callback: impl FnMut(&DeathEvent) + Send + 'static) -> SubscriptionId {
        self.on_death.subscribe(callback)
    }

    /// Stop observing deaths.
    pub fn unsubscribe_death(&mut self, id: SubscriptionId) -> bool {
        self.on_death.unsubscribe(id)
    }

    /// Observe damage.
    pub fn on_damage(
        &mut self,
        callback: impl FnMut(&DamageTaken) + Send + 'static,
    ) -> SubscriptionId {
        self.on_damage.subscribe(callback)
    }

    // ------------------------------------------------------------------
    // Spawning
    // ------------------------------------------------------------------

    /// Insert a hand-built actor.
    pub fn spawn_actor(&mut self, actor: Actor) -> EntityId {
        let id = self.entities.insert(actor);
        self.events.spawned.push(id);
        id
    }

    /// Build an actor from a named template.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownTemplate`] if no template has this name.
    pub fn build_actor(&self, name: &str, position: Vec2) -> Result<Actor> {
        let template = self.config.template(name)?;
        Ok(self.actor_from_template(name, template, position))
    }

    fn actor_from_template(&self, name: &str, template: &ActorTemplate, position: Vec2) -> Actor {
        let mut actor = Actor::new(template.kind, position).with_faction(template.faction, template.layer);
        actor.template = name.to_string();
        actor.radius = template.radius;
        actor.death_effect = template.death_effect.clone();
        if template.sprite {
            actor.sprite = Some(Sprite::default());
        }
        if let Some(max) = template.max_health {
            let mut health = HealthPool::new(max)
                .with_regen(template.regen_per_second, template.regen_delay)
                .with_invulnerability(self.config.health.invulnerability);
            health.flash_duration = self.config.health.flash_duration;
            actor.health = Some(health);
        }
        if template.move_speed > 0.0 || template.kind != ActorKind::Prop {
            actor.locomotion = Some(Locomotion::new(template.move_speed, template.flying));
        }
        if let Some(hitbox) = &template.hitbox {
            actor.hitbox = Some(Hitbox::from_template(hitbox));
        }
        if let Some(enemy) = &template.enemy {
            actor = actor.with_enemy(EnemyAi::from_template(enemy));
        }
        actor
    }

    /// Spawn an actor from a named template.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownTemplate`] if no template has this name.
    pub fn spawn_template(&mut self, name: &str, position: Vec2) -> Result<EntityId> {
        let actor = self.build_actor(name, position)?;
        let id = self.spawn_actor(actor);
        self.events.feedback.push(Feedback::Spawn {
            entity: Some(id),
            template: name.to_string(),
            position,
        });
        Ok(id)
    }

    /// Spawn the configured player template and make it the player.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownTemplate`] if the player template is
    /// missing.
    pub fn spawn_player(&mut self, position: Vec2) -> Result<EntityId> {
        let name = self.config.player.template.clone();
        let id = self.spawn_template(&name, position)?;
        self.set_player(id)?;
        Ok(id)
    }

    /// Make an existing actor the player.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if the id is unknown.
    pub fn set_player(&mut self, id: EntityId) -> Result<()> {
        if !self.entities.contains(id) {
            return Err(GameError::EntityNotFound(id));
        }
        self.player = Some(id);
        Ok(())
    }

    /// Remove an actor immediately. Pending timers addressing it are
    /// cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if the id is unknown.
    pub fn despawn(&mut self, id: EntityId) -> Result<()> {
        let actor = self.entities.remove(id).ok_or(GameError::EntityNotFound(id))?;
        self.scheduler.cancel_for(id);
        if let Some(mut ai) = actor.enemy {
            ai.die(self.oracle.as_mut());
        }
        self.advance_rooms_on_removal(id);
        if self.player == Some(id) {
            self.player = None;
        }
        self.events.feedback.push(Feedback::Despawn(id));
        self.events.despawned.push(id);
        Ok(())
    }

    /// Register a room.
    pub fn add_room(&mut self, room: Room) -> usize {
        self.rooms.push(room);
        self.rooms.len() - 1
    }

    // ------------------------------------------------------------------
    // Direct combat API
    // ------------------------------------------------------------------

    /// Set this tick's player input.
    pub fn apply_player_intent(&mut self, intent: PlayerIntent) {
        self.intent = intent;
    }

    /// Open an actor's hitbox window.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] or
    /// [`GameError::MissingComponent`].
    pub fn arm_hitbox(&mut self, id: EntityId) -> Result<()> {
        self.hitbox_mut(id)?.arm();
        Ok(())
    }

    /// Close an actor's hitbox window.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] or
    /// [`GameError::MissingComponent`].
    pub fn disarm_hitbox(&mut self, id: EntityId) -> Result<()> {
        self.hitbox_mut(id)?.disarm();
        Ok(())
    }

    fn hitbox_mut(&mut self, id: EntityId) -> Result<&mut Hitbox> {
        self.entities
            .get_mut(id)
            .ok_or(GameError::EntityNotFound(id))?
            .hitbox
            .as_mut()
            .ok_or(GameError::MissingComponent {
                entity: id,
                component: "hitbox",
            })
    }

    /// Queue an overlap reported by the host's physics. It resolves during
    /// the hit phase of the next tick.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if either id is unknown.
    pub fn report_overlap(&mut self, attacker: EntityId, target: EntityId) -> Result<()> {
        for id in [attacker, target] {
            if !self.entities.contains(id) {
                return Err(GameError::EntityNotFound(id));
            }
        }
        self.pending_overlaps.push((attacker, target));
        Ok(())
    }

    /// Damage an actor directly, outside the hitbox pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] or
    /// [`GameError::MissingComponent`] if the actor has no health.
    pub fn apply_damage(&mut self, target: EntityId, amount: u32, direction: Vec2) -> Result<DamageOutcome> {
        self.require_health(target)?;
        let outcome = self.damage_internal(target, amount, direction, None);
        if outcome.killed() {
            self.settle_rewards(target);
        }
        Ok(outcome)
    }

    /// Heal an actor. Returns the hit points restored.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] or
    /// [`GameError::MissingComponent`] if the actor has no health.
    pub fn heal(&mut self, target: EntityId, amount: u32) -> Result<u32> {
        self.require_health(target)?;
        let (restored, position) = match self.entities.get_mut(target) {
            Some(actor) => (
                actor.health.as_mut().map_or(0, |h| h.add_health(amount)),
                actor.position,
            ),
            None => (0, Vec2::ZERO),
        };
        if restored > 0 && self.config.feedback.damage_numbers {
            self.events.feedback.push(Feedback::FloatingText {
                text: format!("+{restored}"),
                position,
                color: Color::GREEN,
            });
        }
        Ok(restored)
    }

    /// Kill an actor. Returns `true` if this call caused the death; death
    /// side effects only ever run once.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] or
    /// [`GameError::MissingComponent`] if the actor has no health.
    pub fn kill(&mut self, target: EntityId) -> Result<bool> {
        self.require_health(target)?;
        let first = self
            .entities
            .get_mut(target)
            .and_then(|a| a.health.as_mut())
            .is_some_and(Damageable::die);
        if first {
            self.handle_death(target, None);
            self.settle_rewards(target);
        }
        Ok(first)
    }

    fn require_health(&self, id: EntityId) -> Result<()> {
        let actor = self.actor(id)?;
        if actor.health.is_none() {
            return Err(GameError::MissingComponent {
                entity: id,
                component: "health",
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advance the simulation by `real_dt` unscaled seconds.
    pub fn tick(&mut self, real_dt: f32) -> TickEvents {
        // 1. Input
        let intent = std::mem::take(&mut self.intent);
        if intent.pause {
            self.time.toggle_pause();
        }

        // 2. Time
        let scale = self.time.update(real_dt);
        if self.time.is_paused() {
            return self.finish_tick();
        }
        let frame = FrameTime::new(real_dt, scale);
        let dt = frame.scaled_dt;

        self.run_player_input(&intent, dt);

        // 3. Timers
        for action in self.scheduler.advance(&frame) {
            self.run_timer(action);
        }

        // 4. AI
        self.oracle.tick();
        let ids = self.entities.sorted_ids();
        self.run_ai_system(&ids, dt);

        // 5. Movement
        self.run_movement_system(&ids, dt);

        // 6. Combo timeout, then hits
        if let Some(ended) = self.combo.update(&frame) {
            self.events.combo.push(ended);
            self.events.feedback.push(Feedback::HudText {
                slot: HudSlot::Combo,
                text: String::new(),
            });
        }
        self.run_hit_system();

        // 7. Health
        self.run_health_system(dt);

        // 8. Momentum, camera
        self.run_momentum_system(&frame);
        let camera = self.camera.update(frame.real_dt);
        if camera != self.last_camera {
            self.last_camera = camera;
            self.events.feedback.push(Feedback::CameraOffset {
                offset: camera.offset,
                fisheye: camera.fisheye,
            });
        }

        // 9. Rooms
        self.run_room_activation();

        // 10. Cleanup
        self.run_cleanup_system();

        self.finish_tick()
    }

    fn finish_tick(&mut self) -> TickEvents {
        self.tick += 1;
        self.events.time_scale = self.time.time_scale();

        #[cfg(feature = "debug-validation")]
        self.validate_invariants();

        std::mem::take(&mut self.events)
    }

    fn run_player_input(&mut self, intent: &PlayerIntent, dt: f32) {
        self.player_attack.tick(dt);
        let Some(player_id) = self.player else {
            return;
        };
        let momentum = self.momentum.speed_multiplier();
        let Some(player) = self.entities.get_mut(player_id) else {
            return;
        };
        if !player.is_alive() {
            player.steer = Vec2::ZERO;
            return;
        }

        player.interacting = intent.interact;
        player.steer = if intent.interact {
            Vec2::ZERO
        } else {
            intent.move_axis.clamp_length(1.0)
        };
        if let Some(locomotion) = player.locomotion.as_mut() {
            locomotion.speed_multiplier = momentum;
        }

        let aim = match (intent.control_scheme, intent.aim) {
            (ControlScheme::KeyboardMouse, Some(cursor)) => Some(cursor - player.position),
            (ControlScheme::Gamepad, Some(stick)) => Some(stick),
            (_, None) => None,
        };
        let facing_x = aim.map_or(player.steer.x, |a| a.x);
        if facing_x.abs() > crate::math::EPSILON {
            player.facing = Vec2::new(facing_x.signum(), 0.0);
        }

        if intent.attack && self.player_attack.is_ready() && !intent.interact {
            match player.hitbox.as_mut() {
                Some(hitbox) => {
                    hitbox.arm();
                    self.player_attack.start(self.config.player.attack_cooldown);
                    self.scheduler.schedule(
                        ClockDomain::Scaled,
                        self.config.player.attack_active_window,
                        TimerAction::DisarmHitbox(player_id),
                    );
                    self.momentum.start_combat();
                }
                None => tracing::warn!(entity = player_id, "player has no hitbox; attack skipped"),
            }
        }
    }

    fn run_timer(&mut self, action: TimerAction) {
        match action {
            TimerAction::Despawn(id) => {
                if self.entities.contains(id) {
                    let _ = self.despawn(id);
                }
                return;
            }
            TimerAction::ArmHitbox(id) => {
                if let Some(hitbox) = self.entities.get_mut(id).and_then(|a| a.hitbox.as_mut()) {
                    hitbox.arm();
                }
            }
            TimerAction::DisarmHitbox(id) => {
                if let Some(hitbox) = self.entities.get_mut(id).and_then(|a| a.hitbox.as_mut()) {
                    hitbox.disarm();
                }
            }
            TimerAction::EndLunge(id) => {
                if let Some(locomotion) = self.entities.get_mut(id).and_then(|a| a.locomotion.as_mut())
                {
                    locomotion.end_lunge();
                }
            }
            TimerAction::FireShot { .. } => {}
            TimerAction::SpawnWave { room, wave } => {
                self.spawn_wave(room, wave);
                return;
            }
        }

        if let Some(id) = action.entity() {
            self.forward_timer_to_attacker(id, &action);
        }
    }

    fn forward_timer_to_attacker(&mut self, id: EntityId, action: &TimerAction) {
        let Some(actor) = self.entities.get(id) else {
            return;
        };
        if actor.enemy.is_none() || !actor.is_alive() {
            return;
        }
        let target = self.resolve_target_position(actor);
        let allies = self.allies_of(id);

        let commands = {
            let Some(actor) = self.entities.get_mut(id) else {
                return;
            };
            let (position, facing) = (actor.position, actor.facing);
            let Some(ai) = actor.enemy.as_mut() else {
                return;
            };
            let mut ctx = AttackContext {
                me: id,
                position,
                facing,
                target,
                allies: &allies,
                rng: &mut self.rng,
            };
            ai.archetype.on_timer(action, &mut ctx)
        };
        self.execute_commands(id, commands);
    }

    fn resolve_target_position(&self, actor: &Actor) -> Option<Vec2> {
        let target = actor.targeting.as_ref()?.target()?;
        self.entities
            .get(target)
            .filter(|t| t.is_alive())
            .map(|t| t.position)
    }

    fn allies_of(&self, id: EntityId) -> Vec<AllyStatus> {
        let Some(me) = self.entities.get(id) else {
            return Vec::new();
        };
        let mut allies: Vec<_> = self
            .entities
            .iter()
            .filter(|(other, a)| **other != id && a.faction.is_allied_with(me.faction) && a.is_alive())
            .filter_map(|(other, a)| {
                a.health.as_ref().map(|h| AllyStatus {
                    id: *other,
                    position: a.position,
                    health_fraction: h.fraction(),
                })
            })
            .collect();
        allies.sort_by_key(|a| a.id);
        allies
    }

    fn run_ai_system(&mut self, ids: &[EntityId], dt: f32) {
        let ai_config = self.config.ai.clone();
        for &id in ids {
            let Some(actor) = self.entities.get(id) else {
                continue;
            };
            if actor.enemy.is_none() || !actor.is_alive() {
                continue;
            }

            // Resolve the target reference; stale references are dropped.
            let current = actor.targeting.as_ref().and_then(|t| t.target());
            let valid = current
                .and_then(|t| self.entities.get(t))
                .filter(|t| t.is_alive())
                .map(|t| (t.id, t.position, t.interacting));
            let player = self
                .player
                .and_then(|p| self.entities.get(p))
                .filter(|p| p.is_alive())
                .map(|p| p.id);

            let Some(actor) = self.entities.get_mut(id) else {
                continue;
            };
            let targeting = actor.targeting.get_or_insert_with(Default::default);
            if current.is_some() && valid.is_none() {
                tracing::debug!(entity = id, "target lost");
                targeting.clear(ai_config.reacquire_interval);
            }
            targeting.tick(dt);
            let target_view = valid.map(|(_, position, interacting)| TargetView {
                position,
                interacting,
            });
            if targeting.should_reacquire() {
                match player {
                    Some(player) => targeting.set_target(player),
                    None => targeting.defer_reacquire(ai_config.reacquire_interval),
                }
            }
            if let Some(view) = target_view {
                targeting.observe(view.position);
            }

            let flying = actor.locomotion.as_ref().is_some_and(|l| l.flying);
            let input = AiInput {
                position: actor.position,
                facing: actor.facing,
                flying,
                target: target_view,
                dt,
                config: &ai_config,
            };
            let Some(ai) = actor.enemy.as_mut() else {
                continue;
            };
            let output = ai.think(&input, self.oracle.as_mut());
            actor.steer = output.steer;
            if let Some(face) = output.face {
                actor.facing = face;
            }
            if output.attack {
                self.begin_enemy_attack(id);
            }
        }
    }

    fn begin_enemy_attack(&mut self, id: EntityId) {
        let Some(actor) = self.entities.get(id) else {
            return;
        };
        let target = self.resolve_target_position(actor);
        let allies = self.allies_of(id);
        let commands = {
            let Some(actor) = self.entities.get_mut(id) else {
                return;
            };
            let (position, facing) = (actor.position, actor.facing);
            actor.steer = Vec2::ZERO;
            let Some(ai) = actor.enemy.as_mut() else {
                return;
            };
            let mut ctx = AttackContext {
                me: id,
                position,
                facing,
                target,
                allies: &allies,
                rng: &mut self.rng,
            };
            ai.archetype.begin_attack(&mut ctx)
        };
        self.execute_commands(id, commands);
    }

    fn execute_commands(&mut self, id: EntityId, commands: Vec<AttackCommand>) {
        for command in commands {
            match command {
                AttackCommand::Schedule { delay, action } => {
                    self.scheduler.schedule(ClockDomain::Scaled, delay, action);
                }
                AttackCommand::Lunge { velocity } => {
                    if let Some(locomotion) = self.entities.get_mut(id).and_then(|a| a.locomotion.as_mut())
                    {
                        locomotion.start_lunge(velocity);
                    }
                }
                AttackCommand::Recoil { impulse } => {
                    if let Some(locomotion) = self.entities.get_mut(id).and_then(|a| a.locomotion.as_mut())
                    {
                        locomotion.push(impulse);
                    }
                }
                AttackCommand::Fire { direction, weapon } => {
                    self.fire_projectile(id, direction, &weapon);
                }
                AttackCommand::Heal { target, amount } => {
                    if let Ok(restored) = self.heal(target, amount) {
                        if restored > 0 {
                            let position = self.entities.get(target).map_or(Vec2::ZERO, |a| a.position);
                            self.play_sound(self.config.sounds.heal.clone(), "heal", position);
                        }
                    }
                }
            }
        }
    }

    fn fire_projectile(&mut self, shooter: EntityId, direction: Vec2, weapon: &crate::enemy::WeaponStats) {
        let Some(owner) = self.entities.get(shooter) else {
            return;
        };
        let (origin, faction, radius) = (owner.position, owner.faction, owner.radius);
        let mut projectile = match self.build_actor(&weapon.projectile, origin) {
            Ok(actor) => actor,
            Err(err) => {
                tracing::warn!(entity = shooter, error = %err, "projectile template missing; shot skipped");
                return;
            }
        };
        projectile.kind = ActorKind::Projectile;
        projectile.position = origin + direction.normalize_or_zero() * radius;
        projectile.faction = faction;
        projectile.parent = Some(shooter);
        projectile.facing = direction;
        projectile.projectile = Some(Projectile::from_weapon(shooter, weapon, direction));
        let mut hitbox = projectile
            .hitbox
            .take()
            .unwrap_or_else(|| Hitbox::new(weapon.damage, projectile.radius, LayerMask::PLAYER));
        hitbox.base_damage = weapon.damage;
        hitbox.offset = Vec2::ZERO;
        hitbox.arm();
        projectile.hitbox = Some(hitbox);
        projectile.locomotion = None;

        let position = projectile.position;
        let id = self.spawn_actor(projectile);
        self.events.feedback.push(Feedback::Spawn {
            entity: Some(id),
            template: weapon.projectile.clone(),
            position,
        });
        self.play_sound(self.config.sounds.shot.clone(), "shot", origin);
    }

    fn run_movement_system(&mut self, ids: &[EntityId], dt: f32) {
        for &id in ids {
            let Some(actor) = self.entities.get_mut(id) else {
                continue;
            };
            if let Some(projectile) = actor.projectile.as_mut() {
                actor.velocity = projectile.velocity;
                actor.position += projectile.velocity * dt;
                if projectile.tick(dt) {
                    projectile.spend();
                }
                continue;
            }
            if actor.is_dead() {
                actor.velocity = Vec2::ZERO;
                continue;
            }
            if let Some(locomotion) = actor.locomotion.as_mut() {
                locomotion.tick(dt);
                let velocity = locomotion.velocity(actor.steer);
                actor.velocity = if velocity.is_finite() { velocity } else { Vec2::ZERO };
                actor.position += actor.velocity * dt;
            }
        }
    }

    fn run_hit_system(&mut self) {
        let mut overlaps = std::mem::take(&mut self.pending_overlaps);
        overlaps.extend(self.detect_overlaps());
        for (attacker, target) in overlaps {
            if let Err(reason) = self.resolve_hit(attacker, target) {
                if !matches!(reason, HitRejection::AlreadyHit | HitRejection::Disarmed) {
                    tracing::trace!(attacker, target, ?reason, "hit rejected");
                }
            }
        }
    }

    fn detect_overlaps(&self) -> Vec<(EntityId, EntityId)> {
        let ids = self.entities.sorted_ids();
        let mut overlaps = Vec::new();
        for &attacker_id in &ids {
            let Some(attacker) = self.entities.get(attacker_id) else {
                continue;
            };
            let Some(hitbox) = attacker.hitbox.as_ref().filter(|h| h.is_armed()) else {
                continue;
            };
            if attacker.is_dead() || attacker.projectile.as_ref().is_some_and(Projectile::is_spent) {
                continue;
            }
            let center = hitbox.center(attacker.position, attacker.facing);
            for &target_id in &ids {
                if target_id == attacker_id || hitbox.has_hit(target_id) {
                    continue;
                }
                let Some(target) = self.entities.get(target_id) else {
                    continue;
                };
                if !target.is_alive() || !hitbox.mask.intersects(target.layer) {
                    continue;
                }
                let reach = hitbox.radius + target.radius;
                if center.distance_squared(target.position) <= reach * reach {
                    overlaps.push((attacker_id, target_id));
                }
            }
        }
        overlaps
    }

    fn attacker_view(&self, attacker: &Actor) -> Option<AttackerView> {
        let hitbox = attacker.hitbox.as_ref()?;
        let (owner, direction, ranged) = match &attacker.projectile {
            Some(projectile) => (projectile.owner, projectile.velocity.normalize_or_zero(), true),
            None => (attacker.id, hitbox.direction(attacker.facing), false),
        };
        Some(AttackerView {
            owner,
            party: HitParty {
                id: attacker.id,
                faction: attacker.faction,
                layer: attacker.layer,
            },
            position: attacker.position,
            velocity: attacker.velocity,
            direction,
            base_damage: hitbox.base_damage,
            knockback: hitbox.knockback,
            mask: hitbox.mask,
            ranged,
        })
    }

    /// Resolve one attacker/target overlap completely.
    fn resolve_hit(&mut self, attacker_id: EntityId, target_id: EntityId) -> std::result::Result<(), HitRejection> {
        let attacker = self.entities.get(attacker_id).ok_or(HitRejection::NotDamageable)?;
        let view = self.attacker_view(attacker).ok_or(HitRejection::Disarmed)?;
        if attacker.projectile.as_ref().is_some_and(Projectile::is_spent) {
            return Err(HitRejection::Disarmed);
        }
        let target = self.entities.get(target_id).ok_or(HitRejection::NotDamageable)?;
        if !target.is_alive() {
            return Err(HitRejection::NotDamageable);
        }
        let target_party = HitParty {
            id: target_id,
            faction: target.faction,
            layer: target.layer,
        };
        let target_position = target.position;

        let parent_of = |id: EntityId| self.entities.get(id).and_then(|a| a.parent);
        let related = in_same_hierarchy(attacker_id, target_id, parent_of)
            || in_same_hierarchy(view.owner, target_id, parent_of);
        self.filter.evaluate(view.party, target_party, view.mask, related)?;

        self.hitbox_mut(attacker_id)
            .map_err(|_| HitRejection::Disarmed)?
            .try_register(target_id)?;

        let from_player = self.player == Some(view.owner);
        let prior_hits = if from_player { self.combo.current_count() } else { 0 };
        let multiplier = speed_multiplier(view.velocity, view.direction, self.config.hit.speed_log_scale);
        let damage = compute_damage(view.base_damage, multiplier, prior_hits, &self.config.hit);

        let outcome = self.damage_internal(target_id, damage, view.direction, Some(view.owner));
        let DamageOutcome::Applied { applied, killed, .. } = outcome else {
            return Ok(());
        };

        if view.ranged {
            if let Some(projectile) = self.entities.get_mut(attacker_id).and_then(|a| a.projectile.as_mut()) {
                projectile.spend();
            }
        }

        let impulse = knockback_impulse(
            view.direction,
            view.position,
            target_position,
            view.knockback,
            self.config.hit.knockback_target_weight,
        );
        let hit_stun = self.config.hit.hit_stun;
        if let Some(target) = self.entities.get_mut(target_id) {
            if let Some(locomotion) = target.locomotion.as_mut() {
                locomotion.push(impulse);
                if target.kind == ActorKind::Enemy {
                    locomotion.apply_stun(hit_stun);
                }
            }
        }

        // Combo first so the event carries the post-hit count.
        let combo_count = if from_player {
            let event = self.combo.register_hit();
            self.events.combo.push(event);
            if let Some(text) = self.combo.display_text() {
                self.events.feedback.push(Feedback::HudText {
                    slot: HudSlot::Combo,
                    text,
                });
            }
            event.count()
        } else {
            0
        };

        let hit = HitEvent {
            attacker: view.owner,
            target: target_id,
            damage: applied,
            speed_multiplier: multiplier,
            killing_blow: killed,
            position: target_position,
            ranged: view.ranged,
            combo_count,
        };
        self.on_hit.emit(&hit);

        let player_involved = from_player || self.player == Some(target_id);
        if player_involved {
            self.momentum.start_combat();
            let fb = HitFeedback::from_hit(&hit, &self.config.feedback);
            self.time.do_hit_stop(fb.hit_stop);
            if let Some(factor) = fb.slow_motion {
                self.time.do_slow_motion(factor);
            }
            self.camera.add_shake(fb.shake);
            if fb.kickback > 0.0 {
                self.camera.kick(view.direction, fb.kickback);
            }
            if fb.fisheye > 0.0 {
                self.camera.pulse_fisheye(fb.fisheye);
            }
        }
        self.events.hits.push(hit);

        if killed {
            self.settle_rewards(target_id);
        }
        Ok(())
    }

    /// Apply damage and run hurt feedback and the death transition.
    fn damage_internal(
        &mut self,
        target_id: EntityId,
        amount: u32,
        direction: Vec2,
        attacker: Option<EntityId>,
    ) -> DamageOutcome {
        let Some(target) = self.entities.get_mut(target_id) else {
            return DamageOutcome::AlreadyDead;
        };
        let Some(health) = target.health.as_mut() else {
            return DamageOutcome::AlreadyDead;
        };
        let outcome = health.take_damage(amount, direction);
        let DamageOutcome::Applied {
            applied,
            remaining,
            killed,
            ..
        } = outcome
        else {
            return outcome;
        };
        if attacker.is_some() {
            target.last_attacker = attacker;
        }
        let position = target.position;

        let taken = DamageTaken {
            entity: target_id,
            amount: applied,
            remaining,
            direction,
        };
        self.on_damage.emit(&taken);
        self.events.damage.push(taken);

        self.tint(target_id, self.config.health.flash_color);
        self.play_sound(self.config.sounds.hurt.clone(), "hurt", position);
        if self.config.feedback.damage_numbers && applied > 0 {
            self.events.feedback.push(Feedback::FloatingText {
                text: applied.to_string(),
                position,
                color: Color::WHITE,
            });
        }

        if killed {
            self.handle_death(target_id, attacker);
        }
        outcome
    }

    /// Side effects of the alive-to-dead transition. Callers guarantee
    /// this runs once per actor by only calling it when `die()` reported
    /// the first transition.
    fn handle_death(&mut self, id: EntityId, killer: Option<EntityId>) {
        let Some(actor) = self.entities.get_mut(id) else {
            return;
        };
        let killer = killer.or(actor.last_attacker);
        let (kind, position) = (actor.kind, actor.position);
        let effect = actor.death_effect.clone();
        if let Some(hitbox) = actor.hitbox.as_mut() {
            hitbox.disarm();
        }
        if let Some(locomotion) = actor.locomotion.as_mut() {
            locomotion.end_lunge();
        }
        actor.steer = Vec2::ZERO;
        if let Some(ai) = actor.enemy.as_mut() {
            ai.die(self.oracle.as_mut());
        }
        self.scheduler.cancel_for(id);

        tracing::info!(entity = id, ?kind, ?killer, "actor died");
        let death = DeathEvent {
            entity: id,
            kind,
            killer,
            position,
        };
        self.on_death.emit(&death);
        self.events.deaths.push(death);

        match effect {
            Some(template) => self.events.feedback.push(Feedback::Spawn {
                entity: None,
                template,
                position,
            }),
            None => tracing::debug!(entity = id, "no death effect configured"),
        }
        self.play_sound(self.config.sounds.death.clone(), "death", position);

        self.advance_rooms_on_removal(id);

        if Some(id) != self.player {
            self.scheduler.schedule(
                ClockDomain::Scaled,
                self.config.health.despawn_delay,
                TimerAction::Despawn(id),
            );
        }
    }

    /// Score, momentum, floating text and loot for a dead enemy. Runs at
    /// most once per actor.
    fn settle_rewards(&mut self, id: EntityId) {
        let Some(actor) = self.entities.get_mut(id) else {
            return;
        };
        let position = actor.position;
        let Some(ai) = actor.enemy.as_mut() else {
            return;
        };
        if !ai.claim_reward() {
            return;
        }
        let (base, loot) = (ai.score_value, ai.loot.clone());

        let combo = self.combo.current_count();
        if let Some(points) = self.score.award_kill(id, base, combo) {
            if points > 0 {
                self.momentum.add_score(points);
                self.events.feedback.push(Feedback::FloatingText {
                    text: format!("+{points}"),
                    position,
                    color: Color::rgb(1.0, 0.85, 0.2),
                });
                self.events.feedback.push(Feedback::HudText {
                    slot: HudSlot::Score,
                    text: self.score.total().to_string(),
                });
                self.push_momentum_feedback();
            }
        }

        // Loot without a template is a host prefab, like death effects.
        if let Some(loot) = loot {
            if self.config.templates.contains_key(&loot) {
                if let Err(err) = self.spawn_template(&loot, position) {
                    tracing::warn!(entity = id, error = %err, "loot skipped");
                }
            } else {
                self.events.feedback.push(Feedback::Spawn {
                    entity: None,
                    template: loot,
                    position,
                });
            }
        }
    }

    fn advance_rooms_on_removal(&mut self, id: EntityId) {
        for index in 0..self.rooms.len() {
            let progress = self.rooms[index].on_death(id);
            if let Some(progress) = progress {
                self.apply_room_progress(index, progress);
            }
        }
    }

    fn apply_room_progress(&mut self, room: usize, progress: RoomProgress) {
        match progress {
            RoomProgress::ScheduleWave { wave, delay } => {
                self.scheduler
                    .schedule(ClockDomain::Scaled, delay, TimerAction::SpawnWave { room, wave });
            }
            RoomProgress::Cleared => {
                let name = self.rooms.get(room).map(|r| r.name.clone()).unwrap_or_default();
                tracing::info!(room, %name, "room cleared");
                self.events.rooms.push(RoomEvent::Cleared(room));
            }
        }
    }

    fn spawn_wave(&mut self, room: usize, wave: usize) {
        let Some(entries) = self.rooms.get(room).map(|r| r.wave_entries(wave).to_vec()) else {
            return;
        };
        let mut ids = Vec::with_capacity(entries.len());
        for entry in &entries {
            match self.spawn_template(&entry.template, entry.position) {
                Ok(id) => ids.push(id),
                Err(err) => tracing::warn!(room, wave, error = %err, "wave entry skipped"),
            }
        }
        tracing::debug!(room, wave, spawned = ids.len(), "wave spawned");
        self.events.rooms.push(RoomEvent::WaveSpawned { room, wave });
        let progress = self.rooms.get_mut(room).and_then(|r| r.wave_spawned(wave, &ids));
        if let Some(progress) = progress {
            self.apply_room_progress(room, progress);
        }
    }

    fn run_room_activation(&mut self) {
        let Some(position) = self
            .player
            .and_then(|p| self.entities.get(p))
            .filter(|p| p.is_alive())
            .map(|p| p.position)
        else {
            return;
        };
        for index in 0..self.rooms.len() {
            if !self.rooms[index].contains(position) {
                continue;
            }
            if let Some(progress) = self.rooms[index].activate() {
                tracing::debug!(room = index, "room activated");
                self.events.rooms.push(RoomEvent::Activated(index));
                self.apply_room_progress(index, progress);
            }
        }
    }

    fn run_health_system(&mut self, dt: f32) {
        for id in self.entities.sorted_ids() {
            let Some(actor) = self.entities.get_mut(id) else {
                continue;
            };
            let Some(health) = actor.health.as_mut() else {
                continue;
            };
            let tick = health.tick(dt);
            if tick.flash_ended {
                let base = actor.sprite.map(|s| s.base_tint);
                if let Some(color) = base {
                    self.events.feedback.push(Feedback::Tint { entity: id, color });
                }
            }
        }
    }

    fn run_momentum_system(&mut self, frame: &FrameTime) {
        match self.momentum.update(frame) {
            MomentumTick::Steady => {}
            MomentumTick::Decayed => self.push_momentum_feedback(),
            MomentumTick::Depleted => {
                self.push_momentum_feedback();
                if let Some(player) = self.player {
                    if self.entities.get(player).is_some_and(|p| p.health.is_some()) {
                        let _ = self.kill(player);
                    }
                }
            }
        }
    }

    fn push_momentum_feedback(&mut self) {
        self.events.feedback.push(Feedback::HudText {
            slot: HudSlot::Momentum,
            text: self.momentum.display_text(),
        });
        if let Some(player) = self.player {
            self.events.feedback.push(Feedback::AnimationSpeed {
                entity: player,
                speed: self.momentum.speed_multiplier(),
            });
        }
    }

    fn run_cleanup_system(&mut self) {
        let kill_plane = self.config.world.kill_plane_y;
        let mut removals = Vec::new();
        for id in self.entities.sorted_ids() {
            let Some(actor) = self.entities.get(id) else {
                continue;
            };
            if actor.projectile.as_ref().is_some_and(Projectile::is_spent) {
                removals.push(id);
                continue;
            }
            if actor.position.y >= kill_plane && actor.position.is_finite() {
                continue;
            }
            if actor.is_alive() {
                tracing::debug!(entity = id, "fell below the kill plane");
                let _ = self.kill(id);
            }
            if Some(id) != self.player {
                removals.push(id);
            }
        }
        for id in removals {
            let _ = self.despawn(id);
        }
    }

    fn tint(&mut self, id: EntityId, color: Color) {
        match self.entities.get(id) {
            Some(actor) if actor.sprite.is_some() => {
                self.events.feedback.push(Feedback::Tint { entity: id, color });
            }
            Some(_) => tracing::warn!(entity = id, "no sprite renderer; hurt flash skipped"),
            None => {}
        }
    }

    fn play_sound(&mut self, cue: Option<String>, what: &'static str, position: Vec2) {
        match cue {
            Some(cue) => self.events.feedback.push(Feedback::PlaySound { cue, position }),
            None => tracing::warn!(sound = what, "no sound cue configured; skipped"),
        }
    }

    /// Hash of the simulation state for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);

        let ids = self.entities.sorted_ids();
        ids.len().hash(&mut hasher);
        for id in ids {
            let Some(actor) = self.entities.get(id) else {
                continue;
            };
            id.hash(&mut hasher);
            actor.position.x.to_bits().hash(&mut hasher);
            actor.position.y.to_bits().hash(&mut hasher);
            actor.velocity.x.to_bits().hash(&mut hasher);
            actor.velocity.y.to_bits().hash(&mut hasher);
            if let Some(health) = &actor.health {
                health.current().hash(&mut hasher);
                health.is_dead().hash(&mut hasher);
            }
            if let Some(ai) = &actor.enemy {
                ai.state().hash(&mut hasher);
            }
        }

        self.time.time_scale().to_bits().hash(&mut hasher);
        self.combo.current_count().hash(&mut hasher);
        self.momentum.value().to_bits().hash(&mut hasher);
        self.score.total().hash(&mut hasher);
        hasher.finish()
    }

    /// Check internal invariants. Panics with a description on violation.
    #[cfg(feature = "debug-validation")]
    pub fn validate_invariants(&self) {
        for (id, actor) in self.entities.iter() {
            if let Some(health) = &actor.health {
                assert!(health.current() <= health.max(), "actor {id} above max health");
                if health.is_dead() {
                    assert_eq!(health.current(), 0, "dead actor {id} has health");
                }
            }
        }
        let scale = self.time.time_scale();
        assert!((0.0..=1.0).contains(&scale), "time scale {scale} out of range");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Faction;
    use crate::events::ComboEvent;
    use std::sync::{Arc, Mutex};

    const DT: f32 = 1.0 / 60.0;

    fn world() -> CombatWorld {
        CombatWorld::new(CombatConfig::default(), 42).unwrap()
    }

    fn dummy(world: &mut CombatWorld, position: Vec2, max: u32) -> EntityId {
        world.spawn_actor(
            Actor::new(ActorKind::Enemy, position)
                .with_faction(Faction::Enemy, LayerMask::ENEMY)
                .with_health(HealthPool::new(max))
                .with_sprite(),
        )
    }

    #[test]
    fn test_scenario_damage_then_kill() {
        let mut world = world();
        let target = dummy(&mut world, Vec2::ZERO, 100);
        let deaths = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&deaths);
        world.on_death(move |_| *counter.lock().unwrap() += 1);

        world.apply_damage(target, 25, Vec2::RIGHT).unwrap();
        assert_eq!(world.get(target).unwrap().health.as_ref().unwrap().current(), 75);

        let outcome = world.apply_damage(target, 100, Vec2::RIGHT).unwrap();
        assert!(outcome.killed());
        assert!(world.get(target).unwrap().is_dead());

        world.apply_damage(target, 10, Vec2::RIGHT).unwrap();
        assert!(!world.kill(target).unwrap());
        let events = world.tick(DT);
        assert_eq!(events.deaths.len(), 1);
        assert_eq!(*deaths.lock().unwrap(), 1);
    }

    #[test]
    fn test_dead_actor_despawns_after_delay() {
        let mut world = world();
        let target = dummy(&mut world, Vec2::ZERO, 10);
        world.kill(target).unwrap();

        let mut despawned = false;
        for _ in 0..60 {
            despawned |= world.tick(DT).despawned.contains(&target);
        }
        assert!(despawned);
        assert!(world.get(target).is_none());
    }

    #[test]
    fn test_player_melee_hits_once_per_swing() {
        let mut world = world();
        let player = world.spawn_player(Vec2::ZERO).unwrap();
        let target = dummy(&mut world, Vec2::new(1.0, 0.0), 100);

        world.apply_player_intent(PlayerIntent {
            attack: true,
            ..PlayerIntent::default()
        });
        let mut hits = 0;
        for _ in 0..20 {
            hits += world.tick(DT).hits.iter().filter(|h| h.target == target).count();
        }
        assert_eq!(hits, 1);
        assert_eq!(world.combo().current_count(), 1);
        assert!(world.momentum().combat_started());
        assert!(world.get(player).unwrap().is_alive());
    }

    #[test]
    fn test_hit_triggers_hit_stop() {
        let mut world = world();
        world.spawn_player(Vec2::ZERO).unwrap();
        dummy(&mut world, Vec2::new(1.0, 0.0), 100);

        world.apply_player_intent(PlayerIntent {
            attack: true,
            ..PlayerIntent::default()
        });
        world.tick(DT);
        let events = world.tick(DT);
        assert!(events.time_scale < 1.0);

        for _ in 0..120 {
            world.tick(DT);
        }
        assert_eq!(world.time_scale(), 1.0);
    }

    #[test]
    fn test_report_overlap_respects_factions() {
        let mut world = world();
        let a = dummy(&mut world, Vec2::ZERO, 10);
        let b = dummy(&mut world, Vec2::new(5.0, 0.0), 10);
        world.get_mut(a).unwrap().hitbox = Some(Hitbox::new(5, 1.0, LayerMask::ALL));
        world.arm_hitbox(a).unwrap();

        world.report_overlap(a, b).unwrap();
        assert!(world.tick(DT).hits.is_empty());

        world.get_mut(b).unwrap().faction = Faction::Neutral;
        world.report_overlap(a, b).unwrap();
        assert_eq!(world.tick(DT).hits.len(), 1);
    }

    #[test]
    fn test_missing_entity_errors() {
        let mut world = world();
        assert!(matches!(
            world.apply_damage(99, 1, Vec2::ZERO),
            Err(GameError::EntityNotFound(99))
        ));
        let prop = world.spawn_actor(Actor::new(ActorKind::Prop, Vec2::ZERO));
        assert!(matches!(
            world.kill(prop),
            Err(GameError::MissingComponent { .. })
        ));
        assert!(matches!(
            world.spawn_template("dragon", Vec2::ZERO),
            Err(GameError::UnknownTemplate(_))
        ));
    }

    #[test]
    fn test_kill_plane() {
        let mut world = world();
        let enemy = dummy(&mut world, Vec2::new(0.0, -100.0), 10);
        let events = world.tick(DT);
        assert_eq!(events.deaths.len(), 1);
        assert!(events.despawned.contains(&enemy));
    }

    #[test]
    fn test_momentum_depletion_kills_player() {
        let mut config = CombatConfig::default();
        config.momentum.decay_amount = 0.5;
        let mut world = CombatWorld::new(config, 1).unwrap();
        let player = world.spawn_player(Vec2::ZERO).unwrap();
        world.apply_player_intent(PlayerIntent {
            attack: true,
            ..PlayerIntent::default()
        });

        let mut died = false;
        for _ in 0..(3 * 60) {
            died |= world.tick(DT).deaths.iter().any(|d| d.entity == player);
        }
        assert!(died);
        assert!(world.get(player).unwrap().is_dead());
    }

    #[test]
    fn test_hit_on_timeout_frame_starts_fresh_combo() {
        let mut world = world();
        world.spawn_player(Vec2::ZERO).unwrap();
        let target = dummy(&mut world, Vec2::new(0.8, 0.0), 1_000);

        world.apply_player_intent(PlayerIntent {
            attack: true,
            ..PlayerIntent::default()
        });
        let first = world.tick(DT).hits[0].damage;
        assert_eq!(world.combo().current_count(), 1);

        // Stop one frame short of the timeout.
        while world.combo().current().is_some_and(|c| c.remaining() > DT) {
            world.tick(DT);
        }
        assert_eq!(world.time_scale(), 1.0);

        let dummy = world.get_mut(target).unwrap();
        dummy.position = Vec2::new(0.8, 0.0);
        dummy.velocity = Vec2::ZERO;
        let hp_before = dummy.health.as_ref().unwrap().current();
        world.apply_player_intent(PlayerIntent {
            attack: true,
            ..PlayerIntent::default()
        });
        let events = world.tick(DT);

        assert_eq!(
            events.combo,
            vec![ComboEvent::Ended { count: 1 }, ComboEvent::Started { count: 1 }]
        );
        let hit = events.hits.iter().find(|h| h.target == target).unwrap();
        assert_eq!(hit.combo_count, 1);
        assert_eq!(hit.damage, first);
        assert_eq!(
            world.get(target).unwrap().health.as_ref().unwrap().current(),
            hp_before - hit.damage
        );
    }

    #[test]
    fn test_state_hash_tracks_changes() {
        let mut a = world();
        let mut b = world();
        dummy(&mut a, Vec2::ZERO, 10);
        dummy(&mut b, Vec2::ZERO, 10);
        assert_eq!(a.state_hash(), b.state_hash());

        a.apply_damage(1, 3, Vec2::ZERO).unwrap();
        assert_ne!(a.state_hash(), b.state_hash());
    }
}
