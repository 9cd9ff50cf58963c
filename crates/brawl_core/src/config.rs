//! Tunable combat configuration.
//!
//! Every tunable lives in [`CombatConfig`], loaded from RON. All sections
//! use `#[serde(default)]`, so a config file only needs to name the values
//! it changes.
//!
//! ```
//! use brawl_core::config::CombatConfig;
//!
//! let config = CombatConfig::from_ron_str("(combo: (timeout: 3.0))").unwrap();
//! assert_eq!(config.combo.timeout, 3.0);
//! assert!(config.validate().is_ok());
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::clock::ClockDomain;
use crate::components::{ActorKind, Color, Faction, LayerMask};
use crate::enemy::{ArchetypeSpec, DroneProfile, MeleeProfile, WeaponStats};
use crate::error::{GameError, Result};
use crate::hitbox::FriendlyFire;
use crate::math::Vec2;

/// Damage computation tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitConfig {
    /// Weight of the logarithmic speed term.
    pub speed_log_scale: f32,
    /// Extra damage fraction per prior hit in the active combo.
    pub combo_damage_per_hit: f32,
    /// Upper bound of the combo damage factor.
    pub max_combo_damage_factor: f32,
    /// Whether hits between allied factions land.
    pub friendly_fire: FriendlyFire,
    /// Weight of the to-target direction in the knockback blend.
    pub knockback_target_weight: f32,
    /// Seconds an enemy's movement is blocked after taking a hit.
    pub hit_stun: f32,
}

impl Default for HitConfig {
    fn default() -> Self {
        Self {
            speed_log_scale: 0.5,
            combo_damage_per_hit: 0.1,
            max_combo_damage_factor: 2.0,
            friendly_fire: FriendlyFire::Deny,
            knockback_target_weight: 1.0,
            hit_stun: 0.2,
        }
    }
}

/// How strongly a hit drives the global feedback systems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Hit-stop seconds at speed multiplier 1.
    pub hit_stop_base: f32,
    /// Upper bound of a single hit-stop.
    pub hit_stop_max: f32,
    /// Slow-motion factor requested at speed multiplier 1.
    pub slow_motion_factor: f32,
    /// Only killing blows request slow motion.
    pub slow_motion_on_kill_only: bool,
    /// Shake trauma added at speed multiplier 1.
    pub shake_base: f32,
    /// Camera kickback strength for ranged shots.
    pub kickback_strength: f32,
    /// Fisheye pulse on killing blows.
    pub fisheye_on_kill: f32,
    /// Multiplier applied to every effect on a killing blow.
    pub kill_boost: f32,
    /// Emit floating damage numbers.
    pub damage_numbers: bool,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            hit_stop_base: 0.05,
            hit_stop_max: 0.25,
            slow_motion_factor: 0.4,
            slow_motion_on_kill_only: true,
            shake_base: 0.2,
            kickback_strength: 0.3,
            fisheye_on_kill: 0.3,
            kill_boost: 1.5,
            damage_numbers: true,
        }
    }
}

/// Combo streak tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComboConfig {
    /// Seconds without a hit before the combo ends.
    pub timeout: f32,
    /// Clock the timeout runs on.
    pub clock: ClockDomain,
    /// Minimum count before the HUD shows the combo.
    pub display_threshold: u32,
}

impl Default for ComboConfig {
    fn default() -> Self {
        Self {
            timeout: 2.0,
            clock: ClockDomain::Scaled,
            display_threshold: 2,
        }
    }
}

/// Time dilation tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// Time scale during hit-stop.
    pub hit_stop_scale: f32,
    /// Lowest slow-motion factor accepted.
    pub min_slow_motion: f32,
    /// Real seconds slow motion holds before recovering.
    pub slow_motion_hold: f32,
    /// Real seconds the ramp from the slow factor back to 1 takes.
    pub recovery_duration: f32,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            hit_stop_scale: 0.02,
            min_slow_motion: 0.05,
            slow_motion_hold: 0.3,
            recovery_duration: 0.5,
        }
    }
}

/// Camera feedback tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Trauma lost per real second.
    pub shake_decay: f32,
    /// Offset at full trauma.
    pub max_shake_offset: f32,
    /// Oscillation speed of the shake.
    pub shake_frequency: f32,
    /// Spring stiffness pulling the kickback offset home.
    pub kickback_stiffness: f32,
    /// Spring damping of the kickback offset.
    pub kickback_damping: f32,
    /// Fisheye strength lost per real second.
    pub fisheye_recovery: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            shake_decay: 2.5,
            max_shake_offset: 0.6,
            shake_frequency: 25.0,
            kickback_stiffness: 120.0,
            kickback_damping: 18.0,
            fisheye_recovery: 1.5,
        }
    }
}

/// Momentum multiplier tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumConfig {
    /// Starting value.
    pub initial: f32,
    /// Upper bound.
    pub max: f32,
    /// Amount removed per decay step.
    pub decay_amount: f32,
    /// Seconds between decay steps.
    pub decay_interval: f32,
    /// Momentum gained per score point.
    pub gain_per_point: f32,
    /// Clock the decay cadence runs on.
    pub clock: ClockDomain,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            initial: 1.0,
            max: 3.0,
            decay_amount: 0.05,
            decay_interval: 1.0,
            gain_per_point: 0.002,
            clock: ClockDomain::Real,
        }
    }
}

/// Hurt feedback tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthFeedbackConfig {
    /// Seconds the hurt tint shows.
    pub flash_duration: f32,
    /// Hurt tint.
    pub flash_color: Color,
    /// Seconds of invulnerability after each applied hit.
    pub invulnerability: f32,
    /// Seconds after death before the actor is removed.
    pub despawn_delay: f32,
}

impl Default for HealthFeedbackConfig {
    fn default() -> Self {
        Self {
            flash_duration: 0.1,
            flash_color: Color::RED,
            invulnerability: 0.0,
            despawn_delay: 0.6,
        }
    }
}

/// Enemy AI cadence tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Seconds between path requests while approaching.
    pub path_recompute_interval: f32,
    /// Seconds between target re-acquisition attempts.
    pub reacquire_interval: f32,
    /// Distance at which a waypoint counts as reached.
    pub waypoint_tolerance: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            path_recompute_interval: 0.5,
            reacquire_interval: 1.0,
            waypoint_tolerance: 0.3,
        }
    }
}

/// Player attack tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Template spawned for the player.
    pub template: String,
    /// Seconds between attacks.
    pub attack_cooldown: f32,
    /// Seconds the hitbox stays armed per attack.
    pub attack_active_window: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            template: "player".to_string(),
            attack_cooldown: 0.35,
            attack_active_window: 0.15,
        }
    }
}

/// World bounds and cleanup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Actors below this height are out of bounds.
    pub kill_plane_y: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self { kill_plane_y: -50.0 }
    }
}

/// Names of one-shot audio cues. A missing cue skips the sound.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    /// Played when an actor takes damage.
    pub hurt: Option<String>,
    /// Played when an actor dies.
    pub death: Option<String>,
    /// Played when a shooter fires.
    pub shot: Option<String>,
    /// Played when a drone heals.
    pub heal: Option<String>,
}

/// Hitbox layout of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitboxTemplate {
    /// Damage before multipliers.
    pub base_damage: u32,
    /// Centre offset along the facing direction.
    pub offset: Vec2,
    /// Radius of the volume.
    pub radius: f32,
    /// Knockback direction for a right-facing attacker.
    pub attack_direction: Vec2,
    /// Knockback impulse strength.
    pub knockback: f32,
    /// Layers this hitbox hits.
    pub mask: LayerMask,
}

impl Default for HitboxTemplate {
    fn default() -> Self {
        Self {
            base_damage: 10,
            offset: Vec2::new(0.8, 0.0),
            radius: 0.7,
            attack_direction: Vec2::new(1.0, 0.3),
            knockback: 4.0,
            mask: LayerMask::ENEMY.with(LayerMask::PROP),
        }
    }
}

/// Enemy-specific part of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyTemplate {
    /// Vision radius.
    pub vision_radius: f32,
    /// Vision half-angle in degrees.
    pub vision_half_angle_deg: f32,
    /// Distance at which the enemy attacks.
    pub attack_range: f32,
    /// Seconds between attacks.
    pub attack_cooldown: f32,
    /// Score awarded on death.
    pub score_value: u32,
    /// Template or host prefab dropped on death.
    pub loot: Option<String>,
    /// Attack behaviour.
    pub archetype: ArchetypeSpec,
}

/// Blueprint an actor is instantiated from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorTemplate {
    /// Classification.
    pub kind: ActorKind,
    /// Allegiance.
    pub faction: Faction,
    /// Collision layer.
    pub layer: LayerMask,
    /// Body radius for overlap checks.
    pub radius: f32,
    /// Maximum health; `None` for actors that cannot be hurt.
    pub max_health: Option<u32>,
    /// Health regenerated per second.
    pub regen_per_second: f32,
    /// Seconds without damage before regeneration.
    pub regen_delay: f32,
    /// Movement speed.
    pub move_speed: f32,
    /// Ignores gravity-bound movement (drones).
    pub flying: bool,
    /// Has a tintable sprite.
    pub sprite: bool,
    /// Attack volume.
    pub hitbox: Option<HitboxTemplate>,
    /// AI section; `None` for non-enemies.
    pub enemy: Option<EnemyTemplate>,
    /// Effect template spawned on death.
    pub death_effect: Option<String>,
}

impl Default for ActorTemplate {
    fn default() -> Self {
        Self {
            kind: ActorKind::Prop,
            faction: Faction::Neutral,
            layer: LayerMask::PROP,
            radius: 0.5,
            max_health: None,
            regen_per_second: 0.0,
            regen_delay: 0.0,
            move_speed: 0.0,
            flying: false,
            sprite: true,
            hitbox: None,
            enemy: None,
            death_effect: None,
        }
    }
}

impl ActorTemplate {
    /// The player character.
    #[must_use]
    pub fn player() -> Self {
        Self {
            kind: ActorKind::Player,
            faction: Faction::Player,
            layer: LayerMask::PLAYER,
            radius: 0.5,
            max_health: Some(100),
            regen_per_second: 2.0,
            regen_delay: 4.0,
            move_speed: 6.0,
            hitbox: Some(HitboxTemplate {
                base_damage: 12,
                ..HitboxTemplate::default()
            }),
            death_effect: Some("player_burst".to_string()),
            ..Self::default()
        }
    }

    fn enemy(max_health: u32, move_speed: f32, enemy: EnemyTemplate) -> Self {
        Self {
            kind: ActorKind::Enemy,
            faction: Faction::Enemy,
            layer: LayerMask::ENEMY,
            radius: 0.5,
            max_health: Some(max_health),
            move_speed,
            death_effect: Some("enemy_burst".to_string()),
            enemy: Some(enemy),
            ..Self::default()
        }
    }

    /// Melee grunt that lunges at the player.
    #[must_use]
    pub fn grunt() -> Self {
        Self {
            hitbox: Some(HitboxTemplate {
                base_damage: 10,
                mask: LayerMask::PLAYER,
                ..HitboxTemplate::default()
            }),
            ..Self::enemy(
                30,
                3.5,
                EnemyTemplate {
                    vision_radius: 8.0,
                    vision_half_angle_deg: 75.0,
                    attack_range: 1.4,
                    attack_cooldown: 1.2,
                    score_value: 100,
                    loot: None,
                    archetype: ArchetypeSpec::Melee(MeleeProfile::default()),
                },
            )
        }
    }

    /// Ranged enemy firing bursts.
    #[must_use]
    pub fn gunner() -> Self {
        Self::enemy(
            24,
            2.5,
            EnemyTemplate {
                vision_radius: 12.0,
                vision_half_angle_deg: 60.0,
                attack_range: 8.0,
                attack_cooldown: 2.0,
                score_value: 150,
                loot: Some("health_pickup".to_string()),
                archetype: ArchetypeSpec::Shooter(WeaponStats::default()),
            },
        )
    }

    /// Flying support drone that heals allies and keeps its distance.
    #[must_use]
    pub fn drone() -> Self {
        Self {
            flying: true,
            radius: 0.35,
            ..Self::enemy(
                16,
                4.0,
                EnemyTemplate {
                    vision_radius: 10.0,
                    vision_half_angle_deg: 180.0,
                    attack_range: 5.0,
                    attack_cooldown: 3.0,
                    score_value: 120,
                    loot: None,
                    archetype: ArchetypeSpec::Drone(DroneProfile::default()),
                },
            )
        }
    }

    /// Enemy projectile body.
    #[must_use]
    pub fn bullet() -> Self {
        Self {
            kind: ActorKind::Projectile,
            faction: Faction::Enemy,
            layer: LayerMask::NONE,
            radius: 0.15,
            sprite: false,
            flying: true,
            hitbox: Some(HitboxTemplate {
                offset: Vec2::ZERO,
                radius: 0.15,
                attack_direction: Vec2::RIGHT,
                knockback: 2.0,
                mask: LayerMask::PLAYER.with(LayerMask::PROP),
                ..HitboxTemplate::default()
            }),
            ..Self::default()
        }
    }

    /// Breakable prop.
    #[must_use]
    pub fn crate_prop() -> Self {
        Self {
            max_health: Some(20),
            death_effect: Some("splinters".to_string()),
            ..Self::default()
        }
    }
}

/// Complete combat configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Damage computation.
    pub hit: HitConfig,
    /// Hit feedback strength.
    pub feedback: FeedbackConfig,
    /// Combo streaks.
    pub combo: ComboConfig,
    /// Time dilation.
    pub time: TimeConfig,
    /// Camera effects.
    pub camera: CameraConfig,
    /// Momentum multiplier.
    pub momentum: MomentumConfig,
    /// Hurt feedback and death cleanup.
    pub health: HealthFeedbackConfig,
    /// Enemy AI cadence.
    pub ai: AiConfig,
    /// Player attacks.
    pub player: PlayerConfig,
    /// World bounds.
    pub world: WorldConfig,
    /// Audio cues.
    pub sounds: SoundConfig,
    /// Actor blueprints by name.
    pub templates: BTreeMap<String, ActorTemplate>,
}

impl Default for CombatConfig {
    fn default() -> Self {
        let templates = [
            ("player", ActorTemplate::player()),
            ("grunt", ActorTemplate::grunt()),
            ("gunner", ActorTemplate::gunner()),
            ("drone", ActorTemplate::drone()),
            ("bullet", ActorTemplate::bullet()),
            ("crate", ActorTemplate::crate_prop()),
        ]
        .into_iter()
        .map(|(name, template)| (name.to_string(), template))
        .collect();

        Self {
            hit: HitConfig::default(),
            feedback: FeedbackConfig::default(),
            combo: ComboConfig::default(),
            time: TimeConfig::default(),
            camera: CameraConfig::default(),
            momentum: MomentumConfig::default(),
            health: HealthFeedbackConfig::default(),
            ai: AiConfig::default(),
            player: PlayerConfig::default(),
            world: WorldConfig::default(),
            sounds: SoundConfig {
                hurt: Some("hurt".to_string()),
                death: Some("death".to_string()),
                shot: Some("shot".to_string()),
                heal: Some("heal".to_string()),
            },
            templates,
        }
    }
}

impl CombatConfig {
    /// Parse a config from a RON string.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ConfigParse`] on malformed input.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|e| GameError::ConfigParse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Load and validate a config from a RON file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ConfigParse`] if the file cannot be read or
    /// parsed, and [`GameError::InvalidConfig`] if validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| GameError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: Self = ron::from_str(&contents).map_err(|e| GameError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty RON.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if serialization fails.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::InvalidState(e.to_string()))
    }

    /// Look up a template by name.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownTemplate`] if no template has this name.
    pub fn template(&self, name: &str) -> Result<&ActorTemplate> {
        self.templates
            .get(name)
            .ok_or_else(|| GameError::UnknownTemplate(name.to_string()))
    }

    /// Check every value is within its valid range.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] naming the first bad value.
    pub fn validate(&self) -> Result<()> {
        positive("combo.timeout", self.combo.timeout)?;
        non_negative("hit.speed_log_scale", self.hit.speed_log_scale)?;
        non_negative("hit.combo_damage_per_hit", self.hit.combo_damage_per_hit)?;
        at_least("hit.max_combo_damage_factor", self.hit.max_combo_damage_factor, 1.0)?;
        non_negative("hit.hit_stun", self.hit.hit_stun)?;
        non_negative("feedback.hit_stop_base", self.feedback.hit_stop_base)?;
        at_least("feedback.hit_stop_max", self.feedback.hit_stop_max, self.feedback.hit_stop_base)?;
        unit_interval("feedback.slow_motion_factor", self.feedback.slow_motion_factor)?;
        at_least("feedback.kill_boost", self.feedback.kill_boost, 1.0)?;
        unit_interval("time.min_slow_motion", self.time.min_slow_motion)?;
        non_negative("time.hit_stop_scale", self.time.hit_stop_scale)?;
        non_negative("time.slow_motion_hold", self.time.slow_motion_hold)?;
        positive("time.recovery_duration", self.time.recovery_duration)?;
        positive("momentum.max", self.momentum.max)?;
        non_negative("momentum.initial", self.momentum.initial)?;
        if self.momentum.initial > self.momentum.max {
            return Err(GameError::InvalidConfig(
                "momentum.initial exceeds momentum.max".to_string(),
            ));
        }
        positive("momentum.decay_interval", self.momentum.decay_interval)?;
        non_negative("momentum.decay_amount", self.momentum.decay_amount)?;
        positive("ai.path_recompute_interval", self.ai.path_recompute_interval)?;
        positive("ai.reacquire_interval", self.ai.reacquire_interval)?;
        non_negative("player.attack_cooldown", self.player.attack_cooldown)?;
        positive("player.attack_active_window", self.player.attack_active_window)?;
        non_negative("health.despawn_delay", self.health.despawn_delay)?;
        non_negative("health.flash_duration", self.health.flash_duration)?;
        non_negative("health.invulnerability", self.health.invulnerability)?;

        for (name, template) in &self.templates {
            positive(&format!("templates.{name}.radius"), template.radius)?;
            if let Some(enemy) = &template.enemy {
                positive(&format!("templates.{name}.enemy.attack_range"), enemy.attack_range)?;
                non_negative(
                    &format!("templates.{name}.enemy.attack_cooldown"),
                    enemy.attack_cooldown,
                )?;
                if let ArchetypeSpec::Shooter(weapon) = &enemy.archetype {
                    positive(&format!("templates.{name}.weapon.rate_of_fire"), weapon.rate_of_fire)?;
                    if !self.templates.contains_key(&weapon.projectile) {
                        return Err(GameError::InvalidConfig(format!(
                            "templates.{name}.weapon.projectile names unknown template '{}'",
                            weapon.projectile
                        )));
                    }
                }
            }
        }

        if !self.templates.contains_key(&self.player.template) {
            return Err(GameError::InvalidConfig(format!(
                "player.template names unknown template '{}'",
                self.player.template
            )));
        }
        Ok(())
    }
}

fn positive(name: &str, value: f32) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(GameError::InvalidConfig(format!("{name} must be positive, got {value}")))
    }
}

fn non_negative(name: &str, value: f32) -> Result<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(GameError::InvalidConfig(format!("{name} must not be negative, got {value}")))
    }
}

fn at_least(name: &str, value: f32, min: f32) -> Result<()> {
    if value >= min && value.is_finite() {
        Ok(())
    } else {
        Err(GameError::InvalidConfig(format!("{name} must be at least {min}, got {value}")))
    }
}

fn unit_interval(name: &str, value: f32) -> Result<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(GameError::InvalidConfig(format!("{name} must be in (0, 1], got {value}")))
    }
}
