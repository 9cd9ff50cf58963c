//! Combat events, observers and host feedback commands.
//!
//! Events are plain values. Observers registered on a [`Subscribers`] list
//! are called synchronously, in subscription order, while the event is
//! being resolved. Everything the host has to do in response (play a
//! sound, spawn a prefab, tint a sprite) is returned as a [`Feedback`]
//! command inside [`TickEvents`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::components::{ActorKind, Color, EntityId};
use crate::math::Vec2;

/// Handle returned by [`Subscribers::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Callback<E> = Box<dyn FnMut(&E) + Send>;

/// Ordered observer list for one event type.
pub struct Subscribers<E> {
    callbacks: Vec<(SubscriptionId, Callback<E>)>,
    next_id: u64,
}

impl<E> Subscribers<E> {
    /// Empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a callback. Callbacks run in registration order.
    pub fn subscribe(&mut self, callback: impl FnMut(&E) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    /// Remove a callback. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(sub, _)| *sub != id);
        self.callbacks.len() != before
    }

    /// Deliver `event` to every callback.
    pub fn emit(&mut self, event: &E) {
        for (_, callback) in &mut self.callbacks {
            callback(event);
        }
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Whether no callback is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Subscribers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("len", &self.callbacks.len())
            .finish()
    }
}

/// One resolved hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitEvent {
    /// Actor that owns the hitbox (the shooter for projectiles).
    pub attacker: EntityId,
    /// Actor that was hit.
    pub target: EntityId,
    /// Hit points removed.
    pub damage: u32,
    /// Speed multiplier the damage was computed with.
    pub speed_multiplier: f32,
    /// This hit killed the target.
    pub killing_blow: bool,
    /// Where the hit landed.
    pub position: Vec2,
    /// The hit came from a projectile.
    pub ranged: bool,
    /// Combo count after this hit, zero when the attacker has no combo.
    pub combo_count: u32,
}

/// An actor lost health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageTaken {
    /// Actor that was hurt.
    pub entity: EntityId,
    /// Hit points removed.
    pub amount: u32,
    /// Hit points left.
    pub remaining: u32,
    /// Direction the damage came from.
    pub direction: Vec2,
}

/// An actor made the alive-to-dead transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeathEvent {
    /// Actor that died.
    pub entity: EntityId,
    /// Its classification.
    pub kind: ActorKind,
    /// Actor credited with the kill, if any.
    pub killer: Option<EntityId>,
    /// Where it died.
    pub position: Vec2,
}

/// Combo state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComboEvent {
    /// First hit of a new streak.
    Started {
        /// Always 1.
        count: u32,
    },
    /// Another hit within the timeout.
    Extended {
        /// Hits in the streak so far.
        count: u32,
    },
    /// The timeout elapsed.
    Ended {
        /// Final hit count.
        count: u32,
    },
}

impl ComboEvent {
    /// Hit count carried by the event.
    #[must_use]
    pub const fn count(&self) -> u32 {
        match *self {
            Self::Started { count } | Self::Extended { count } | Self::Ended { count } => count,
        }
    }
}

/// Room orchestration progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomEvent {
    /// The player entered a dormant room.
    Activated(usize),
    /// A wave was spawned.
    WaveSpawned {
        /// Room index.
        room: usize,
        /// Wave index.
        wave: usize,
    },
    /// The last wave of a room was defeated.
    Cleared(usize),
}

/// HUD element a [`Feedback::HudText`] addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HudSlot {
    /// Combo counter.
    Combo,
    /// Momentum value.
    Momentum,
    /// Score total.
    Score,
}

/// Command for the host engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Feedback {
    /// Play a one-shot audio cue.
    PlaySound {
        /// Cue name.
        cue: String,
        /// Where it plays.
        position: Vec2,
    },
    /// Instantiate the visual for a template.
    Spawn {
        /// The new actor, or `None` for a pure effect.
        entity: Option<EntityId>,
        /// Template name.
        template: String,
        /// Where it appears.
        position: Vec2,
    },
    /// Destroy an actor's visual.
    Despawn(EntityId),
    /// Set a sprite tint.
    Tint {
        /// Tinted actor.
        entity: EntityId,
        /// New tint.
        color: Color,
    },
    /// Show rising text in the world.
    FloatingText {
        /// Text to show.
        text: String,
        /// Where it appears.
        position: Vec2,
        /// Text colour.
        color: Color,
    },
    /// Update a HUD text element.
    HudText {
        /// Element.
        slot: HudSlot,
        /// New text; empty hides the element.
        text: String,
    },
    /// Set animation playback speed.
    AnimationSpeed {
        /// Animated actor.
        entity: EntityId,
        /// Playback multiplier.
        speed: f32,
    },
    /// Move the camera away from its resting transform.
    CameraOffset {
        /// Translation offset.
        offset: Vec2,
        /// Fisheye distortion strength.
        fisheye: f32,
    },
}

/// Everything that happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Resolved hits in resolution order.
    pub hits: Vec<HitEvent>,
    /// Damage taken, including non-hit damage.
    pub damage: Vec<DamageTaken>,
    /// Actors that died this tick.
    pub deaths: Vec<DeathEvent>,
    /// Combo changes.
    pub combo: Vec<ComboEvent>,
    /// Room progress.
    pub rooms: Vec<RoomEvent>,
    /// Host commands in emission order.
    pub feedback: Vec<Feedback>,
    /// Actors created this tick.
    pub spawned: Vec<EntityId>,
    /// Actors removed this tick.
    pub despawned: Vec<EntityId>,
    /// Time scale in effect after this tick.
    pub time_scale: f32,
}

impl TickEvents {
    /// Whether anything happened besides the clock advancing.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.hits.is_empty()
            && self.damage.is_empty()
            && self.deaths.is_empty()
            && self.combo.is_empty()
            && self.rooms.is_empty()
            && self.feedback.is_empty()
            && self.spawned.is_empty()
            && self.despawned.is_empty()
    }
}
