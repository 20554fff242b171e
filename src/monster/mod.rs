//! Per-monster state and the think entry point.
//!
//! Every monster carries an [`ActorState`] next to its physical [`Actor`]
//! data. The world calls [`monster_think`] once per frame for each monster;
//! it handles corpse bookkeeping and duck expiry, then hands control to the
//! animation state machine which drives everything else.
//!
//! [`Actor`]: crate::engine::Actor

use std::sync::Arc;

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::animation::{self, MoveCursor};
use crate::behavior::{self, Slot};
use crate::collision::Contents;
use crate::constants::CORPSE_LIFETIME_SECS;
use crate::content::KindDef;
use crate::engine::clock::GameTime;
use crate::engine::{MonsterWorld, WorldEvent};
use crate::entity::ActorHandle;
use crate::leap::{LeapPhase, LeapState};
use crate::loot;

pub mod ai;
pub mod kinds;

/// AI flag set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AiFlags(pub u16);

impl AiFlags {
    pub const NONE: AiFlags = AiFlags(0);
    pub const STAND_GROUND: AiFlags = AiFlags(1); // hold position, attack from here
    pub const LOST_SIGHT: AiFlags = AiFlags(1 << 1); // enemy not visible last check
    pub const DUCKED: AiFlags = AiFlags(1 << 2); // crouched, shortened box
    pub const MANUAL_STEERING: AiFlags = AiFlags(1 << 3); // frame hooks own the yaw
    pub const BLIND_FIRE: AiFlags = AiFlags(1 << 4); // next shot aims at the remembered spot

    pub fn contains(self, other: AiFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: AiFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: AiFlags) {
        self.0 &= !other.0;
    }

    pub fn set(&mut self, other: AiFlags, on: bool) {
        if on {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AttackState {
    #[default]
    None,
    Straight, // chasing, no attack decided
    Sliding,  // circle-strafing
    Melee,
    Missile,
    Blind, // firing at the last known position
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatStyle {
    Melee,
    Ranged,
    Mixed,
}

/// Memory of where the enemy was last seen
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sighting {
    pub seen: bool,
    pub last_seen_at: GameTime,
    pub last_position: Vec3,
    /// Where a blind shot aims: slightly behind the last sighting
    pub blind_fire_target: Vec3,
    /// Seconds after the sighting before the next blind shot is allowed
    pub blind_fire_delay: f32,
}

impl Sighting {
    pub fn remember(&mut self, position: Vec3, velocity: Vec3, now: GameTime) {
        self.seen = true;
        self.last_seen_at = now;
        self.last_position = position;
        self.blind_fire_target = position + velocity * -0.1;
        self.blind_fire_delay = 0.0;
    }
}

/// Behavior state owned by one monster
#[derive(Clone)]
pub struct ActorState {
    pub kind: Arc<KindDef>,
    pub anim: MoveCursor,
    pub ai_flags: AiFlags,
    attack_state: AttackState,
    pub style: CombatStyle,
    pub pain_debounce_until: GameTime,
    pub attack_ready_at: GameTime,
    pub melee_debounce_until: GameTime,
    /// Burst fire continues until this time
    pub fire_hold_until: GameTime,
    pub duck_until: GameTime,
    enemy: Option<ActorHandle>,
    /// Aim anchor, may differ from the enemy
    pub aim_target: Option<ActorHandle>,
    pub sighting: Sighting,
    pub leap: LeapState,
    pub skin: u32,
    pub ideal_yaw: f32,
    /// Multiplier applied to frame distances
    pub move_scale: f32,
    /// Strafe direction preference
    pub lefty: bool,
    pub idle_at: GameTime,
    pub search_at: GameTime,
    /// Corpse release time, set on death
    pub remove_at: Option<GameTime>,
}

impl ActorState {
    pub fn new(kind: Arc<KindDef>, yaw: f32) -> Self {
        Self {
            style: kind.style,
            kind,
            anim: MoveCursor::default(),
            ai_flags: AiFlags::NONE,
            attack_state: AttackState::None,
            pain_debounce_until: GameTime::ZERO,
            attack_ready_at: GameTime::ZERO,
            melee_debounce_until: GameTime::ZERO,
            fire_hold_until: GameTime::ZERO,
            duck_until: GameTime::ZERO,
            enemy: None,
            aim_target: None,
            sighting: Sighting::default(),
            leap: LeapState::default(),
            skin: 0,
            ideal_yaw: yaw,
            move_scale: 1.0,
            lefty: false,
            idle_at: GameTime::ZERO,
            search_at: GameTime::ZERO,
            remove_at: None,
        }
    }

    pub fn enemy(&self) -> Option<ActorHandle> {
        self.enemy
    }

    /// Clearing the enemy also drops any attack decision
    pub fn set_enemy(&mut self, enemy: Option<ActorHandle>) {
        self.enemy = enemy;
        if enemy.is_none() {
            self.attack_state = AttackState::None;
            self.aim_target = None;
            self.ai_flags.remove(AiFlags::BLIND_FIRE);
        }
    }

    pub fn clear_enemy(&mut self) {
        self.set_enemy(None);
    }

    pub fn attack_state(&self) -> AttackState {
        self.attack_state
    }

    /// Returns false (and stores `None`) when there is no enemy to attack
    pub fn set_attack_state(&mut self, state: AttackState) -> bool {
        if state != AttackState::None && self.enemy.is_none() {
            self.attack_state = AttackState::None;
            return false;
        }
        self.attack_state = state;
        true
    }

    pub fn is_ducked(&self) -> bool {
        self.ai_flags.contains(AiFlags::DUCKED)
    }
}

/// Scheduled think for every monster
pub fn monster_think(world: &mut MonsterWorld, actor: ActorHandle) {
    let now = world.time();
    let next = now.after(world.frame_secs());
    let dead = match world.actor_mut(actor) {
        Some(a) => {
            a.next_think = next;
            a.dead
        }
        None => return,
    };

    if dead {
        corpse_think(world, actor, now);
        return;
    }

    expire_duck(world, actor, now);
    ai::validate_enemy(world, actor);
    animation::advance(world, actor);
}

fn corpse_think(world: &mut MonsterWorld, actor: ActorHandle, now: GameTime) {
    let expired = world
        .monster(actor)
        .and_then(|s| s.remove_at)
        .is_some_and(|t| now >= t);
    if expired {
        trace!(?actor, "corpse released");
        world.remove_actor(actor);
        return;
    }
    // Play out the death move; it holds its last frame when done
    animation::advance(world, actor);
}

fn expire_duck(world: &mut MonsterWorld, actor: ActorHandle, now: GameTime) {
    let due = world.monster(actor).is_some_and(|s| {
        s.is_ducked() && now >= s.duck_until && s.leap.phase != LeapPhase::Airborne
    });
    if !due {
        return;
    }
    if !behavior::invoke(world, actor, Slot::UnDuck) {
        stand_up(world, actor);
    }
}

/// Clear the duck flag and restore the kind's full box
pub fn stand_up(world: &mut MonsterWorld, actor: ActorHandle) {
    if let Some(a) = world.actor_mut(actor) {
        if let Some(state) = a.monster.as_mut() {
            state.ai_flags.remove(AiFlags::DUCKED);
            a.bbox = state.kind.bbox;
        }
    }
}

/// Kill a monster: corpse state, loot, death move, and gibbing when the
/// blow was heavy enough
pub fn kill(
    world: &mut MonsterWorld,
    actor: ActorHandle,
    attacker: Option<ActorHandle>,
    damage: f32,
) {
    let now = world.time();
    let (class_name, death_sound, gibbed) = {
        let Some(a) = world.actor_mut(actor) else {
            return;
        };
        if a.dead {
            return;
        }
        a.dead = true;
        a.contents = Contents::DEAD_MONSTER;
        a.touch = None;
        a.velocity = Vec3::ZERO;
        let gibbed = a.health <= a.gib_health;
        let Some(state) = a.monster.as_mut() else {
            return;
        };
        state.clear_enemy();
        state.leap.disarm();
        state.remove_at = Some(now.after(CORPSE_LIFETIME_SECS));
        (a.class_name.clone(), state.kind.sounds.death, gibbed)
    };

    debug!(?actor, class = %class_name, ?attacker, damage, gibbed, "monster killed");
    loot::drop_on_death(world, actor);
    world.sound(actor, death_sound);
    behavior::invoke_die(world, actor, attacker, damage);
    world.emit(WorldEvent::Died {
        actor,
        class_name,
    });

    if gibbed {
        world.remove_actor(actor);
    }
}
