//! Damage application and attack helpers.
//!
//! Damage resolution is a collaborator: the world holds an
//! `Arc<dyn DamageService>` and every hit goes through it. [`DirectDamage`]
//! is the stock implementation used by the game and the tests.

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::behavior::{self, Slot};
use crate::collision::{CollisionService, MASK_SHOT};
use crate::constants::{KNOCKBACK_SCALE, MIN_KNOCKBACK_MASS, SHOT_RANGE};
use crate::engine::{MonsterWorld, MoveType, WorldEvent};
use crate::entity::ActorHandle;
use crate::geometry::BoundingBox;
use crate::monster::{self, ai};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageCause {
    Melee,
    Shot,
    Leap,
    World,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageRequest {
    pub target: ActorHandle,
    pub inflictor: ActorHandle,
    pub attacker: Option<ActorHandle>,
    /// Push direction, need not be normalized
    pub direction: Vec3,
    pub point: Vec3,
    pub amount: f32,
    pub knockback: f32,
    pub cause: DamageCause,
}

pub trait DamageService {
    fn apply(&self, world: &mut MonsterWorld, request: DamageRequest);
}

/// Health, knockback, death and an immediate pain reaction
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectDamage;

impl DamageService for DirectDamage {
    fn apply(&self, world: &mut MonsterWorld, req: DamageRequest) {
        let Some(target) = world.actor_mut(req.target) else {
            return;
        };
        if !target.takes_damage || req.amount <= 0.0 {
            return;
        }
        let was_dead = target.dead;
        if was_dead && target.player {
            return;
        }

        target.health -= req.amount;
        if req.knockback > 0.0 && target.move_type != MoveType::None {
            let mass = target.mass.max(MIN_KNOCKBACK_MASS);
            target.velocity +=
                req.direction.normalize_or_zero() * KNOCKBACK_SCALE * req.knockback / mass;
        }
        let health = target.health;
        let gib_health = target.gib_health;
        let player = target.player;
        let monster = target.monster.is_some();

        world.emit(WorldEvent::Damage {
            target: req.target,
            attacker: req.attacker,
            amount: req.amount,
            cause: req.cause,
        });
        trace!(target = ?req.target, amount = req.amount, health, "damage applied");

        if player {
            if health <= 0.0 {
                if let Some(p) = world.actor_mut(req.target) {
                    p.dead = true;
                }
                debug!(player = ?req.target, "player killed");
            }
            return;
        }
        if !monster {
            return;
        }

        if was_dead {
            if health <= gib_health {
                debug!(corpse = ?req.target, "corpse gibbed");
                world.remove_actor(req.target);
            }
            return;
        }
        if health <= 0.0 {
            monster::kill(world, req.target, req.attacker, req.amount);
            return;
        }

        provoke(world, req.target, req.attacker);
        behavior::invoke_pain(world, req.target, req.attacker, req.amount);
        behavior::invoke(world, req.target, Slot::SetSkin);
    }
}

/// Take a live player attacker as the enemy when idle
fn provoke(world: &mut MonsterWorld, target: ActorHandle, attacker: Option<ActorHandle>) {
    let Some(attacker) = attacker.filter(|a| *a != target) else {
        return;
    };
    let hostile = world.actor(attacker).is_some_and(|a| a.player && a.is_alive());
    let idle = world.monster(target).is_some_and(|s| s.enemy().is_none());
    if !hostile || !idle {
        return;
    }
    let now = world.time();
    let seen = world.actor(attacker).map(|a| (a.origin, a.velocity));
    if let (Some(s), Some((position, velocity))) = (world.monster_mut(target), seen) {
        s.set_enemy(Some(attacker));
        s.sighting.remember(position, velocity, now);
    }
}

/// Melee strike on the enemy. A miss arms the melee debounce.
pub fn fire_hit(world: &mut MonsterWorld, actor: ActorHandle, reach: f32, damage: f32, kick: f32) -> bool {
    if !ai::validate_enemy(world, actor) {
        return false;
    }
    let Some(enemy) = world.monster(actor).and_then(|s| s.enemy()) else {
        return false;
    };
    let in_reach = ai::range_to(world, actor, enemy).is_some_and(|r| r <= reach);
    if !in_reach {
        let debounce = world
            .monster(actor)
            .map_or(0.0, |s| s.kind.attack.melee_debounce_secs);
        let until = world.time().after(debounce);
        if let Some(s) = world.monster_mut(actor) {
            s.melee_debounce_until = until;
        }
        trace!(?actor, ?enemy, "melee whiff");
        return false;
    }

    let (Some(a), Some(e)) = (world.actor(actor), world.actor(enemy)) else {
        return false;
    };
    let direction = e.origin - a.origin;
    let point = e.bbox.center(e.origin);
    let service = world.damage_service();
    service.apply(
        world,
        DamageRequest {
            target: enemy,
            inflictor: actor,
            attacker: Some(actor),
            direction,
            point,
            amount: damage,
            knockback: kick,
            cause: DamageCause::Melee,
        },
    );
    true
}

/// Hitscan shot along `dir`. The enemy is warned first with the flight time
/// `distance / speed`, so it can dodge or duck before the trace resolves.
pub fn fire_shot(
    world: &mut MonsterWorld,
    actor: ActorHandle,
    start: Vec3,
    dir: Vec3,
    damage: f32,
    speed: f32,
) -> Option<ActorHandle> {
    let dir = dir.try_normalize()?;
    let end = start + dir * SHOT_RANGE;

    if let Some(enemy) = world.monster(actor).and_then(|s| s.enemy()) {
        let eta = world
            .actor(enemy)
            .map(|e| e.origin.distance(start) / speed.max(1.0));
        if let Some(eta) = eta {
            ai::notify_incoming(world, enemy, actor, eta);
        }
    }

    let tr = world.trace(start, &BoundingBox::POINT, end, Some(actor), MASK_SHOT);
    let target = tr.hit?;
    if !world.actor(target).is_some_and(|t| t.takes_damage) {
        return None;
    }
    let service = world.damage_service();
    service.apply(
        world,
        DamageRequest {
            target,
            inflictor: actor,
            attacker: Some(actor),
            direction: dir,
            point: tr.end_pos,
            amount: damage,
            knockback: damage,
            cause: DamageCause::Shot,
        },
    );
    Some(target)
}
