//! Movement primitives and target bookkeeping.
//!
//! Frames name a primitive; the animation state machine routes it here.
//! `Run` is where most decisions happen: enemy validation, sight memory,
//! the attack check and the resulting slot dispatch.

use bevy::math::Vec3;
use tracing::{debug, trace};

use super::{AiFlags, AttackState};
use crate::animation::MovePrimitive;
use crate::attack;
use crate::behavior::{self, Slot};
use crate::collision::{CollisionService, MASK_OPAQUE};
use crate::constants::SIGHT_MEMORY_SECS;
use crate::engine::{GameTime, MonsterWorld};
use crate::entity::ActorHandle;
use crate::geometry::{angle_mod, box_gap, vector_to_yaw, yaw_to_forward, BoundingBox};

pub fn run_primitive(world: &mut MonsterWorld, actor: ActorHandle, primitive: MovePrimitive, dist: f32) {
    match primitive {
        MovePrimitive::Stand => ai_stand(world, actor, dist),
        MovePrimitive::Walk => ai_walk(world, actor, dist),
        MovePrimitive::Run => ai_run(world, actor, dist),
        MovePrimitive::Charge => ai_charge(world, actor, dist),
        MovePrimitive::Move => ai_move(world, actor, dist),
    }
}

/// Step along the current facing
pub fn ai_move(world: &mut MonsterWorld, actor: ActorHandle, dist: f32) {
    if dist == 0.0 {
        return;
    }
    let Some(yaw) = world.actor(actor).map(|a| a.yaw) else {
        return;
    };
    let locomotion = world.locomotion();
    locomotion.walk(world, actor, yaw, dist);
}

pub fn ai_stand(world: &mut MonsterWorld, actor: ActorHandle, dist: f32) {
    ai_move(world, actor, dist);

    let stand_ground = world
        .monster(actor)
        .is_some_and(|s| s.ai_flags.contains(AiFlags::STAND_GROUND));

    if validate_enemy(world, actor) {
        if stand_ground {
            face_enemy(world, actor);
            attack_phase(world, actor, 0.0);
        } else {
            behavior::invoke(world, actor, Slot::Run);
        }
        return;
    }

    if find_target(world, actor) {
        return;
    }

    let now = world.time();
    let idle_due = world.monster(actor).is_some_and(|s| now >= s.idle_at);
    if idle_due {
        let wait = world.random_range(15.0, 30.0);
        let (armed, sound) = match world.monster_mut(actor) {
            Some(s) => {
                let armed = s.idle_at != GameTime::ZERO;
                s.idle_at = now.after(wait);
                (armed, s.kind.sounds.idle)
            }
            None => return,
        };
        // the first check only arms the timer
        if armed && behavior::invoke(world, actor, Slot::Idle) {
            world.sound(actor, sound);
        }
    }
}

pub fn ai_walk(world: &mut MonsterWorld, actor: ActorHandle, dist: f32) {
    ai_move(world, actor, dist);

    if find_target(world, actor) {
        return;
    }

    let now = world.time();
    let search_due = world.monster(actor).is_some_and(|s| now >= s.search_at);
    if search_due {
        let wait = world.random_range(15.0, 30.0);
        let sound = match world.monster_mut(actor) {
            Some(s) => {
                s.search_at = now.after(wait);
                s.kind.sounds.search
            }
            None => return,
        };
        if behavior::invoke(world, actor, Slot::Search) {
            world.sound(actor, sound);
        }
    }
}

/// Close in on the enemy, no attack decisions
pub fn ai_charge(world: &mut MonsterWorld, actor: ActorHandle, dist: f32) {
    if validate_enemy(world, actor) {
        face_enemy(world, actor);
    }
    ai_move(world, actor, dist);
}

pub fn ai_run(world: &mut MonsterWorld, actor: ActorHandle, dist: f32) {
    if !validate_enemy(world, actor) {
        if !find_target(world, actor) && !behavior::invoke(world, actor, Slot::Search) {
            behavior::invoke(world, actor, Slot::Stand);
        }
        return;
    }
    let Some(enemy) = world.monster(actor).and_then(|s| s.enemy()) else {
        return;
    };

    let seen = visible(world, actor, enemy);
    update_sighting(world, actor, enemy, seen);

    let now = world.time();
    let goal = if seen {
        world.actor(enemy).map(|e| e.origin)
    } else {
        world.monster(actor).map(|s| s.sighting.last_position)
    };
    if let Some(goal) = goal {
        turn_toward(world, actor, goal);
    }

    if attack_phase(world, actor, dist) {
        return;
    }

    if !seen {
        let forgotten = world
            .monster(actor)
            .is_some_and(|s| now.since(s.sighting.last_seen_at) > SIGHT_MEMORY_SECS);
        if forgotten {
            debug!(?actor, ?enemy, "enemy forgotten");
            if let Some(s) = world.monster_mut(actor) {
                s.clear_enemy();
            }
            if !behavior::invoke(world, actor, Slot::Search) {
                behavior::invoke(world, actor, Slot::Stand);
            }
            return;
        }
    }

    if dist == 0.0 {
        return;
    }
    let Some(yaw) = world.monster(actor).map(|s| s.ideal_yaw) else {
        return;
    };
    let locomotion = world.locomotion();
    if !locomotion.walk(world, actor, yaw, dist) {
        trace!(?actor, dist, "blocked");
        behavior::invoke_blocked(world, actor, dist);
    }
}

/// Decide and dispatch an attack. Returns true when the frame's movement was
/// consumed by the attack (or by strafing).
fn attack_phase(world: &mut MonsterWorld, actor: ActorHandle, dist: f32) -> bool {
    let decided = match behavior::invoke_check_attack(world, actor) {
        Some(decided) => decided,
        None => attack::check_attack(world, actor),
    };
    let state = world
        .monster(actor)
        .map_or(AttackState::None, |s| s.attack_state());
    trace!(?actor, decided, ?state, "attack check");

    match state {
        AttackState::Melee => {
            let ran = behavior::invoke(world, actor, Slot::Melee);
            set_attack_state(world, actor, if ran { AttackState::Straight } else { AttackState::None });
            ran
        }
        AttackState::Missile | AttackState::Blind => {
            let ran = behavior::invoke(world, actor, Slot::Attack);
            set_attack_state(world, actor, AttackState::Straight);
            ran
        }
        AttackState::Sliding => {
            if !behavior::invoke_side_step(world, actor) {
                strafe(world, actor, dist);
            }
            true
        }
        AttackState::None | AttackState::Straight => false,
    }
}

fn set_attack_state(world: &mut MonsterWorld, actor: ActorHandle, state: AttackState) {
    if let Some(s) = world.monster_mut(actor) {
        s.set_attack_state(state);
    }
}

/// Sidestep around the enemy, flipping sides when blocked
fn strafe(world: &mut MonsterWorld, actor: ActorHandle, dist: f32) {
    if dist == 0.0 {
        return;
    }
    let Some((yaw, lefty)) = world.monster(actor).map(|s| (s.ideal_yaw, s.lefty)) else {
        return;
    };
    let offset = if lefty { 90.0 } else { -90.0 };
    let locomotion = world.locomotion();
    if locomotion.walk(world, actor, angle_mod(yaw + offset), dist) {
        return;
    }
    if let Some(s) = world.monster_mut(actor) {
        s.lefty = !lefty;
    }
    locomotion.walk(world, actor, angle_mod(yaw - offset), dist);
}

// =====================================================
// Targets
// =====================================================

/// Re-check the enemy reference; a freed or dead enemy is dropped
pub fn validate_enemy(world: &mut MonsterWorld, actor: ActorHandle) -> bool {
    let Some(enemy) = world.monster(actor).and_then(|s| s.enemy()) else {
        return false;
    };
    if world.is_alive(enemy) {
        return true;
    }
    trace!(?actor, ?enemy, "stale enemy cleared");
    if let Some(s) = world.monster_mut(actor) {
        s.clear_enemy();
    }
    false
}

/// Acquire the closest visible live player
pub fn find_target(world: &mut MonsterWorld, actor: ActorHandle) -> bool {
    let Some(origin) = world.actor(actor).map(|a| a.origin) else {
        return false;
    };
    let mut players: Vec<(ActorHandle, f32)> = world
        .actors()
        .filter(|(_, a)| a.player && a.is_alive())
        .map(|(h, a)| (h, a.origin.distance_squared(origin)))
        .collect();
    players.sort_by(|a, b| a.1.total_cmp(&b.1));

    let target = players
        .into_iter()
        .map(|(h, _)| h)
        .find(|h| visible(world, actor, *h));
    match target {
        Some(enemy) => {
            found_target(world, actor, enemy);
            true
        }
        None => false,
    }
}

/// Take `enemy` as the target: sight memory, sight slot, then run
pub fn found_target(world: &mut MonsterWorld, actor: ActorHandle, enemy: ActorHandle) {
    let now = world.time();
    let Some((position, velocity)) = world.actor(enemy).map(|e| (e.origin, e.velocity)) else {
        return;
    };
    let sound = match world.monster_mut(actor) {
        Some(s) => {
            s.set_enemy(Some(enemy));
            s.sighting.remember(position, velocity, now);
            s.ai_flags.remove(AiFlags::LOST_SIGHT);
            s.kind.sounds.sight
        }
        None => return,
    };
    debug!(?actor, ?enemy, "target acquired");
    world.sound(actor, sound);
    behavior::invoke_sight(world, actor, enemy);
    behavior::invoke(world, actor, Slot::Run);
}

pub fn update_sighting(world: &mut MonsterWorld, actor: ActorHandle, enemy: ActorHandle, seen: bool) {
    let now = world.time();
    let enemy_motion = world.actor(enemy).map(|e| (e.origin, e.velocity));
    let Some(s) = world.monster_mut(actor) else {
        return;
    };
    match (seen, enemy_motion) {
        (true, Some((position, velocity))) => {
            s.sighting.remember(position, velocity, now);
            s.ai_flags.remove(AiFlags::LOST_SIGHT);
        }
        _ => s.ai_flags.insert(AiFlags::LOST_SIGHT),
    }
}

// =====================================================
// Geometry helpers
// =====================================================

/// Eye-to-eye line of sight through opaque geometry
pub fn visible(world: &MonsterWorld, from: ActorHandle, to: ActorHandle) -> bool {
    let (Some(a), Some(b)) = (world.actor(from), world.actor(to)) else {
        return false;
    };
    let tr = world.trace_geometry(a.eye(), &BoundingBox::POINT, b.eye(), MASK_OPAQUE);
    tr.fraction >= 1.0 && !tr.start_solid
}

/// Target within the forward cone
pub fn infront(world: &MonsterWorld, from: ActorHandle, to: ActorHandle) -> bool {
    let (Some(a), Some(b)) = (world.actor(from), world.actor(to)) else {
        return false;
    };
    let dir = (b.origin - a.origin).normalize_or_zero();
    yaw_to_forward(a.yaw).dot(dir) > 0.3
}

/// Gap between the two actors' boxes
pub fn range_to(world: &MonsterWorld, from: ActorHandle, to: ActorHandle) -> Option<f32> {
    let a = world.actor(from)?;
    let b = world.actor(to)?;
    Some(box_gap(a.origin, &a.bbox, b.origin, &b.bbox))
}

/// Trace through actors as well as geometry
pub fn line_clear(world: &MonsterWorld, from: ActorHandle, start: Vec3, end: Vec3, target: ActorHandle) -> bool {
    let tr = world.trace(start, &BoundingBox::POINT, end, Some(from), crate::collision::MASK_SHOT);
    tr.fraction >= 1.0 || tr.hit == Some(target)
}

fn face_enemy(world: &mut MonsterWorld, actor: ActorHandle) {
    let goal = world
        .monster(actor)
        .and_then(|s| s.enemy())
        .and_then(|e| world.actor(e))
        .map(|e| e.origin);
    if let Some(goal) = goal {
        turn_toward(world, actor, goal);
    }
}

/// Point the ideal yaw at `goal` and turn toward it
pub fn turn_toward(world: &mut MonsterWorld, actor: ActorHandle, goal: Vec3) {
    let Some(a) = world.actor_mut(actor) else {
        return;
    };
    let ideal = vector_to_yaw(goal - a.origin);
    let manual = a.monster.as_ref().is_some_and(|s| s.ai_flags.contains(AiFlags::MANUAL_STEERING));
    if let Some(s) = a.monster.as_mut() {
        s.ideal_yaw = ideal;
    }
    if !manual {
        change_yaw(world, actor);
    }
}

/// Turn toward the ideal yaw by at most the kind's yaw speed
pub fn change_yaw(world: &mut MonsterWorld, actor: ActorHandle) {
    let Some(a) = world.actor_mut(actor) else {
        return;
    };
    let Some((ideal, speed)) = a.monster.as_ref().map(|s| (s.ideal_yaw, s.kind.yaw_speed)) else {
        return;
    };
    let current = angle_mod(a.yaw);
    let mut delta = angle_mod(ideal) - current;
    if delta > 180.0 {
        delta -= 360.0;
    } else if delta < -180.0 {
        delta += 360.0;
    }
    a.yaw = angle_mod(current + delta.clamp(-speed, speed));
}

/// Warn a monster that a shot is on its way; it may dodge or duck
pub fn notify_incoming(world: &mut MonsterWorld, target: ActorHandle, attacker: ActorHandle, eta: f32) {
    if !world.is_alive(target) || world.monster(target).is_none() {
        return;
    }
    if behavior::supports(world, target, Slot::Dodge) {
        behavior::invoke_dodge(world, target, attacker, eta);
        return;
    }
    if behavior::supports(world, target, Slot::Duck) {
        let chance = world.skill().dodge_chance();
        if world.random() < chance {
            behavior::invoke_duck(world, target, eta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::brush::BrushWorld;
    use crate::collision::Contents;
    use crate::engine::{Actor, EngineConfig};
    use std::sync::Arc;

    fn world(walls: BrushWorld) -> MonsterWorld {
        MonsterWorld::with_defaults(&EngineConfig::default(), Arc::new(walls))
    }

    fn brute(world: &mut MonsterWorld, origin: Vec3) -> ActorHandle {
        let kind = world.kinds().get("brute").unwrap();
        world.spawn_actor(Actor::monster(kind, origin, 0.0, Vec3::NEG_Z))
    }

    #[test]
    fn test_visibility_blocked_by_wall() {
        let floor = BrushWorld::new().with_plane(Vec3::Z, 0.0, 2048.0);
        let mut open = world(floor.clone());
        let m = brute(&mut open, Vec3::new(0.0, 0.0, 24.0));
        let p = open.spawn_actor(Actor::player(Vec3::new(300.0, 0.0, 24.0)));
        assert!(visible(&open, m, p));

        let walled = floor.with_box(
            Vec3::new(140.0, -200.0, 0.0),
            Vec3::new(160.0, 200.0, 200.0),
            Contents::SOLID,
        );
        let mut closed = world(walled);
        let m = brute(&mut closed, Vec3::new(0.0, 0.0, 24.0));
        let p = closed.spawn_actor(Actor::player(Vec3::new(300.0, 0.0, 24.0)));
        assert!(!visible(&closed, m, p));
        assert!(!find_target(&mut closed, m));
    }

    #[test]
    fn test_find_target_sets_enemy() {
        let floor = BrushWorld::new().with_plane(Vec3::Z, 0.0, 2048.0);
        let mut w = world(floor);
        let m = brute(&mut w, Vec3::new(0.0, 0.0, 24.0));
        let p = w.spawn_actor(Actor::player(Vec3::new(200.0, 0.0, 24.0)));
        assert!(find_target(&mut w, m));
        let s = w.monster(m).unwrap();
        assert_eq!(s.enemy(), Some(p));
        assert!(s.sighting.seen);
    }

    #[test]
    fn test_validate_enemy_clears_stale() {
        let floor = BrushWorld::new().with_plane(Vec3::Z, 0.0, 2048.0);
        let mut w = world(floor);
        let m = brute(&mut w, Vec3::new(0.0, 0.0, 24.0));
        let p = w.spawn_actor(Actor::player(Vec3::new(200.0, 0.0, 24.0)));
        w.monster_mut(m).unwrap().set_enemy(Some(p));
        assert!(validate_enemy(&mut w, m));
        w.remove_actor(p);
        assert!(!validate_enemy(&mut w, m));
        assert!(w.monster(m).unwrap().enemy().is_none());
    }

    #[test]
    fn test_change_yaw_is_rate_limited() {
        let floor = BrushWorld::new().with_plane(Vec3::Z, 0.0, 2048.0);
        let mut w = world(floor);
        let m = brute(&mut w, Vec3::new(0.0, 0.0, 24.0));
        let speed = w.monster(m).unwrap().kind.yaw_speed;
        w.monster_mut(m).unwrap().ideal_yaw = 180.0;
        change_yaw(&mut w, m);
        assert!((w.actor(m).unwrap().yaw - speed).abs() < 1e-3);

        // wraps the short way round
        w.actor_mut(m).unwrap().yaw = 10.0;
        w.monster_mut(m).unwrap().ideal_yaw = 350.0;
        change_yaw(&mut w, m);
        assert!((w.actor(m).unwrap().yaw - 350.0).abs() < 1e-3);
    }

    #[test]
    fn test_range_uses_box_gap() {
        let floor = BrushWorld::new().with_plane(Vec3::Z, 0.0, 2048.0);
        let mut w = world(floor);
        let m = brute(&mut w, Vec3::new(0.0, 0.0, 24.0));
        let half = w.actor(m).unwrap().bbox.maxs.x;
        let p = w.spawn_actor(Actor::player(Vec3::new(half + 16.0 + 40.0, 0.0, 24.0)));
        assert!((range_to(&w, m, p).unwrap() - 40.0).abs() < 1e-3);
    }
}
