//! Per-frame physics step and the default walker.
//!
//! The physics step only handles what behavior code does not: gravity while
//! airborne, velocity integration (leaps, knockback), landing, ground
//! tracking and touch dispatch. Deliberate movement goes through a
//! [`Locomotion`] implementation.

use bevy::math::Vec3;
use tracing::trace;

use crate::collision::{CollisionService, Trace, MASK_MONSTERSOLID};
use crate::constants::{GRAVITY_ACCEL, GROUND_PROBE, MIN_FLOOR_NORMAL, STEP_SIZE};
use crate::engine::{Contact, Ground, MonsterWorld, MoveType};
use crate::entity::ActorHandle;
use crate::geometry::yaw_to_forward;

/// Ground friction, fraction of velocity removed per second
const GROUND_FRICTION: f32 = 6.0;

/// Executes movement primitives
pub trait Locomotion {
    /// Move `actor` by `dist` along `yaw`; false when the move was refused
    fn walk(&self, world: &mut MonsterWorld, actor: ActorHandle, yaw: f32, dist: f32) -> bool;
}

/// Step-climbing walker that will not walk off ledges
#[derive(Debug, Clone, Copy, Default)]
pub struct StepLocomotion;

impl Locomotion for StepLocomotion {
    fn walk(&self, world: &mut MonsterWorld, actor: ActorHandle, yaw: f32, dist: f32) -> bool {
        let Some(a) = world.actor(actor) else {
            return false;
        };
        if a.dead {
            return false;
        }
        let bbox = a.bbox;
        let origin = a.origin;
        let up = a.up();
        let delta = yaw_to_forward(yaw) * dist;

        if a.move_type == MoveType::Fly {
            let tr = world.trace(origin, &bbox, origin + delta, Some(actor), MASK_MONSTERSOLID);
            if tr.start_solid || tr.fraction < 1.0 {
                return false;
            }
            return set_origin(world, actor, tr.end_pos, None);
        }

        let grounded = a.ground.is_some();
        let raise = world.trace(origin, &bbox, origin + up * STEP_SIZE, Some(actor), MASK_MONSTERSOLID);
        if raise.all_solid {
            return false;
        }
        let raised = raise.end_pos;
        let climbed = (raised - origin).dot(up);

        let forward = world.trace(raised, &bbox, raised + delta, Some(actor), MASK_MONSTERSOLID);
        if forward.start_solid || forward.fraction < 1.0 {
            return false;
        }

        let drop = world.trace(
            forward.end_pos,
            &bbox,
            forward.end_pos - up * (climbed + STEP_SIZE),
            Some(actor),
            MASK_MONSTERSOLID,
        );
        if drop.all_solid {
            return false;
        }
        if drop.fraction >= 1.0 {
            if grounded {
                trace!(?actor, "refusing to walk off a ledge");
                return false;
            }
            return set_origin(world, actor, forward.end_pos, None);
        }
        if drop.normal.dot(up) <= MIN_FLOOR_NORMAL {
            return false;
        }
        let ground = Ground {
            actor: drop.hit,
            normal: drop.normal,
        };
        set_origin(world, actor, drop.end_pos, Some(ground))
    }
}

fn set_origin(world: &mut MonsterWorld, actor: ActorHandle, origin: Vec3, ground: Option<Ground>) -> bool {
    match world.actor_mut(actor) {
        Some(a) => {
            a.origin = origin;
            if ground.is_some() || a.move_type == MoveType::Fly {
                a.ground = ground;
            }
            true
        }
        None => false,
    }
}

/// Gravity, velocity integration, landing and touch dispatch for one frame
pub fn physics_step(world: &mut MonsterWorld, actor: ActorHandle) {
    let dt = world.frame_secs();
    let Some(a) = world.actor_mut(actor) else {
        return;
    };
    if a.move_type == MoveType::None {
        return;
    }

    // Standing on an actor that has since been freed
    let stale_ground = a.ground.and_then(|g| g.actor);
    if let Some(under) = stale_ground {
        if world.actor(under).is_none() {
            if let Some(a) = world.actor_mut(actor) {
                a.ground = None;
            }
        }
    }

    let Some(a) = world.actor_mut(actor) else {
        return;
    };
    let falls = matches!(a.move_type, MoveType::Step | MoveType::Toss);
    if falls && a.ground.is_none() {
        a.velocity += a.gravity_dir * GRAVITY_ACCEL * a.gravity_scale * dt;
    }
    if a.ground.is_some() && a.move_type != MoveType::Fly {
        let keep = (1.0 - GROUND_FRICTION * dt).max(0.0);
        a.velocity *= keep;
        if a.velocity.length_squared() < 1.0 {
            a.velocity = Vec3::ZERO;
        }
    }

    if a.velocity != Vec3::ZERO {
        fly_move(world, actor, dt);
    }
    if falls {
        refresh_ground(world, actor);
    }
}

/// One sweep along the velocity
fn fly_move(world: &mut MonsterWorld, actor: ActorHandle, dt: f32) {
    let Some(a) = world.actor(actor) else {
        return;
    };
    let start = a.origin;
    let end = start + a.velocity * dt;
    let up = a.up();
    let bbox = a.bbox;
    let tr: Trace = world.trace(start, &bbox, end, Some(actor), MASK_MONSTERSOLID);

    let Some(a) = world.actor_mut(actor) else {
        return;
    };
    if tr.all_solid {
        a.velocity = Vec3::ZERO;
        return;
    }
    a.origin = tr.end_pos;
    if tr.fraction >= 1.0 {
        return;
    }

    if tr.normal.dot(up) > MIN_FLOOR_NORMAL {
        if a.move_type != MoveType::Fly {
            a.ground = Some(Ground {
                actor: tr.hit,
                normal: tr.normal,
            });
            a.velocity = Vec3::ZERO;
        }
    } else {
        a.velocity = clip_velocity(a.velocity, tr.normal);
    }

    let contact = Contact {
        other: tr.hit,
        normal: tr.normal,
    };
    if let Some(touch) = a.touch {
        touch(world, actor, contact);
    }
}

/// Remove the component of `v` going into the surface
pub fn clip_velocity(v: Vec3, normal: Vec3) -> Vec3 {
    let into = v.dot(normal);
    if into < 0.0 {
        v - normal * into
    } else {
        v
    }
}

fn refresh_ground(world: &mut MonsterWorld, actor: ActorHandle) {
    let Some(a) = world.actor(actor) else {
        return;
    };
    if a.velocity.dot(a.up()) > 0.0 {
        // still rising
        return;
    }
    let up = a.up();
    let end = a.origin - up * GROUND_PROBE;
    let tr = world.trace(a.origin, &a.bbox, end, Some(actor), MASK_MONSTERSOLID);
    let ground = (tr.fraction < 1.0 && !tr.all_solid && tr.normal.dot(up) > MIN_FLOOR_NORMAL)
        .then_some(Ground {
            actor: tr.hit,
            normal: tr.normal,
        });
    if let Some(a) = world.actor_mut(actor) {
        a.ground = ground;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::brush::BrushWorld;
    use crate::collision::Contents;
    use crate::engine::{Actor, EngineConfig};
    use crate::geometry::BoundingBox;
    use std::sync::Arc;

    fn world(geometry: BrushWorld) -> MonsterWorld {
        MonsterWorld::with_defaults(&EngineConfig::default(), Arc::new(geometry))
    }

    fn walker(world: &mut MonsterWorld, origin: Vec3) -> ActorHandle {
        world.spawn_actor(Actor::new(
            "walker",
            origin,
            BoundingBox::upright(16.0, -24.0, 32.0),
        ))
    }

    #[test]
    fn test_falls_and_lands() {
        let mut w = world(BrushWorld::new().with_plane(Vec3::Z, 0.0, 2048.0));
        let h = walker(&mut w, Vec3::new(0.0, 0.0, 200.0));
        for _ in 0..30 {
            w.run_frame();
        }
        let a = w.actor(h).unwrap();
        assert!(a.ground.is_some());
        assert!((a.origin.z - 24.0).abs() < 0.5, "z = {}", a.origin.z);
        assert_eq!(a.velocity, Vec3::ZERO);
    }

    #[test]
    fn test_walk_climbs_step_and_refuses_ledge() {
        let geometry = BrushWorld::new()
            .with_box(
                Vec3::new(-512.0, -512.0, -64.0),
                Vec3::new(512.0, 512.0, 0.0),
                Contents::SOLID,
            )
            .with_box(
                Vec3::new(64.0, -512.0, 0.0),
                Vec3::new(512.0, 512.0, 16.0),
                Contents::SOLID,
            );
        let mut w = world(geometry);
        let h = walker(&mut w, Vec3::new(40.0, 0.0, 24.0));
        w.run_frame();
        assert!(w.actor(h).unwrap().ground.is_some());

        // onto the 16 unit step
        assert!(StepLocomotion.walk(&mut w, h, 0.0, 20.0));
        let z = w.actor(h).unwrap().origin.z;
        assert!((z - 40.0).abs() < 0.5, "z = {z}");

        // the floor ends at x = 512
        w.actor_mut(h).unwrap().origin = Vec3::new(490.0, 0.0, 40.0);
        assert!(!StepLocomotion.walk(&mut w, h, 0.0, 60.0));
        assert_eq!(w.actor(h).unwrap().origin.x, 490.0);
    }

    #[test]
    fn test_walk_blocked_by_wall() {
        let geometry = BrushWorld::new()
            .with_plane(Vec3::Z, 0.0, 2048.0)
            .with_box(
                Vec3::new(60.0, -512.0, 0.0),
                Vec3::new(80.0, 512.0, 256.0),
                Contents::SOLID,
            );
        let mut w = world(geometry);
        let h = walker(&mut w, Vec3::new(0.0, 0.0, 24.0));
        w.run_frame();
        assert!(!StepLocomotion.walk(&mut w, h, 0.0, 64.0));
        assert!(StepLocomotion.walk(&mut w, h, 180.0, 64.0));
    }

    #[test]
    fn test_clip_velocity() {
        let v = clip_velocity(Vec3::new(100.0, 0.0, -50.0), Vec3::Z);
        assert_eq!(v, Vec3::new(100.0, 0.0, 0.0));
        let away = clip_velocity(Vec3::new(0.0, 0.0, 50.0), Vec3::Z);
        assert_eq!(away.z, 50.0);
    }
}
