//! Construction entry points: kind name to a live, scheduled actor.

use bevy::math::Vec3;
use tracing::{debug, info};

use super::{check_ground_spawn_point, check_spawn_point, drop_to_floor};
use crate::behavior::{self, Slot};
use crate::engine::{Actor, MonsterWorld, WorldEvent};
use crate::entity::ActorHandle;
use crate::geometry::BoundingBox;

/// Build and register an actor of kind `name` at `origin`. Walkers are
/// settled onto the floor below them. Unknown kinds are a content error.
pub fn create_actor(world: &mut MonsterWorld, name: &str, origin: Vec3, yaw: f32) -> Option<ActorHandle> {
    let kind = match world.kinds().lookup(name) {
        Ok(kind) => kind,
        Err(err) => {
            world.report_content_error(None, &err.to_string());
            return None;
        }
    };
    let flying = kind.flying;
    let gravity = world.gravity();
    let handle = world.spawn_actor(Actor::monster(kind, origin, yaw, gravity));

    if !flying {
        let view: &MonsterWorld = world;
        let settled = view
            .actor(handle)
            .and_then(|a| drop_to_floor(view, a.origin, &a.bbox, a.gravity_dir, true, Some(handle)));
        match settled {
            Some(point) => {
                if let Some(a) = world.actor_mut(handle) {
                    a.origin = point;
                }
            }
            None => debug!(?handle, ?origin, "spawned without floor below"),
        }
    }

    if !behavior::invoke(world, handle, Slot::Stand) {
        world.report_content_error(Some(handle), "kind has no stand behavior");
    }
    let (class_name, placed) = match world.actor(handle) {
        Some(a) => (a.class_name.clone(), a.origin),
        None => return None,
    };
    info!(?handle, class = %class_name, origin = ?placed, "actor spawned");
    world.emit(WorldEvent::Spawned {
        actor: handle,
        class_name,
        origin: placed,
    });
    Some(handle)
}

/// Spawner entry for walkers: `origin` must pass the ground check with
/// `clearance` of support reach.
pub fn create_ground_actor(
    world: &mut MonsterWorld,
    origin: Vec3,
    yaw: f32,
    bbox: &BoundingBox,
    kind: &str,
    clearance: f32,
) -> Option<ActorHandle> {
    let gravity = world.gravity();
    if !check_ground_spawn_point(&*world, origin, bbox, clearance, gravity) {
        debug!(?origin, kind, "ground spawn point rejected");
        return None;
    }
    let handle = create_actor(world, kind, origin, yaw)?;
    grow_effect(world, origin, bbox);
    Some(handle)
}

/// Spawner entry for flyers: only the volume itself has to be clear
pub fn create_airborne_actor(
    world: &mut MonsterWorld,
    origin: Vec3,
    yaw: f32,
    bbox: &BoundingBox,
    kind: &str,
) -> Option<ActorHandle> {
    if !check_spawn_point(&*world, origin, bbox) {
        debug!(?origin, kind, "air spawn point rejected");
        return None;
    }
    let handle = create_actor(world, kind, origin, yaw)?;
    grow_effect(world, origin, bbox);
    Some(handle)
}

fn grow_effect(world: &mut MonsterWorld, origin: Vec3, bbox: &BoundingBox) {
    let size = bbox.size().max_element();
    world.emit(WorldEvent::SpawnEffect {
        origin: bbox.center(origin),
        size,
    });
}
