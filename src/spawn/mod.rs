//! Spawn placement.
//!
//! Placement checks are pure queries over a [`CollisionService`].
//! Every check is written against an arbitrary gravity direction so actors
//! that walk on ceilings get the same treatment as floor walkers.
//!
//! - [`find_spawn_point`] drops a volume onto the nearest surface, unsticking
//!   it or stepping it against gravity first when needed.
//! - [`check_spawn_point`] is the flyer test: the volume is empty.
//! - [`check_ground_spawn_point`] is the walker test: empty volume, solid
//!   non-liquid support within reach, and a flat enough footprint.
//!
//! [`factory`] turns a kind name into a live actor; [`commander`] drives the
//! factory for monsters that call in reinforcements.

pub mod commander;
pub mod factory;

use bevy::math::Vec3;
use tracing::{debug, trace};

use crate::collision::{CollisionService, Contents, MASK_MONSTERSOLID, MASK_WATER};
use crate::constants::{DROP_DISTANCE, DROP_NUDGE, FIX_STUCK_MAX, SPAWN_PROBE_STEP, STEP_SIZE};
use crate::entity::ActorHandle;
use crate::geometry::{major_axis, normalize_gravity, other_axes, BoundingBox};

pub use commander::{Commander, Reinforcement};
pub use factory::{create_actor, create_airborne_actor, create_ground_actor};

/// Where to look for room for a volume
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnQuery {
    pub origin: Vec3,
    pub bbox: BoundingBox,
    /// Normalized on construction
    pub gravity: Vec3,
    /// How far against gravity to retry when the origin is blocked
    pub max_move_up: f32,
    /// Rest the volume on a surface instead of accepting it mid-air
    pub drop: bool,
}

impl SpawnQuery {
    pub fn new(origin: Vec3, bbox: BoundingBox) -> Self {
        Self {
            origin,
            bbox,
            gravity: Vec3::NEG_Z,
            max_move_up: 64.0,
            drop: true,
        }
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = normalize_gravity(gravity);
        self
    }

    pub fn with_max_move_up(mut self, max_move_up: f32) -> Self {
        self.max_move_up = max_move_up.max(0.0);
        self
    }

    /// Accept the volume where it is, flyer style
    pub fn without_drop(mut self) -> Self {
        self.drop = false;
        self
    }
}

/// Outcome of trying to push a volume out of solid geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StuckResult {
    /// Was never stuck
    GoodPosition,
    /// Clear at the returned point
    Fixed(Vec3),
    NoGoodPosition,
}

// =====================================================
// Placement search
// =====================================================

/// Resting point for the query volume, or `None` when no legal spot exists
/// near the origin.
pub fn find_spawn_point(svc: &dyn CollisionService, query: &SpawnQuery) -> Option<Vec3> {
    let gravity = normalize_gravity(query.gravity);
    let try_drop = |point: Vec3| -> Option<Vec3> {
        if query.drop {
            drop_to_floor(svc, point, &query.bbox, gravity, false, None)
        } else {
            check_spawn_point(svc, point, &query.bbox).then_some(point)
        }
    };

    if let Some(point) = try_drop(query.origin) {
        return Some(point);
    }

    if let StuckResult::Fixed(unstuck) = fix_stuck(svc, query.origin, &query.bbox, gravity) {
        trace!(from = ?query.origin, to = ?unstuck, "spawn volume unstuck");
        if let Some(point) = try_drop(unstuck) {
            return Some(point);
        }
    }

    let mut offset = SPAWN_PROBE_STEP;
    while offset <= query.max_move_up {
        if let Some(point) = try_drop(query.origin - gravity * offset) {
            return Some(point);
        }
        offset += SPAWN_PROBE_STEP;
    }

    debug!(origin = ?query.origin, "no spawn point found");
    None
}

/// The volume at `origin` overlaps nothing, neither geometry nor actors
pub fn check_spawn_point(svc: &dyn CollisionService, origin: Vec3, bbox: &BoundingBox) -> bool {
    let tr = svc.trace(origin, bbox, origin, None, MASK_MONSTERSOLID);
    !(tr.start_solid || tr.all_solid || tr.hit.is_some())
}

/// Walker placement test. The volume at `origin` must be clear and rest,
/// within `height` along gravity, on flat solid geometry that is not liquid.
pub fn check_ground_spawn_point(
    svc: &dyn CollisionService,
    origin: Vec3,
    bbox: &BoundingBox,
    height: f32,
    gravity: Vec3,
) -> bool {
    if !check_spawn_point(svc, origin, bbox) {
        return false;
    }
    let gravity = normalize_gravity(gravity);

    let support = svc.trace(
        origin,
        bbox,
        origin + gravity * height,
        None,
        MASK_MONSTERSOLID | MASK_WATER,
    );
    if support.start_solid || support.all_solid || support.fraction >= 1.0 {
        return false;
    }
    if support.hit.is_some() {
        trace!(?origin, "support is an actor");
        return false;
    }
    if support.contents.is_liquid() {
        trace!(?origin, "support is liquid");
        return false;
    }

    let (lo, hi) = bbox.absolute(support.end_pos);
    check_bottom_fast(svc, lo, hi, gravity) || check_bottom_slow(svc, support.end_pos, bbox, gravity)
}

/// All four footprint corners, one unit past the box face that leads along
/// gravity, are inside solid geometry.
pub fn check_bottom_fast(svc: &dyn CollisionService, abs_mins: Vec3, abs_maxs: Vec3, gravity: Vec3) -> bool {
    let axis = major_axis(gravity);
    let (a1, a2) = other_axes(axis);
    let mut probe = Vec3::ZERO;
    probe[axis] = if gravity[axis] > 0.0 {
        abs_maxs[axis] + 1.0
    } else {
        abs_mins[axis] - 1.0
    };

    for i in 0..2 {
        for j in 0..2 {
            probe[a1] = if i == 1 { abs_maxs[a1] } else { abs_mins[a1] };
            probe[a2] = if j == 1 { abs_maxs[a2] } else { abs_mins[a2] };
            if !svc.point_contents(probe).contains(Contents::SOLID) {
                return false;
            }
        }
    }
    true
}

/// Trace the footprint center and each quadrant down along gravity. Fails if
/// any of them finds nothing within two steps, or lands more than a step
/// deeper than the center.
pub fn check_bottom_slow(svc: &dyn CollisionService, origin: Vec3, bbox: &BoundingBox, gravity: Vec3) -> bool {
    let axis = major_axis(gravity);
    let (a1, a2) = other_axes(axis);
    let down = gravity[axis].signum();

    let mut start = origin;
    start[axis] += if down > 0.0 { bbox.maxs[axis] } else { bbox.mins[axis] };
    let stop_at = start[axis] + down * STEP_SIZE * 2.0;
    let mut stop = start;
    stop[axis] = stop_at;

    let mut flat = *bbox;
    flat.mins[axis] = 0.0;
    flat.maxs[axis] = 0.0;

    let tr = svc.trace(start, &flat, stop, None, MASK_MONSTERSOLID);
    if tr.fraction >= 1.0 {
        return false;
    }
    let mid = tr.end_pos[axis];

    let mut half = bbox.size() * 0.25;
    half[axis] = 0.0;
    let quadrant = BoundingBox::new(-half, half);

    let center = bbox.center(origin);
    for i in 0..2 {
        for j in 0..2 {
            let mut q_start = start;
            q_start[a1] = center[a1] + if i == 1 { half[a1] } else { -half[a1] };
            q_start[a2] = center[a2] + if j == 1 { half[a2] } else { -half[a2] };
            let mut q_end = q_start;
            q_end[axis] = stop_at;

            let tr = svc.trace(q_start, &quadrant, q_end, None, MASK_MONSTERSOLID);
            if tr.fraction >= 1.0 || (tr.end_pos[axis] - mid).abs() > STEP_SIZE {
                return false;
            }
        }
    }
    true
}

// =====================================================
// Drop and unstick
// =====================================================

/// Slide the volume along gravity until it rests on something. A volume that
/// starts embedded is nudged one unit against gravity first; with
/// `allow_partial` false it must be free after the nudge.
pub fn drop_to_floor(
    svc: &dyn CollisionService,
    origin: Vec3,
    bbox: &BoundingBox,
    gravity: Vec3,
    allow_partial: bool,
    ignore: Option<ActorHandle>,
) -> Option<Vec3> {
    let gravity = normalize_gravity(gravity);
    let mut start = origin;
    if svc.trace(start, bbox, start, ignore, MASK_MONSTERSOLID).start_solid {
        start -= gravity * DROP_NUDGE;
    }

    let end = start + gravity * DROP_DISTANCE;
    let tr = svc.trace(start, bbox, end, ignore, MASK_MONSTERSOLID);
    if tr.fraction >= 1.0 || tr.all_solid || (tr.start_solid && !allow_partial) {
        return None;
    }
    Some(tr.end_pos)
}

/// Look for the nearest clear spot around an embedded volume, trying
/// against gravity first, then the remaining axis directions, at growing
/// distances up to a small bound.
pub fn fix_stuck(svc: &dyn CollisionService, origin: Vec3, bbox: &BoundingBox, gravity: Vec3) -> StuckResult {
    let clear = |p: Vec3| !svc.trace(p, bbox, p, None, MASK_MONSTERSOLID).start_solid;
    if clear(origin) {
        return StuckResult::GoodPosition;
    }

    let up = -normalize_gravity(gravity);
    let mut directions = vec![up];
    for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
        for dir in [axis, -axis] {
            if dir.dot(up) < 0.999 {
                directions.push(dir);
            }
        }
    }

    let mut distance = 1.0;
    while distance <= FIX_STUCK_MAX {
        for dir in &directions {
            let candidate = origin + *dir * distance;
            if clear(candidate) {
                return StuckResult::Fixed(candidate);
            }
        }
        distance *= 2.0;
    }
    StuckResult::NoGoodPosition
}
