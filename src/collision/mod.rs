//! Collision queries consumed by the engine.
//!
//! Geometry is an injected collaborator: anything implementing
//! [`CollisionService`] can back placement, movement and line-of-fire checks.
//! [`brush::BrushWorld`] is the axis-aligned reference implementation.

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};
use std::ops::{BitAnd, BitOr, BitOrAssign};

use crate::entity::ActorHandle;
use crate::geometry::BoundingBox;

pub mod brush;

/// Content bits of a volume or point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Contents(pub u32);

impl Contents {
    pub const EMPTY: Contents = Contents(0);
    pub const SOLID: Contents = Contents(1);
    pub const WINDOW: Contents = Contents(1 << 1);
    pub const LAVA: Contents = Contents(1 << 3);
    pub const SLIME: Contents = Contents(1 << 4);
    pub const WATER: Contents = Contents(1 << 5);
    pub const MONSTER_CLIP: Contents = Contents(1 << 17);
    pub const PLAYER: Contents = Contents(1 << 24);
    pub const MONSTER: Contents = Contents(1 << 25);
    pub const DEAD_MONSTER: Contents = Contents(1 << 26);

    pub fn intersects(self, other: Contents) -> bool {
        self.0 & other.0 != 0
    }

    pub fn contains(self, other: Contents) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_liquid(self) -> bool {
        self.intersects(MASK_WATER)
    }
}

impl BitOr for Contents {
    type Output = Contents;
    fn bitor(self, rhs: Contents) -> Contents {
        Contents(self.0 | rhs.0)
    }
}

impl BitOrAssign for Contents {
    fn bitor_assign(&mut self, rhs: Contents) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Contents {
    type Output = Contents;
    fn bitand(self, rhs: Contents) -> Contents {
        Contents(self.0 & rhs.0)
    }
}

// =====================================================
// Trace masks
// =====================================================

pub const MASK_SOLID: Contents = Contents(Contents::SOLID.0 | Contents::WINDOW.0);
pub const MASK_WATER: Contents =
    Contents(Contents::WATER.0 | Contents::LAVA.0 | Contents::SLIME.0);
pub const MASK_OPAQUE: Contents =
    Contents(Contents::SOLID.0 | Contents::SLIME.0 | Contents::LAVA.0);
pub const MASK_MONSTERSOLID: Contents = Contents(
    Contents::SOLID.0
        | Contents::WINDOW.0
        | Contents::MONSTER_CLIP.0
        | Contents::MONSTER.0
        | Contents::PLAYER.0,
);
pub const MASK_SHOT: Contents = Contents(
    Contents::SOLID.0
        | Contents::WINDOW.0
        | Contents::MONSTER.0
        | Contents::PLAYER.0
        | Contents::DEAD_MONSTER.0,
);

/// Result of sweeping a box from `start` toward `end`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trace {
    /// 1.0 means the sweep was unobstructed
    pub fraction: f32,
    pub end_pos: Vec3,
    pub normal: Vec3,
    pub start_solid: bool,
    pub all_solid: bool,
    pub hit: Option<ActorHandle>,
    pub contents: Contents,
}

impl Trace {
    pub fn clear(end: Vec3) -> Self {
        Self {
            fraction: 1.0,
            end_pos: end,
            normal: Vec3::ZERO,
            start_solid: false,
            all_solid: false,
            hit: None,
            contents: Contents::EMPTY,
        }
    }

    pub fn is_clear(&self) -> bool {
        self.fraction >= 1.0 && !self.start_solid && !self.all_solid
    }
}

/// Trace and point-contents queries against the world
pub trait CollisionService {
    /// Sweep `bbox` from `start` to `end`, ignoring `ignore`, against volumes
    /// whose contents intersect `mask`.
    fn trace(
        &self,
        start: Vec3,
        bbox: &BoundingBox,
        end: Vec3,
        ignore: Option<ActorHandle>,
        mask: Contents,
    ) -> Trace;

    /// Union of the contents of every volume containing `point` (boundary inclusive)
    fn point_contents(&self, point: Vec3) -> Contents;
}

/// Outcome of clipping one sweep against one box
#[derive(Debug, Clone, Copy)]
pub(crate) struct BoxClip {
    pub start_solid: bool,
    pub all_solid: bool,
    pub fraction: f32,
    pub normal: Vec3,
}

/// Sweep `bbox` against the static box `[target_min, target_max]`.
///
/// Touching is not penetration: a sweep that starts flush against a face and
/// moves away is unobstructed, one that moves into it stops at fraction 0.
pub(crate) fn clip_box(
    start: Vec3,
    end: Vec3,
    bbox: &BoundingBox,
    target_min: Vec3,
    target_max: Vec3,
) -> BoxClip {
    let lo = target_min - bbox.maxs;
    let hi = target_max - bbox.mins;
    let inside = |p: Vec3| (0..3).all(|i| p[i] > lo[i] && p[i] < hi[i]);

    let mut clip = BoxClip {
        start_solid: false,
        all_solid: false,
        fraction: 1.0,
        normal: Vec3::ZERO,
    };

    if inside(start) {
        clip.start_solid = true;
        if inside(end) {
            clip.all_solid = true;
            clip.fraction = 0.0;
        }
        return clip;
    }

    let delta = end - start;
    let length = delta.length();
    if length <= f32::EPSILON {
        return clip;
    }

    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut hit_axis = 0;
    for i in 0..3 {
        if delta[i].abs() <= f32::EPSILON {
            if start[i] <= lo[i] || start[i] >= hi[i] {
                return clip;
            }
            continue;
        }
        let inv = 1.0 / delta[i];
        let mut t0 = (lo[i] - start[i]) * inv;
        let mut t1 = (hi[i] - start[i]) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        if t0 > t_enter {
            t_enter = t0;
            hit_axis = i;
        }
        t_exit = t_exit.min(t1);
    }

    if t_enter >= t_exit || !(0.0..=1.0).contains(&t_enter) {
        return clip;
    }

    clip.fraction = ((t_enter * length - crate::constants::DIST_EPSILON) / length).max(0.0);
    clip.normal[hit_axis] = -delta[hit_axis].signum();
    clip
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube() -> (Vec3, Vec3) {
        (Vec3::new(-8.0, -8.0, -8.0), Vec3::new(8.0, 8.0, 8.0))
    }

    #[test]
    fn test_contents_ops() {
        let c = Contents::SOLID | Contents::WATER;
        assert!(c.intersects(Contents::WATER));
        assert!(c.contains(Contents::SOLID));
        assert!(c.is_liquid());
        assert!(!Contents::SOLID.is_liquid());
        assert!(Contents::EMPTY.is_empty());
    }

    #[test]
    fn test_clip_hits_face() {
        let (lo, hi) = cube();
        let clip = clip_box(
            Vec3::new(0.0, 0.0, 64.0),
            Vec3::new(0.0, 0.0, -64.0),
            &BoundingBox::POINT,
            lo,
            hi,
        );
        assert!(clip.fraction < 1.0);
        assert_eq!(clip.normal, Vec3::Z);
        let z = 64.0 - 128.0 * clip.fraction;
        assert!(z > 8.0 && z < 8.1);
    }

    #[test]
    fn test_clip_touching_is_not_solid() {
        let (lo, hi) = cube();
        let bbox = BoundingBox::upright(4.0, -4.0, 4.0);
        // resting exactly on top of the cube
        let clip = clip_box(
            Vec3::new(0.0, 0.0, 12.0),
            Vec3::new(0.0, 0.0, 12.0),
            &bbox,
            lo,
            hi,
        );
        assert!(!clip.start_solid);
        assert_eq!(clip.fraction, 1.0);

        let away = clip_box(
            Vec3::new(0.0, 0.0, 12.0),
            Vec3::new(0.0, 0.0, 40.0),
            &bbox,
            lo,
            hi,
        );
        assert_eq!(away.fraction, 1.0);

        let into = clip_box(
            Vec3::new(0.0, 0.0, 12.0),
            Vec3::new(0.0, 0.0, 0.0),
            &bbox,
            lo,
            hi,
        );
        assert_eq!(into.fraction, 0.0);
    }

    #[test]
    fn test_clip_embedded() {
        let (lo, hi) = cube();
        let clip = clip_box(Vec3::ZERO, Vec3::ZERO, &BoundingBox::POINT, lo, hi);
        assert!(clip.start_solid);
        assert!(clip.all_solid);
        assert_eq!(clip.fraction, 0.0);

        let leaving = clip_box(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 64.0),
            &BoundingBox::POINT,
            lo,
            hi,
        );
        assert!(leaving.start_solid);
        assert!(!leaving.all_solid);
    }

    #[test]
    fn test_clip_miss() {
        let (lo, hi) = cube();
        let clip = clip_box(
            Vec3::new(32.0, 0.0, 64.0),
            Vec3::new(32.0, 0.0, -64.0),
            &BoundingBox::POINT,
            lo,
            hi,
        );
        assert_eq!(clip.fraction, 1.0);
        assert!(!clip.start_solid);
    }
}
