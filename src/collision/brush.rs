//! Axis-aligned brush world.
//!
//! Static level geometry made of boxes, each tagged with contents. Used by the
//! headless demo, the benches and most tests; a host engine plugs its own BSP
//! or navmesh queries in through [`CollisionService`] instead.

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};

use super::{clip_box, CollisionService, Contents, Trace};
use crate::entity::ActorHandle;
use crate::geometry::BoundingBox;

/// Serializable brush description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrushDef {
    pub mins: [f32; 3],
    pub maxs: [f32; 3],
    pub contents: Contents,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    pub mins: Vec3,
    pub maxs: Vec3,
    pub contents: Contents,
}

impl From<&BrushDef> for Brush {
    fn from(def: &BrushDef) -> Self {
        let b = BoundingBox::from_arrays(def.mins, def.maxs);
        Self {
            mins: b.mins,
            maxs: b.maxs,
            contents: def.contents,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BrushWorld {
    brushes: Vec<Brush>,
}

impl BrushWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_defs(defs: &[BrushDef]) -> Self {
        Self {
            brushes: defs.iter().map(Brush::from).collect(),
        }
    }

    pub fn add_box(&mut self, mins: Vec3, maxs: Vec3, contents: Contents) -> &mut Self {
        self.brushes.push(Brush {
            mins: mins.min(maxs),
            maxs: maxs.max(mins),
            contents,
        });
        self
    }

    pub fn with_box(mut self, mins: Vec3, maxs: Vec3, contents: Contents) -> Self {
        self.add_box(mins, maxs, contents);
        self
    }

    /// Solid slab whose exposed face lies on the plane `point . normal == offset`.
    /// `normal` is snapped to its major axis; the slab extends `extent` across
    /// the face and 64 units behind it.
    pub fn with_plane(self, normal: Vec3, offset: f32, extent: f32) -> Self {
        let axis = crate::geometry::major_axis(normal);
        let sign = normal[axis].signum();
        let face = offset * sign;
        let mut mins = Vec3::splat(-extent);
        let mut maxs = Vec3::splat(extent);
        if sign > 0.0 {
            mins[axis] = face - 64.0;
            maxs[axis] = face;
        } else {
            mins[axis] = face;
            maxs[axis] = face + 64.0;
        }
        self.with_box(mins, maxs, Contents::SOLID)
    }

    pub fn brushes(&self) -> &[Brush] {
        &self.brushes
    }

    pub fn len(&self) -> usize {
        self.brushes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brushes.is_empty()
    }
}

impl CollisionService for BrushWorld {
    fn trace(
        &self,
        start: Vec3,
        bbox: &BoundingBox,
        end: Vec3,
        _ignore: Option<ActorHandle>,
        mask: Contents,
    ) -> Trace {
        let mut result = Trace::clear(end);
        for brush in &self.brushes {
            if !brush.contents.intersects(mask) {
                continue;
            }
            let clip = clip_box(start, end, bbox, brush.mins, brush.maxs);
            if clip.start_solid {
                result.start_solid = true;
                result.contents |= brush.contents;
            }
            if clip.all_solid {
                result.all_solid = true;
            }
            if clip.fraction < result.fraction {
                result.fraction = clip.fraction;
                result.normal = clip.normal;
                result.contents = brush.contents;
            }
        }
        result.end_pos = start + (end - start) * result.fraction;
        result
    }

    fn point_contents(&self, point: Vec3) -> Contents {
        self.brushes
            .iter()
            .filter(|b| point.cmpge(b.mins).all() && point.cmple(b.maxs).all())
            .fold(Contents::EMPTY, |acc, b| acc | b.contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{MASK_MONSTERSOLID, MASK_SOLID, MASK_WATER};

    fn floor() -> BrushWorld {
        BrushWorld::new().with_plane(Vec3::Z, 0.0, 1024.0)
    }

    #[test]
    fn test_drop_onto_floor() {
        let world = floor();
        let bbox = BoundingBox::upright(16.0, -24.0, 32.0);
        let tr = world.trace(
            Vec3::new(0.0, 0.0, 64.0),
            &bbox,
            Vec3::new(0.0, 0.0, -192.0),
            None,
            MASK_MONSTERSOLID,
        );
        assert!(tr.fraction < 1.0);
        assert!((tr.end_pos.z - 24.0).abs() < 0.1);
        assert_eq!(tr.normal, Vec3::Z);
        assert!(!tr.start_solid);
    }

    #[test]
    fn test_mask_filters_brushes() {
        let world = BrushWorld::new().with_box(
            Vec3::new(-64.0, -64.0, -64.0),
            Vec3::new(64.0, 64.0, 0.0),
            Contents::WATER,
        );
        let start = Vec3::new(0.0, 0.0, 32.0);
        let end = Vec3::new(0.0, 0.0, -32.0);
        let solid = world.trace(start, &BoundingBox::POINT, end, None, MASK_SOLID);
        assert_eq!(solid.fraction, 1.0);
        let water = world.trace(start, &BoundingBox::POINT, end, None, MASK_WATER);
        assert!(water.fraction < 1.0);
        assert!(water.contents.is_liquid());
    }

    #[test]
    fn test_point_contents_inclusive() {
        let world = floor();
        assert!(world
            .point_contents(Vec3::new(0.0, 0.0, 0.0))
            .intersects(Contents::SOLID));
        assert!(world
            .point_contents(Vec3::new(0.0, 0.0, -1.0))
            .intersects(Contents::SOLID));
        assert!(world.point_contents(Vec3::new(0.0, 0.0, 1.0)).is_empty());
    }

    #[test]
    fn test_ceiling_plane() {
        let world = BrushWorld::new().with_plane(Vec3::NEG_Z, -128.0, 1024.0);
        assert!(world
            .point_contents(Vec3::new(0.0, 0.0, 130.0))
            .intersects(Contents::SOLID));
        assert!(world.point_contents(Vec3::new(0.0, 0.0, 120.0)).is_empty());
    }

    #[test]
    fn test_from_defs() {
        let defs = vec![BrushDef {
            mins: [0.0, 0.0, 0.0],
            maxs: [8.0, 8.0, 8.0],
            contents: Contents::SOLID,
        }];
        let world = BrushWorld::from_defs(&defs);
        assert_eq!(world.len(), 1);
        assert!(!world.point_contents(Vec3::splat(4.0)).is_empty());
    }
}
