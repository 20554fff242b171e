//! Box and direction math shared by collision, placement and AI.
//!
//! World space is Z-up. Actor volumes are axis-aligned boxes expressed
//! relative to the actor origin.

use bevy::math::Vec3;

/// Axis-aligned box relative to an origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub mins: Vec3,
    pub maxs: Vec3,
}

impl BoundingBox {
    pub const POINT: BoundingBox = BoundingBox {
        mins: Vec3::ZERO,
        maxs: Vec3::ZERO,
    };

    pub fn new(mins: Vec3, maxs: Vec3) -> Self {
        Self {
            mins: mins.min(maxs),
            maxs: maxs.max(mins),
        }
    }

    /// Symmetric box around the origin on X/Y with explicit vertical extent
    pub fn upright(half_width: f32, bottom: f32, top: f32) -> Self {
        Self::new(
            Vec3::new(-half_width, -half_width, bottom),
            Vec3::new(half_width, half_width, top),
        )
    }

    pub fn from_arrays(mins: [f32; 3], maxs: [f32; 3]) -> Self {
        Self::new(Vec3::from_array(mins), Vec3::from_array(maxs))
    }

    pub fn size(&self) -> Vec3 {
        self.maxs - self.mins
    }

    pub fn is_point(&self) -> bool {
        self.mins == Vec3::ZERO && self.maxs == Vec3::ZERO
    }

    /// Absolute bounds when placed at `origin`
    pub fn absolute(&self, origin: Vec3) -> (Vec3, Vec3) {
        (origin + self.mins, origin + self.maxs)
    }

    pub fn center(&self, origin: Vec3) -> Vec3 {
        origin + (self.mins + self.maxs) * 0.5
    }

    /// Copy of the box squashed to zero thickness on `axis`, keeping the face
    /// that leads along `sign`.
    pub fn flattened(&self, axis: usize, sign: f32) -> Self {
        let mut out = *self;
        let face = if sign < 0.0 {
            self.mins[axis]
        } else {
            self.maxs[axis]
        };
        out.mins[axis] = face;
        out.maxs[axis] = face;
        out
    }
}

/// Normalize a gravity direction, falling back to straight down when the
/// input is zero, denormal or non-finite.
pub fn normalize_gravity(gravity: Vec3) -> Vec3 {
    gravity.try_normalize().unwrap_or(Vec3::NEG_Z)
}

/// Index of the component with the largest magnitude
pub fn major_axis(v: Vec3) -> usize {
    let a = v.abs();
    if a.x >= a.y && a.x >= a.z {
        0
    } else if a.y >= a.z {
        1
    } else {
        2
    }
}

/// The two axes perpendicular to `axis`
pub fn other_axes(axis: usize) -> (usize, usize) {
    match axis {
        0 => (1, 2),
        1 => (0, 2),
        _ => (0, 1),
    }
}

/// Gap between two placed boxes (zero when they overlap)
pub fn box_gap(a_origin: Vec3, a: &BoundingBox, b_origin: Vec3, b: &BoundingBox) -> f32 {
    let (a_min, a_max) = a.absolute(a_origin);
    let (b_min, b_max) = b.absolute(b_origin);
    let mut sq = 0.0;
    for i in 0..3 {
        let d = if a_max[i] < b_min[i] {
            b_min[i] - a_max[i]
        } else if b_max[i] < a_min[i] {
            a_min[i] - b_max[i]
        } else {
            0.0
        };
        sq += d * d;
    }
    sq.sqrt()
}

/// Yaw in degrees of a direction projected onto the XY plane
pub fn vector_to_yaw(dir: Vec3) -> f32 {
    if dir.x == 0.0 && dir.y == 0.0 {
        return 0.0;
    }
    let yaw = dir.y.atan2(dir.x).to_degrees();
    if yaw < 0.0 {
        yaw + 360.0
    } else {
        yaw
    }
}

/// Unit forward vector on the XY plane for a yaw in degrees
pub fn yaw_to_forward(yaw: f32) -> Vec3 {
    let r = yaw.to_radians();
    Vec3::new(r.cos(), r.sin(), 0.0)
}

/// Unit right vector on the XY plane for a yaw in degrees
pub fn yaw_to_right(yaw: f32) -> Vec3 {
    let r = yaw.to_radians();
    Vec3::new(r.sin(), -r.cos(), 0.0)
}

/// Wrap an angle into [0, 360)
pub fn angle_mod(a: f32) -> f32 {
    a.rem_euclid(360.0)
}

/// Component of `v` perpendicular to gravity
pub fn horizontal(v: Vec3, gravity: Vec3) -> Vec3 {
    v - gravity * v.dot(gravity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_gravity_fallbacks() {
        assert_eq!(normalize_gravity(Vec3::ZERO), Vec3::NEG_Z);
        assert_eq!(normalize_gravity(Vec3::new(f32::NAN, 0.0, 0.0)), Vec3::NEG_Z);
        assert_eq!(
            normalize_gravity(Vec3::new(f32::INFINITY, 0.0, 0.0)),
            Vec3::NEG_Z
        );
        let g = normalize_gravity(Vec3::new(0.0, 0.0, 5.0));
        assert!((g - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_major_axis() {
        assert_eq!(major_axis(Vec3::new(0.0, 0.0, -1.0)), 2);
        assert_eq!(major_axis(Vec3::new(-1.0, 0.2, 0.3)), 0);
        assert_eq!(major_axis(Vec3::new(0.1, -0.9, 0.3)), 1);
    }

    #[test]
    fn test_box_gap() {
        let b = BoundingBox::upright(16.0, -24.0, 32.0);
        assert_eq!(box_gap(Vec3::ZERO, &b, Vec3::new(20.0, 0.0, 0.0), &b), 0.0);
        let gap = box_gap(Vec3::ZERO, &b, Vec3::new(72.0, 0.0, 0.0), &b);
        assert!((gap - 40.0).abs() < 1e-4);
    }

    #[test]
    fn test_yaw_roundtrip() {
        for yaw in [0.0f32, 45.0, 90.0, 180.0, 270.0] {
            let f = yaw_to_forward(yaw);
            assert!((vector_to_yaw(f) - yaw).abs() < 1e-3);
        }
    }

    #[test]
    fn test_flattened_keeps_leading_face() {
        let b = BoundingBox::upright(16.0, -24.0, 32.0);
        let down = b.flattened(2, -1.0);
        assert_eq!(down.mins.z, -24.0);
        assert_eq!(down.maxs.z, -24.0);
        let up = b.flattened(2, 1.0);
        assert_eq!(up.mins.z, 32.0);
    }

    #[test]
    fn test_box_new_orders_corners() {
        let b = BoundingBox::new(Vec3::splat(4.0), Vec3::splat(-4.0));
        assert_eq!(b.mins, Vec3::splat(-4.0));
        assert_eq!(b.size(), Vec3::splat(8.0));
    }
}
