//! Points and spatial bounds

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use rand::Rng;

/// GPU-compatible position sample
/// Padded to 16 bytes to match the WGSL `vec3<f32>` array stride
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Point {
    pub position: [f32; 3],
    pub _padding: f32,
}

impl Point {
    pub const ZERO: Self = Self {
        position: [0.0; 3],
        _padding: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: [x, y, z],
            _padding: 0.0,
        }
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

impl From<Vec3> for Point {
    fn from(v: Vec3) -> Self {
        Self {
            position: v.to_array(),
            _padding: 0.0,
        }
    }
}

impl From<Point> for Vec3 {
    fn from(p: Point) -> Self {
        p.to_vec3()
    }
}

/// Axis-aligned box, inclusive on both corners
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub const UNIT_CUBE: Self = Self {
        min: Vec3::ZERO,
        max: Vec3::ONE,
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Draw a point uniformly, per axis, from the box.
    ///
    /// Degenerate axes (`min == max`) always yield that coordinate.
    pub fn sample(&self, rng: &mut impl Rng) -> Vec3 {
        Vec3::new(
            rng.random_range(self.min.x..=self.max.x),
            rng.random_range(self.min.y..=self.max.y),
            rng.random_range(self.min.z..=self.max.z),
        )
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min.cmple(self.max).all()
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_point_layout_matches_wgsl_stride() {
        assert_eq!(std::mem::size_of::<Point>(), 16);
    }

    #[test]
    fn test_samples_stay_in_bounds() {
        let bounds = Bounds::new(Vec3::new(-30.0, 0.0, 0.0), Vec3::new(30.0, 0.0, 55.0));
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let p = bounds.sample(&mut rng);
            assert!(bounds.contains(p), "{p} escaped {bounds:?}");
            assert_eq!(p.y, 0.0);
        }
    }

    #[test]
    fn test_point_vec3_conversion() {
        let v = Vec3::new(1.0, -2.0, 3.5);
        let p = Point::from(v);
        assert_eq!(p.position, [1.0, -2.0, 3.5]);
        assert_eq!(Vec3::from(p), v);
    }

    #[test]
    fn test_inverted_bounds_are_invalid() {
        assert!(Bounds::UNIT_CUBE.is_valid());
        assert!(!Bounds::new(Vec3::ONE, Vec3::ZERO).is_valid());
    }
}
