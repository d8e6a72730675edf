//! Build-time constants for the attractor effect
//!
//! None of these are runtime-configurable. Tests build smaller
//! [`SaverConfig`](crate::SaverConfig) values directly instead.

use glam::Vec3;

/// Number of simulated particles
pub const PARTICLE_COUNT: u32 = 5000;

/// History slots owned by every particle
pub const RING_CAPACITY: u32 = 1000;

/// Lower corner of the box initial samples are drawn from
pub const MIN_BOUNDS: Vec3 = Vec3::new(-30.0, 0.0, 0.0);

/// Upper corner of the box initial samples are drawn from
pub const MAX_BOUNDS: Vec3 = Vec3::new(30.0, 0.0, 55.0);

/// Cadence of the animation driver
pub const FRAME_RATE_HZ: u32 = 30;

/// Two counter-clockwise triangles covering normalized device coordinates
pub const FULLSCREEN_TRIANGLES: [[f32; 2]; 6] = [
    [-1.0, -1.0],
    [1.0, -1.0],
    [1.0, 1.0],
    [-1.0, -1.0],
    [1.0, 1.0],
    [-1.0, 1.0],
];

/// Classic Lorenz parameters
pub const LORENZ_SIGMA: f32 = 10.0;
pub const LORENZ_RHO: f32 = 28.0;
pub const LORENZ_BETA: f32 = 8.0 / 3.0;

/// Integration timestep per frame
pub const LORENZ_DT: f32 = 0.005;

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_area(a: [f32; 2], b: [f32; 2], c: [f32; 2]) -> f32 {
        (b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])
    }

    #[test]
    fn test_fullscreen_triangles_are_counter_clockwise() {
        for tri in FULLSCREEN_TRIANGLES.chunks(3) {
            assert!(signed_area(tri[0], tri[1], tri[2]) > 0.0);
        }
    }

    #[test]
    fn test_fullscreen_triangles_cover_viewport() {
        let area: f32 = FULLSCREEN_TRIANGLES
            .chunks(3)
            .map(|tri| signed_area(tri[0], tri[1], tri[2]).abs() * 0.5)
            .sum();
        assert!((area - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_bounds_are_ordered() {
        assert!(MIN_BOUNDS.cmple(MAX_BOUNDS).all());
    }
}
