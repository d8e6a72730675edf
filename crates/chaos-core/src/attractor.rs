//! Chaotic systems that advance a particle by one step

use crate::{LORENZ_BETA, LORENZ_DT, LORENZ_RHO, LORENZ_SIGMA};
use glam::Vec3;

/// Given a particle's newest sample, produce its next one.
pub trait Attractor {
    fn step(&self, p: Vec3) -> Vec3;
}

/// Lorenz system integrated with a forward Euler step
///
///   dx/dt = σ(y - x)
///   dy/dt = x(ρ - z) - y
///   dz/dt = xy - βz
///
/// The WGSL kernel in `update.wgsl` evaluates the same expression.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lorenz {
    pub sigma: f32,
    pub rho: f32,
    pub beta: f32,
    pub dt: f32,
}

impl Default for Lorenz {
    fn default() -> Self {
        Self {
            sigma: LORENZ_SIGMA,
            rho: LORENZ_RHO,
            beta: LORENZ_BETA,
            dt: LORENZ_DT,
        }
    }
}

impl Lorenz {
    pub fn derivative(&self, p: Vec3) -> Vec3 {
        Vec3::new(
            self.sigma * (p.y - p.x),
            p.x * (self.rho - p.z) - p.y,
            p.x * p.y - self.beta * p.z,
        )
    }
}

impl Attractor for Lorenz {
    fn step(&self, p: Vec3) -> Vec3 {
        p + self.derivative(p) * self.dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_is_fixed_point() {
        let lorenz = Lorenz::default();
        assert_eq!(lorenz.step(Vec3::ZERO), Vec3::ZERO);
    }

    #[test]
    fn test_nonzero_fixed_point() {
        // C+ = (sqrt(β(ρ-1)), sqrt(β(ρ-1)), ρ-1)
        let lorenz = Lorenz::default();
        let r = (lorenz.beta * (lorenz.rho - 1.0)).sqrt();
        let c = Vec3::new(r, r, lorenz.rho - 1.0);
        assert!(lorenz.derivative(c).length() < 1e-3);
    }

    #[test]
    fn test_trajectory_stays_bounded() {
        let lorenz = Lorenz::default();
        let mut p = Vec3::new(1.0, 1.0, 20.0);
        for _ in 0..20_000 {
            p = lorenz.step(p);
            assert!(p.is_finite());
        }
        assert!(p.x.abs() < 30.0 && p.y.abs() < 40.0 && p.z > -1.0 && p.z < 60.0);
    }
}
