//! Slowly orbiting camera around the attractor

use chaos_core::Bounds;
use glam::{Mat4, Quat, Vec3};

/// Orbit speed in radians per presented frame
const ORBIT_STEP: f32 = 0.002;

pub struct Camera {
    pub distance: f32,
    pub rotation: Quat,
    pub target: Vec3,
    pub aspect: f32,
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    /// Camera framing the attractor, which lives roughly within x,y: [-25, 25], z: [0, 50]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            distance: 110.0,
            rotation: Quat::from_rotation_x(-0.25),
            target: Vec3::new(0.0, 0.0, 25.0),
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: 45.0_f32.to_radians(),
            znear: 0.1,
            zfar: 1000.0,
        }
    }

    /// Camera looking at the center of `bounds`
    pub fn framing(bounds: &Bounds, width: u32, height: u32) -> Self {
        let mut camera = Self::new(width, height);
        let extent = bounds.extent().length();
        if extent > 0.0 {
            camera.target = bounds.center();
            camera.distance = camera.distance.max(extent * 1.5);
        }
        camera
    }

    pub fn position(&self) -> Vec3 {
        // Z is up in attractor space; the camera starts on the -Y side
        let offset = self.rotation * Vec3::new(0.0, -self.distance, 0.0);
        self.target + offset
    }

    /// Rotate around the vertical axis
    pub fn orbit(&mut self, angle: f32) {
        self.rotation = Quat::from_rotation_z(angle) * self.rotation;
    }

    pub fn advance(&mut self) {
        self.orbit(ORBIT_STEP);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn view_proj(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.position(), self.target, Vec3::Z);
        let proj = Mat4::perspective_rh(self.fovy, self.aspect, self.znear, self.zfar);
        proj * view
    }
}
