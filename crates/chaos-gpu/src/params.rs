//! Uniform blocks shared with the WGSL programs

use bytemuck::{Pod, Zeroable};
use chaos_core::{Lorenz, SaverConfig};

/// Samples per particle the visual pass accumulates, newest first.
///
/// Every fragment visits every particle, so this multiplies the per-pixel cost.
pub const TRAIL_SAMPLES: u32 = 1;

/// Glow falloff radius in normalized device units
pub const GLOW_RADIUS: f32 = 0.004;

/// Matches WGSL `UpdateParams` in `update.wgsl`
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct UpdateParams {
    pub sigma: f32,
    pub rho: f32,
    pub beta: f32,
    pub dt: f32,
    pub particle_count: u32,
    pub capacity: u32,
    pub _padding: [u32; 2],
}

impl UpdateParams {
    pub fn new(config: &SaverConfig) -> Self {
        let Lorenz {
            sigma,
            rho,
            beta,
            dt,
        } = config.attractor;
        Self {
            sigma,
            rho,
            beta,
            dt,
            particle_count: config.particle_count,
            capacity: config.ring_capacity,
            _padding: [0; 2],
        }
    }
}

/// Matches WGSL `VisualParams` in `visual.wgsl`
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct VisualParams {
    pub view_proj: [[f32; 4]; 4],
    pub resolution: [f32; 2],
    pub particle_count: u32,
    pub capacity: u32,
    pub trail_length: u32,
    pub glow_radius: f32,
    pub time: f32,
    pub _padding: f32,
    pub glow_color: [f32; 4],
    pub background: [f32; 4],
}

impl VisualParams {
    pub fn new(config: &SaverConfig) -> Self {
        Self {
            view_proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
            resolution: [1.0, 1.0],
            particle_count: config.particle_count,
            capacity: config.ring_capacity,
            trail_length: TRAIL_SAMPLES.min(config.ring_capacity),
            glow_radius: GLOW_RADIUS,
            time: 0.0,
            _padding: 0.0,
            // Catppuccin Mocha sapphire on base, linear
            glow_color: [0.0545, 0.5089, 0.6514, 1.0],
            background: [0.01176, 0.01176, 0.02447, 1.0],
        }
    }
}
