//! Window surface as a frame target

use chaos_gpu::{AcquiredFrame, FrameTarget, GpuContext};
use winit::dpi::PhysicalSize;

pub struct SurfaceTarget {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    config: wgpu::SurfaceConfiguration,
}

impl SurfaceTarget {
    pub fn new(surface: wgpu::Surface<'static>, ctx: &GpuContext, size: PhysicalSize<u32>) -> Self {
        let surface_caps = surface.get_capabilities(&ctx.adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            // One frame in flight
            desired_maximum_frame_latency: 1,
        };
        surface.configure(&ctx.device, &config);

        Self {
            surface,
            device: ctx.device.clone(),
            config,
        }
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        // Minimized windows report zero; keep the old configuration until restored
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }
}

impl FrameTarget for SurfaceTarget {
    fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    fn acquire(&mut self) -> Option<AcquiredFrame> {
        match self.surface.get_current_texture() {
            Ok(texture) => Some(AcquiredFrame::from_surface(texture)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                None
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("out of memory acquiring surface texture");
                None
            }
            Err(e) => {
                log::debug!("surface texture unavailable: {e:?}");
                None
            }
        }
    }
}
