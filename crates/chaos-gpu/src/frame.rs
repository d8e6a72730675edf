//! Render targets and per-frame bookkeeping

/// Where a frame is drawn. Implemented by the window surface and by
/// [`OffscreenTarget`].
pub trait FrameTarget {
    fn format(&self) -> wgpu::TextureFormat;

    /// Next image to draw into, or `None` when nothing is drawable right now.
    /// `None` makes the pipeline skip the frame entirely.
    fn acquire(&mut self) -> Option<AcquiredFrame>;
}

/// An image ready for one render pass
pub struct AcquiredFrame {
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    surface_texture: Option<wgpu::SurfaceTexture>,
}

impl AcquiredFrame {
    pub fn from_surface(texture: wgpu::SurfaceTexture) -> Self {
        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            view,
            width: texture.texture.width(),
            height: texture.texture.height(),
            surface_texture: Some(texture),
        }
    }

    pub fn from_texture(texture: &wgpu::Texture) -> Self {
        Self {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            width: texture.width(),
            height: texture.height(),
            surface_texture: None,
        }
    }

    /// Hand the image to the compositor. A no-op for offscreen images.
    pub fn present(self) {
        if let Some(texture) = self.surface_texture {
            texture.present();
        }
    }
}

/// Texture-backed target for headless rendering
pub struct OffscreenTarget {
    texture: wgpu::Texture,
    available: bool,
}

impl OffscreenTarget {
    pub fn new(device: &wgpu::Device, width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Target"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        Self {
            texture,
            available: true,
        }
    }

    /// Simulate a surface that temporarily has no drawable
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }
}

impl FrameTarget for OffscreenTarget {
    fn format(&self) -> wgpu::TextureFormat {
        self.texture.format()
    }

    fn acquire(&mut self) -> Option<AcquiredFrame> {
        self.available
            .then(|| AcquiredFrame::from_texture(&self.texture))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Compute, render and present all happened
    Presented,
    /// No drawable was available; nothing was encoded
    Skipped,
}

/// Where the current frame is in its compute-then-render sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramePhase {
    #[default]
    Idle,
    ComputeDispatched,
    RenderEncoded,
    Presented,
}

impl FramePhase {
    pub fn next(self) -> Self {
        match self {
            FramePhase::Idle => FramePhase::ComputeDispatched,
            FramePhase::ComputeDispatched => FramePhase::RenderEncoded,
            FramePhase::RenderEncoded => FramePhase::Presented,
            FramePhase::Presented => FramePhase::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_cycle_returns_to_idle() {
        let mut phase = FramePhase::default();
        let mut seen = vec![phase];
        for _ in 0..4 {
            phase = phase.next();
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                FramePhase::Idle,
                FramePhase::ComputeDispatched,
                FramePhase::RenderEncoded,
                FramePhase::Presented,
                FramePhase::Idle,
            ]
        );
    }
}
