//! Device, queue and adapter ownership

use anyhow::{Context, Result};

/// Everything the effect needs from the GPU, passed explicitly instead of held
/// in globals. Cloning is cheap: wgpu handles are reference counted.
#[derive(Clone)]
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Pick an adapter (compatible with `surface` if given) and open a device on it.
    pub async fn new(
        instance: wgpu::Instance,
        surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible GPU adapter available")?;

        log::info!("✓ Using GPU: {}", adapter.get_info().name);

        // Depth clamping for the full-screen pass, where supported
        let required_features = adapter.features() & wgpu::Features::DEPTH_CLIP_CONTROL;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Chaos Device"),
                required_features,
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to open GPU device")?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Context with no presentation surface, for offscreen rendering and tests
    pub async fn headless() -> Result<Self> {
        Self::new(wgpu::Instance::default(), None).await
    }

    pub fn supports_depth_clamp(&self) -> bool {
        self.device
            .features()
            .contains(wgpu::Features::DEPTH_CLIP_CONTROL)
    }
}
