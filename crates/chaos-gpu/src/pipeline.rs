//! Per-frame compute-then-render pipeline
//!
//! Each call to [`ChaosPipeline::render_frame`] encodes one compute pass (one
//! invocation per particle, appending the next attractor sample to that particle's
//! ring buffer) followed by one full-screen render pass that reads the same
//! storage. Both passes go into a single command encoder and a single submission,
//! so the render pass always sees the positions written by this frame's dispatch.

use crate::camera::Camera;
use crate::frame::{FrameOutcome, FramePhase, FrameTarget};
use crate::params::{UpdateParams, VisualParams};
use crate::provision::{self, StagingRelease};
use crate::shader_library::{
    ShaderLibrary, UPDATE_ENTRY, UPDATE_PROGRAM, VISUAL_FRAGMENT_ENTRY, VISUAL_PROGRAM,
    VISUAL_VERTEX_ENTRY,
};
use crate::GpuContext;
use anyhow::{bail, ensure, Result};
use chaos_core::{ParticleHistory, Point, RingBufferHeader, SaverConfig, FULLSCREEN_TRIANGLES};
use wgpu::util::DeviceExt;

const WORKGROUP_SIZE: u32 = 64;

fn storage_entry(binding: u32, visibility: wgpu::ShaderStages, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Headers, points and a parameter block, in binding order
fn bind_entries<'a>(
    headers: &'a wgpu::Buffer,
    points: &'a wgpu::Buffer,
    params: &'a wgpu::Buffer,
) -> [wgpu::BindGroupEntry<'a>; 3] {
    [
        wgpu::BindGroupEntry {
            binding: 0,
            resource: headers.as_entire_binding(),
        },
        wgpu::BindGroupEntry {
            binding: 1,
            resource: points.as_entire_binding(),
        },
        wgpu::BindGroupEntry {
            binding: 2,
            resource: params.as_entire_binding(),
        },
    ]
}

/// Both storage tables are bound whole, so each must fit one storage binding.
fn check_binding_limits(limits: &wgpu::Limits, config: &SaverConfig) -> Result<()> {
    let max = u64::from(limits.max_storage_buffer_binding_size);
    let header_bytes =
        u64::from(config.particle_count) * std::mem::size_of::<RingBufferHeader>() as u64;
    let point_bytes = config.slot_count() * std::mem::size_of::<Point>() as u64;
    ensure!(
        header_bytes <= max,
        "ring headers need {header_bytes} bytes, storage bindings are limited to {max}"
    );
    ensure!(
        point_bytes <= max,
        "point storage needs {point_bytes} bytes, storage bindings are limited to {max}"
    );
    Ok(())
}

/// Reinterpret tightly packed GPU records; readback memory carries no alignment guarantee
fn decode<T: bytemuck::Pod>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(std::mem::size_of::<T>())
        .map(bytemuck::pod_read_unaligned)
        .collect()
}

/// Compiled pipeline state objects and their layouts
struct Pipelines {
    update: wgpu::ComputePipeline,
    update_layout: wgpu::BindGroupLayout,
    visual: wgpu::RenderPipeline,
    visual_layout: wgpu::BindGroupLayout,
}

/// Resolve both programs from `library` and build their pipeline objects.
///
/// Missing programs or entry points fail before anything is compiled; shader
/// compilation and pipeline validation errors are caught with an error scope.
async fn build_pipelines(
    ctx: &GpuContext,
    library: &ShaderLibrary,
    format: wgpu::TextureFormat,
) -> Result<Pipelines> {
    let update_program = library.program(UPDATE_PROGRAM)?;
    update_program.require_entry_point(UPDATE_ENTRY)?;
    let visual_program = library.program(VISUAL_PROGRAM)?;
    visual_program.require_entry_point(VISUAL_VERTEX_ENTRY)?;
    visual_program.require_entry_point(VISUAL_FRAGMENT_ENTRY)?;

    let device = &ctx.device;
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let update_shader = update_program.create_module(device);
    let visual_shader = visual_program.create_module(device);
    log::info!("Shaders loaded");

    // 0: headers, 1: points, 2: params
    let update_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Update Bind Group Layout"),
        entries: &[
            storage_entry(0, wgpu::ShaderStages::COMPUTE, false),
            storage_entry(1, wgpu::ShaderStages::COMPUTE, false),
            uniform_entry(2, wgpu::ShaderStages::COMPUTE),
        ],
    });

    // Same bindings, read-only for the render pass
    let visual_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Visual Bind Group Layout"),
        entries: &[
            storage_entry(0, wgpu::ShaderStages::FRAGMENT, true),
            storage_entry(1, wgpu::ShaderStages::FRAGMENT, true),
            uniform_entry(2, wgpu::ShaderStages::FRAGMENT),
        ],
    });

    let update_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Update Pipeline Layout"),
        bind_group_layouts: &[&update_layout],
        push_constant_ranges: &[],
    });

    let update = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("Update Pipeline"),
        layout: Some(&update_pipeline_layout),
        module: &update_shader,
        entry_point: Some(UPDATE_ENTRY),
        compilation_options: Default::default(),
        cache: None,
    });

    let visual_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Visual Pipeline Layout"),
        bind_group_layouts: &[&visual_layout],
        push_constant_ranges: &[],
    });

    let visual = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Visual Pipeline"),
        layout: Some(&visual_pipeline_layout),
        vertex: wgpu::VertexState {
            module: &visual_shader,
            entry_point: Some(VISUAL_VERTEX_ENTRY),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x2],
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &visual_shader,
            entry_point: Some(VISUAL_FRAGMENT_ENTRY),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            unclipped_depth: ctx.supports_depth_clamp(),
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    if let Some(err) = device.pop_error_scope().await {
        bail!("failed to build pipeline state: {err}");
    }

    log::info!("Pipelines created");

    Ok(Pipelines {
        update,
        update_layout,
        visual,
        visual_layout,
    })
}

/// GPU-side attractor simulation plus its full-screen visualization
pub struct ChaosPipeline {
    ctx: GpuContext,
    config: SaverConfig,

    // Device-exclusive storage
    header_buffer: wgpu::Buffer,
    point_buffer: wgpu::Buffer,
    staging: Vec<StagingRelease>,

    _update_params_buffer: wgpu::Buffer,
    visual_params_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,

    update_pipeline: wgpu::ComputePipeline,
    visual_pipeline: wgpu::RenderPipeline,
    update_bind_group: wgpu::BindGroup,
    visual_bind_group: wgpu::BindGroup,

    camera: Camera,
    visual_params: VisualParams,
    phase: FramePhase,
    frames_rendered: u64,
}

impl ChaosPipeline {
    /// Build pipelines and move `history` into device-exclusive memory.
    ///
    /// Every failure here is fatal: the effect cannot run without its programs
    /// or its storage.
    pub async fn new(
        ctx: &GpuContext,
        library: &ShaderLibrary,
        config: SaverConfig,
        history: &ParticleHistory,
        format: wgpu::TextureFormat,
    ) -> Result<Self> {
        log::info!("Initializing ChaosPipeline...");
        config.validate()?;
        ensure!(
            history.particle_count() == config.particle_count
                && history.capacity() == config.ring_capacity,
            "history holds {} particles x {} slots, config expects {} x {}",
            history.particle_count(),
            history.capacity(),
            config.particle_count,
            config.ring_capacity
        );

        check_binding_limits(&ctx.device.limits(), &config)?;
        let pipelines = build_pipelines(ctx, library, format).await?;

        // Provisioning goes on the queue ahead of any frame work
        let headers = provision::provision(ctx, "Ring Header Buffer", history.header_bytes()).await?;
        let points = provision::provision(ctx, "Point Storage Buffer", history.point_bytes()).await?;

        let update_params_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Update Params Buffer"),
                contents: bytemuck::cast_slice(&[UpdateParams::new(&config)]),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let visual_params = VisualParams::new(&config);
        let visual_params_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Visual Params Buffer"),
                contents: bytemuck::cast_slice(&[visual_params]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        let vertex_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Fullscreen Vertex Buffer"),
                contents: bytemuck::cast_slice(&FULLSCREEN_TRIANGLES),
                usage: wgpu::BufferUsages::VERTEX,
            });

        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let update_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Update Bind Group"),
            layout: &pipelines.update_layout,
            entries: &bind_entries(&headers.buffer, &points.buffer, &update_params_buffer),
        });

        let visual_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Visual Bind Group"),
            layout: &pipelines.visual_layout,
            entries: &bind_entries(&headers.buffer, &points.buffer, &visual_params_buffer),
        });

        if let Some(err) = ctx.device.pop_error_scope().await {
            bail!("failed to bind particle storage: {err}");
        }

        log::info!(
            "✓ ChaosPipeline ready: {} particles x {} history slots",
            config.particle_count,
            config.ring_capacity
        );

        Ok(Self {
            ctx: ctx.clone(),
            config,
            header_buffer: headers.buffer,
            point_buffer: points.buffer,
            staging: vec![headers.staging, points.staging],
            _update_params_buffer: update_params_buffer,
            visual_params_buffer,
            vertex_buffer,
            update_pipeline: pipelines.update,
            visual_pipeline: pipelines.visual,
            update_bind_group,
            visual_bind_group,
            camera: Camera::framing(&config.spawn_bounds, 1, 1),
            visual_params,
            phase: FramePhase::Idle,
            frames_rendered: 0,
        })
    }

    fn transition(&mut self, to: FramePhase) {
        debug_assert_eq!(self.phase.next(), to, "frame phase out of order");
        log::trace!("frame {}: {:?} -> {:?}", self.frames_rendered, self.phase, to);
        self.phase = to;
    }

    /// Advance the simulation one step and draw it into `target`.
    ///
    /// Returns [`FrameOutcome::Skipped`] without touching the GPU when the target
    /// has nothing to draw into.
    pub fn render_frame(&mut self, target: &mut impl FrameTarget) -> FrameOutcome {
        let Some(frame) = target.acquire() else {
            log::debug!("no drawable available, skipping frame");
            return FrameOutcome::Skipped;
        };

        self.camera.resize(frame.width, frame.height);
        self.camera.advance();
        self.visual_params.view_proj = self.camera.view_proj().to_cols_array_2d();
        self.visual_params.resolution = [frame.width as f32, frame.height as f32];
        self.visual_params.time = self.frames_rendered as f32 / self.config.frame_rate_hz as f32;
        self.ctx.queue.write_buffer(
            &self.visual_params_buffer,
            0,
            bytemuck::cast_slice(&[self.visual_params]),
        );

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        self.encode_update(&mut encoder);
        self.transition(FramePhase::ComputeDispatched);

        self.encode_visual(&mut encoder, &frame.view);
        self.transition(FramePhase::RenderEncoded);

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        self.transition(FramePhase::Presented);

        self.frames_rendered += 1;
        self.transition(FramePhase::Idle);
        FrameOutcome::Presented
    }

    fn encode_update(&self, encoder: &mut wgpu::CommandEncoder) {
        let workgroup_count = self.config.particle_count.div_ceil(WORKGROUP_SIZE);

        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Update Compute Pass"),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(&self.update_pipeline);
        compute_pass.set_bind_group(0, &self.update_bind_group, &[]);
        compute_pass.dispatch_workgroups(workgroup_count, 1, 1);
    }

    fn encode_visual(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let [r, g, b, a] = self.visual_params.background.map(f64::from);

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Visual Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.visual_pipeline);
        render_pass.set_bind_group(0, &self.visual_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.draw(0..FULLSCREEN_TRIANGLES.len() as u32, 0..1);
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Whether both staging buffers have been released
    pub fn staging_released(&self) -> bool {
        self.staging.iter().all(StagingRelease::is_released)
    }

    /// Copy headers and points back to the host. Blocks until the GPU is idle.
    pub fn read_back_history(&self) -> Result<ParticleHistory> {
        let header_len = self.config.particle_count as u64
            * std::mem::size_of::<RingBufferHeader>() as u64;
        let point_len = self.config.slot_count() * std::mem::size_of::<Point>() as u64;

        let header_bytes = provision::read_back(&self.ctx, &self.header_buffer, header_len)?;
        let point_bytes = provision::read_back(&self.ctx, &self.point_buffer, point_len)?;

        ParticleHistory::from_parts(decode(&header_bytes), decode(&point_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_fits_default_limits() {
        check_binding_limits(&wgpu::Limits::default(), &SaverConfig::default()).unwrap();
    }

    #[test]
    fn test_oversized_point_storage_is_rejected() {
        let limits = wgpu::Limits {
            max_storage_buffer_binding_size: 1024,
            ..wgpu::Limits::default()
        };
        let config = SaverConfig {
            particle_count: 4,
            ring_capacity: 32,
            ..Default::default()
        };
        // 4 x 32 points of 16 bytes is 2048 bytes
        let err = check_binding_limits(&limits, &config).unwrap_err();
        assert!(err.to_string().contains("point storage"));

        let fits = SaverConfig {
            ring_capacity: 16,
            ..config
        };
        check_binding_limits(&limits, &fits).unwrap();
    }
}
