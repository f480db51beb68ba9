//! Headless instanced wave renderer.

use std::cell::RefCell;
use std::sync::Arc;

use wgpu::{BindGroup, Buffer, Device, Queue, TextureFormat, TextureView};

use super::{
    context::GpuContext,
    pipeline::{WavePipeline, WaveUniforms, DEPTH_FORMAT},
    textures::{ReadbackBuffer, ReadbackError, RenderTarget},
};
use crate::animation::AnimationState;
use crate::config::WaveConfig;
use crate::geometry::{capsule_vertices, layout_instances, CapsuleSpec};

pub const OUTPUT_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

/// Errors that can occur while setting up or drawing the wave.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("GPU unavailable: {0}")]
    Gpu(#[from] super::context::GpuError),
    #[error("unsupported MSAA sample count {0}")]
    InvalidSampleCount(u32),
    #[error("frame readback failed: {0}")]
    Readback(#[from] ReadbackError),
    #[error("wave pipeline setup rejected by the device: {0}")]
    Pipeline(String),
}

/// Configuration for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub msaa_samples: u32,
    pub clear_color: [f64; 4],
    pub capsule: CapsuleSpec,
    pub instance_count: u32,
    pub instance_spacing: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::from_wave_config(&WaveConfig::default())
    }
}

impl RenderConfig {
    pub fn from_wave_config(config: &WaveConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            msaa_samples: config.msaa_samples,
            clear_color: config.clear_color,
            capsule: CapsuleSpec {
                width: config.capsule_width,
                height: config.capsule_height,
                segments: config.capsule_segments,
                color: config.capsule_color,
            },
            instance_count: config.instance_count,
            instance_spacing: config.instance_spacing,
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Draws every instance of the capsule in one instanced call.
///
/// Frames go to an offscreen `Rgba8Unorm` target (multisampled and resolved
/// when `msaa_samples > 1`) with a `Depth32Float` depth buffer.
pub struct WaveRenderer {
    device: Arc<Device>,
    queue: Arc<Queue>,
    pipeline: WavePipeline,
    msaa: Option<RenderTarget>,
    depth: RenderTarget,
    output: RenderTarget,
    readback: ReadbackBuffer,
    /// State buffer filled from the CPU when the animator is not on the GPU.
    host_state: Buffer,
    host_bind_group: BindGroup,
    /// Bind group of the last external state buffer drawn from.
    state_bind_group: RefCell<Option<(Buffer, BindGroup)>>,
    config: RenderConfig,
}

impl WaveRenderer {
    /// Create a renderer on its own GPU context.
    pub async fn new(config: RenderConfig) -> Result<Self, RenderError> {
        let ctx = GpuContext::new().await?;
        Self::with_device(ctx.device, ctx.queue, config)
    }

    /// Create a renderer sharing an existing device.
    pub fn with_device(
        device: Arc<Device>,
        queue: Arc<Queue>,
        config: RenderConfig,
    ) -> Result<Self, RenderError> {
        if !matches!(config.msaa_samples, 1 | 4) {
            return Err(RenderError::InvalidSampleCount(config.msaa_samples));
        }
        let size = (config.width, config.height);
        let samples = config.msaa_samples;

        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let vertices = capsule_vertices(&config.capsule);
        let instances = layout_instances(config.instance_count, config.instance_spacing);
        let pipeline = WavePipeline::new(&device, &queue, OUTPUT_FORMAT, samples, &vertices, &instances);

        let msaa = (samples > 1).then(|| RenderTarget::for_msaa(&device, size, OUTPUT_FORMAT, samples));
        let depth = RenderTarget::for_depth(&device, size, DEPTH_FORMAT, samples);
        let output = RenderTarget::for_output(&device, size, OUTPUT_FORMAT);
        let readback = ReadbackBuffer::new(&device, config.width, config.height);

        let host_state = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("wave_host_state"),
            size: config.instance_count.max(1) as u64 * 16,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let host_bind_group = pipeline.create_bind_group(&device, &host_state);
        if let Some(e) = pollster::block_on(scope.pop()) {
            return Err(RenderError::Pipeline(e.to_string()));
        }

        log::info!(
            "wave renderer: {}x{}, {}x MSAA, {} instances of {} vertices",
            config.width,
            config.height,
            samples,
            config.instance_count,
            vertices.len()
        );

        Ok(Self {
            device,
            queue,
            pipeline,
            msaa,
            depth,
            output,
            readback,
            host_state,
            host_bind_group,
            state_bind_group: RefCell::new(None),
            config,
        })
    }

    /// Copy a CPU-side state into the renderer's own state buffer.
    pub fn upload_state(&self, state: &AnimationState) {
        let words = state.to_words();
        if words.is_empty() {
            return;
        }
        self.queue
            .write_buffer(&self.host_state, 0, bytemuck::cast_slice(&words));
    }

    /// The buffer [`upload_state`](Self::upload_state) writes to.
    pub fn host_state(&self) -> &Buffer {
        &self.host_state
    }

    /// Draw one frame into the offscreen target.
    pub fn render(&self, uniforms: &WaveUniforms, state: &Buffer) {
        self.render_to_view(uniforms, state, self.output.view());
    }

    /// Draw one frame into a host-provided view.
    ///
    /// The view must be `Rgba8Unorm` and match the configured size; with
    /// MSAA enabled it receives the resolved image.
    pub fn render_to_view(&self, uniforms: &WaveUniforms, state: &Buffer, view: &TextureView) {
        match &self.msaa {
            Some(msaa) => self.draw(uniforms, state, msaa.view(), Some(view)),
            None => self.draw(uniforms, state, view, None),
        }
    }

    /// Draw one frame and return its RGBA pixels.
    pub fn render_frame(
        &self,
        uniforms: &WaveUniforms,
        state: &Buffer,
    ) -> Result<Vec<u8>, RenderError> {
        self.render(uniforms, state);
        self.read_pixels()
    }

    /// Read back the most recent offscreen frame.
    pub fn read_pixels(&self) -> Result<Vec<u8>, RenderError> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback_encoder"),
            });
        self.readback.encode_copy(&mut encoder, self.output.texture());
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(self.readback.read_pixels(&self.device)?)
    }

    fn draw(
        &self,
        uniforms: &WaveUniforms,
        state: &Buffer,
        color_view: &TextureView,
        resolve_target: Option<&TextureView>,
    ) {
        self.queue.write_buffer(
            &self.pipeline.uniform_buffer,
            0,
            bytemuck::bytes_of(uniforms),
        );
        let bind_group = self.bind_group_for(state);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("wave_render_encoder"),
            });

        {
            let [r, g, b, a] = self.config.clear_color;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("wave_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.depth.view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            render_pass.set_pipeline(&self.pipeline.pipeline);
            render_pass.set_bind_group(0, &bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.pipeline.vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.pipeline.instance_buffer.slice(..));
            render_pass.draw(
                0..self.pipeline.vertex_count,
                0..self.pipeline.instance_count,
            );
        }

        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Bind groups are built once per state buffer.
    fn bind_group_for(&self, state: &Buffer) -> BindGroup {
        if *state == self.host_state {
            return self.host_bind_group.clone();
        }
        let mut cached = self.state_bind_group.borrow_mut();
        match cached.as_ref() {
            Some((buffer, group)) if buffer == state => group.clone(),
            _ => {
                log::debug!("binding new state buffer for the wave pass");
                let group = self.pipeline.create_bind_group(&self.device, state);
                *cached = Some((state.clone(), group.clone()));
                group
            }
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }
}
