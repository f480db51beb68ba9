//! Instanced wave rendering pipeline.

use glam::Mat4;
use wgpu::{BindGroup, BindGroupLayout, Buffer, Device, RenderPipeline, TextureFormat};

use super::layouts::create_wave_layout;
use crate::geometry::{InstanceTransform, Vertex};

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Uniform data passed to shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct WaveUniforms {
    /// `Projection * View`.
    pub view_projection: [[f32; 4]; 4],
    /// Global rotation applied on top of each instance's placement.
    pub spin: [[f32; 4]; 4],
    pub max_center_stretch: f32,
    pub instance_count: u32,
    pub _padding: [u32; 2],
}

impl WaveUniforms {
    pub fn new(
        projection: Mat4,
        view: Mat4,
        spin: Mat4,
        max_center_stretch: f32,
        instance_count: u32,
    ) -> Self {
        Self {
            view_projection: (projection * view).to_cols_array_2d(),
            spin: spin.to_cols_array_2d(),
            max_center_stretch,
            instance_count,
            _padding: [0; 2],
        }
    }

    /// `Projection * View * Model` for one placement.
    pub fn model_view_projection(&self, placement: Mat4) -> Mat4 {
        Mat4::from_cols_array_2d(&self.view_projection)
            * Mat4::from_cols_array_2d(&self.spin)
            * placement
    }
}

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x4];

const INSTANCE_ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
    2 => Float32x4,
    3 => Float32x4,
    4 => Float32x4,
    5 => Float32x4,
    6 => Uint32,
];

/// Wave rendering pipeline plus its static buffers.
pub struct WavePipeline {
    pub pipeline: RenderPipeline,
    pub bind_group_layout: BindGroupLayout,
    pub uniform_buffer: Buffer,
    pub vertex_buffer: Buffer,
    pub instance_buffer: Buffer,
    pub vertex_count: u32,
    pub instance_count: u32,
}

impl WavePipeline {
    /// Create the pipeline and upload the mesh and placements once.
    pub fn new(
        device: &Device,
        queue: &wgpu::Queue,
        format: TextureFormat,
        sample_count: u32,
        vertices: &[Vertex],
        instances: &[InstanceTransform],
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("wave_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/wave.wgsl").into()),
        });

        let bind_group_layout = create_wave_layout(device);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("wave_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("wave_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vertex>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &VERTEX_ATTRIBUTES,
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<InstanceTransform>() as u64,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &INSTANCE_ATTRIBUTES,
                    },
                ],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview_mask: None,
            cache: None,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("wave_uniforms"),
            size: std::mem::size_of::<WaveUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("wave_vertices"),
            size: std::mem::size_of_val(vertices) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&vertex_buffer, 0, bytemuck::cast_slice(vertices));

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("wave_instances"),
            size: std::mem::size_of_val(instances) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&instance_buffer, 0, bytemuck::cast_slice(instances));

        Self {
            pipeline,
            bind_group_layout,
            uniform_buffer,
            vertex_buffer,
            instance_buffer,
            vertex_count: vertices.len() as u32,
            instance_count: instances.len() as u32,
        }
    }

    /// Bind the uniforms and an animation state buffer.
    pub fn create_bind_group(&self, device: &Device, state: &Buffer) -> BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("wave_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: state.as_entire_binding(),
                },
            ],
        })
    }
}
