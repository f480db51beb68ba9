//! Compute pipeline creation for the peak kernels.

use wgpu::{BindGroupLayout, ComputePipeline, Device, ShaderModule, ShaderStages};

use crate::gpu::layouts::BindGroupLayoutBuilder;

/// The decay and update pipelines, sharing one bind group layout.
pub struct PeakPipelines {
    pub layout: BindGroupLayout,
    pub decay: ComputePipeline,
    pub update: ComputePipeline,
}

impl PeakPipelines {
    pub fn new(device: &Device, shader: &ShaderModule) -> Self {
        let layout = create_peak_layout(device);
        Self {
            decay: create_pipeline(device, shader, &layout, "decay_peaks"),
            update: create_pipeline(device, shader, &layout, "update_peaks"),
            layout,
        }
    }
}

/// State (read-write), staged PCM (read-only), decay and update params.
pub fn create_peak_layout(device: &Device) -> BindGroupLayout {
    BindGroupLayoutBuilder::new("peak_bind_group_layout")
        .storage(0, ShaderStages::COMPUTE, false)
        .storage(1, ShaderStages::COMPUTE, true)
        .uniform(2, ShaderStages::COMPUTE)
        .uniform(3, ShaderStages::COMPUTE)
        .build(device)
}

fn create_pipeline(
    device: &Device,
    shader: &ShaderModule,
    layout: &BindGroupLayout,
    entry_point: &str,
) -> ComputePipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{}_pipeline_layout", entry_point)),
        bind_group_layouts: &[layout],
        immediate_size: 0,
    });

    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(&format!("{}_pipeline", entry_point)),
        layout: Some(&pipeline_layout),
        module: shader,
        entry_point: Some(entry_point),
        compilation_options: Default::default(),
        cache: None,
    })
}
