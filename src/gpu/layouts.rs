//! Bind group layout builders for GPU pipelines.
//!
//! Provides reusable helpers for creating wgpu bind group layouts.

use wgpu::{BindGroupLayout, BindGroupLayoutEntry, Device, ShaderStages};

/// Builder for creating bind group layouts with common patterns.
pub struct BindGroupLayoutBuilder {
    label: Option<&'static str>,
    entries: Vec<BindGroupLayoutEntry>,
}

impl BindGroupLayoutBuilder {
    pub fn new(label: &'static str) -> Self {
        Self {
            label: Some(label),
            entries: Vec::new(),
        }
    }

    /// Add a uniform buffer entry.
    pub fn uniform(self, binding: u32, visibility: ShaderStages) -> Self {
        self.buffer(binding, visibility, wgpu::BufferBindingType::Uniform)
    }

    /// Add a storage buffer entry.
    pub fn storage(self, binding: u32, visibility: ShaderStages, read_only: bool) -> Self {
        self.buffer(
            binding,
            visibility,
            wgpu::BufferBindingType::Storage { read_only },
        )
    }

    fn buffer(
        mut self,
        binding: u32,
        visibility: ShaderStages,
        ty: wgpu::BufferBindingType,
    ) -> Self {
        self.entries.push(BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        });
        self
    }

    pub fn build(self, device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: self.label,
            entries: &self.entries,
        })
    }
}

/// Wave render layout: per-frame uniforms and the animation state, both
/// read by the vertex stage.
pub fn create_wave_layout(device: &Device) -> BindGroupLayout {
    BindGroupLayoutBuilder::new("wave_bind_group_layout")
        .uniform(0, ShaderStages::VERTEX)
        .storage(1, ShaderStages::VERTEX, true)
        .build(device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::GpuContext;

    #[tokio::test]
    async fn test_bind_group_layout_builder() {
        let ctx = match GpuContext::new().await {
            Ok(ctx) => ctx,
            Err(_) => return, // Skip if no GPU
        };

        let layout = BindGroupLayoutBuilder::new("test_layout")
            .uniform(0, ShaderStages::COMPUTE)
            .storage(1, ShaderStages::COMPUTE, false)
            .storage(2, ShaderStages::COMPUTE, true)
            .build(&ctx.device);

        drop(layout);
    }

    #[tokio::test]
    async fn test_wave_layout_creation() {
        let ctx = match GpuContext::new().await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        let _layout = create_wave_layout(&ctx.device);
    }
}
