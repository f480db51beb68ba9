//! Texture management for GPU rendering.

use wgpu::{Device, Texture, TextureFormat, TextureUsages, TextureView};

/// A render target that owns both texture and view.
/// The texture must outlive its view, so we keep them together.
pub struct RenderTarget {
    texture: Texture,
    view: TextureView,
}

impl RenderTarget {
    pub fn new(
        device: &Device,
        label: &str,
        (width, height): (u32, u32),
        format: TextureFormat,
        sample_count: u32,
        usage: TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Single-sampled target that can be copied to the CPU.
    pub fn for_output(device: &Device, size: (u32, u32), format: TextureFormat) -> Self {
        Self::new(
            device,
            "wave_output",
            size,
            format,
            1,
            TextureUsages::RENDER_ATTACHMENT | TextureUsages::COPY_SRC,
        )
    }

    /// Multisampled color target, resolved into an output target.
    pub fn for_msaa(
        device: &Device,
        size: (u32, u32),
        format: TextureFormat,
        sample_count: u32,
    ) -> Self {
        Self::new(
            device,
            "wave_msaa",
            size,
            format,
            sample_count,
            TextureUsages::RENDER_ATTACHMENT,
        )
    }

    pub fn for_depth(
        device: &Device,
        size: (u32, u32),
        format: TextureFormat,
        sample_count: u32,
    ) -> Self {
        Self::new(
            device,
            "wave_depth",
            size,
            format,
            sample_count,
            TextureUsages::RENDER_ATTACHMENT,
        )
    }

    pub fn view(&self) -> &TextureView {
        &self.view
    }

    /// Get the underlying texture (for copy operations).
    pub fn texture(&self) -> &Texture {
        &self.texture
    }
}

/// Failure while mapping a readback buffer.
#[derive(Debug, thiserror::Error)]
pub enum ReadbackError {
    #[error("device poll failed: {0}")]
    Poll(String),
    #[error("GPU buffer mapping failed: {0}")]
    BufferMapFailed(String),
}

/// Readback buffer for copying GPU texture data to CPU.
pub struct ReadbackBuffer {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_row_bytes: u32,
    unpadded_row_bytes: u32,
}

impl ReadbackBuffer {
    /// Create a new readback buffer sized for an RGBA8 target.
    pub fn new(device: &Device, width: u32, height: u32) -> Self {
        let bytes_per_pixel = 4u32;
        let unpadded_row_bytes = width * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row_bytes = unpadded_row_bytes.div_ceil(align) * align;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback_buffer"),
            size: (padded_row_bytes * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            width,
            height,
            padded_row_bytes,
            unpadded_row_bytes,
        }
    }

    pub fn padded_row_bytes(&self) -> u32 {
        self.padded_row_bytes
    }

    /// Encode a copy of `texture` into this buffer.
    pub fn encode_copy(&self, encoder: &mut wgpu::CommandEncoder, texture: &Texture) {
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_row_bytes),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Read pixels from the mapped buffer, removing row padding.
    pub fn read_pixels(&self, device: &wgpu::Device) -> Result<Vec<u8>, ReadbackError> {
        let buffer_slice = self.buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| ReadbackError::Poll(e.to_string()))?;
        receiver
            .recv()
            .map_err(|e| ReadbackError::BufferMapFailed(e.to_string()))?
            .map_err(|e| ReadbackError::BufferMapFailed(format!("{:?}", e)))?;

        let data = buffer_slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((self.width * self.height * 4) as usize);
        for row in 0..self.height {
            let start = (row * self.padded_row_bytes) as usize;
            let end = start + self.unpadded_row_bytes as usize;
            pixels.extend_from_slice(&data[start..end]);
        }
        drop(data);
        self.buffer.unmap();
        Ok(pixels)
    }
}
