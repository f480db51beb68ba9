//! GPU buffer management for the peak kernels.

use wgpu::{Buffer, BufferUsages, Device};

use super::params::{DecayParams, UpdateParams};

/// Animation state plus the staged PCM it is derived from.
pub struct PeakBuffers {
    /// `4 * N` words, see `shaders/peaks.wgsl` for the layout.
    pub state: Buffer,
    pub pcm: Buffer,
    pub readback: Buffer,
    pub decay_params: Buffer,
    pub update_params: Buffer,
}

impl PeakBuffers {
    /// Create all buffers; the state starts zeroed.
    pub fn new(device: &Device, instance_count: u32, pcm_capacity: usize) -> Self {
        let state_size = Self::state_size(instance_count);

        let state = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("peak_state"),
            size: state_size,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_SRC | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let pcm = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("peak_pcm_staging"),
            size: (pcm_capacity as u64).next_multiple_of(4),
            usage: BufferUsages::STORAGE | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("peak_state_readback"),
            size: state_size,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            state,
            pcm,
            readback,
            decay_params: create_uniform_buffer(
                device,
                "decay_params",
                std::mem::size_of::<DecayParams>() as u64,
            ),
            update_params: create_uniform_buffer(
                device,
                "update_params",
                std::mem::size_of::<UpdateParams>() as u64,
            ),
        }
    }

    pub fn state_size(instance_count: u32) -> u64 {
        instance_count as u64 * 4 * std::mem::size_of::<u32>() as u64
    }
}

fn create_uniform_buffer(device: &Device, label: &str, size: u64) -> Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Copy of `bytes` padded with zeros to a 4-byte multiple, as
/// `Queue::write_buffer` requires.
pub fn padded_upload(bytes: &[u8]) -> Vec<u8> {
    let mut padded = bytes.to_vec();
    padded.resize(bytes.len().next_multiple_of(4), 0);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_upload() {
        assert_eq!(padded_upload(&[1, 2, 3, 4]), vec![1, 2, 3, 4]);
        assert_eq!(padded_upload(&[1, 2]), vec![1, 2, 0, 0]);
        assert!(padded_upload(&[]).is_empty());
    }

    #[test]
    fn test_state_size() {
        assert_eq!(PeakBuffers::state_size(4096), 65536);
    }
}
