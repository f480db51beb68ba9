//! GPU peak animator running the decay and update kernels.

use std::sync::Arc;
use wgpu::{BindGroup, Device, Queue};

use super::buffers::{padded_upload, PeakBuffers};
use super::params::{DecayParams, UpdateParams};
use super::pipelines::PeakPipelines;
use crate::animation::{AnimationState, AnimatorError, PeakAnimator, TickParams};
use crate::audio::StagingSnapshot;
use crate::config::{MAX_INSTANCES, STAGING_CAPACITY};

/// Errors that can occur while driving the peak kernels.
#[derive(Debug, thiserror::Error)]
pub enum GpuAnimatorError {
    #[error("instance count must be in 1..={max}, got {got}")]
    InvalidInstanceCount { max: u32, got: u32 },
    #[error("device poll failed: {0}")]
    Poll(String),
    #[error("GPU buffer mapping failed: {0}")]
    BufferMapFailed(String),
    #[error("peak pipeline setup rejected by the device: {0}")]
    Pipeline(String),
}

const WORKGROUP_SIZE: u32 = 256;

/// Animation state resident in a GPU storage buffer.
pub struct GpuAnimator {
    device: Arc<Device>,
    queue: Arc<Queue>,
    instance_count: u32,
    pipelines: PeakPipelines,
    buffers: PeakBuffers,
    bind_group: BindGroup,
}

impl GpuAnimator {
    pub fn new(
        device: Arc<Device>,
        queue: Arc<Queue>,
        instance_count: u32,
    ) -> Result<Self, GpuAnimatorError> {
        if instance_count == 0 || instance_count > MAX_INSTANCES {
            return Err(GpuAnimatorError::InvalidInstanceCount {
                max: MAX_INSTANCES,
                got: instance_count,
            });
        }

        // Setup errors surface here instead of the device's panicking handler.
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("peaks_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/peaks.wgsl").into()),
        });

        let pipelines = PeakPipelines::new(&device, &shader);
        let buffers = PeakBuffers::new(&device, instance_count, STAGING_CAPACITY);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("peak_bind_group"),
            layout: &pipelines.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffers.state.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.pcm.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers.decay_params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: buffers.update_params.as_entire_binding(),
                },
            ],
        });
        if let Some(e) = pollster::block_on(scope.pop()) {
            return Err(GpuAnimatorError::Pipeline(e.to_string()));
        }

        log::debug!(
            "GPU animator ready: {} instances, {} workgroups per pass",
            instance_count,
            instance_count.div_ceil(WORKGROUP_SIZE)
        );

        Ok(Self {
            device,
            queue,
            instance_count,
            pipelines,
            buffers,
            bind_group,
        })
    }

    /// The `4 * N`-word state buffer the render pass binds.
    pub fn state_buffer(&self) -> &wgpu::Buffer {
        &self.buffers.state
    }

    /// Encode the passes for one tick and wait for them to finish.
    ///
    /// Decay and update are separate compute passes, so every decay write
    /// is visible to the update pass.
    fn run(
        &self,
        params: &TickParams,
        snapshot: Option<&StagingSnapshot>,
        decay: bool,
    ) -> Result<(), AnimatorError> {
        self.check_instance_count(params)?;

        if decay {
            self.queue.write_buffer(
                &self.buffers.decay_params,
                0,
                bytemuck::bytes_of(&DecayParams::new(params)),
            );
        }
        if let Some(snapshot) = snapshot {
            self.upload_snapshot(params, snapshot)?;
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("peak_encoder"),
            });
        if decay {
            self.encode_pass(&mut encoder, &self.pipelines.decay, "decay_peaks_pass");
        }
        if snapshot.is_some() {
            self.encode_pass(&mut encoder, &self.pipelines.update, "update_peaks_pass");
        }
        self.queue.submit(Some(encoder.finish()));
        self.wait()
    }

    fn upload_snapshot(
        &self,
        params: &TickParams,
        snapshot: &StagingSnapshot,
    ) -> Result<(), AnimatorError> {
        if snapshot.bytes.len() > STAGING_CAPACITY {
            return Err(AnimatorError::StagingOverflow {
                bytes: snapshot.bytes.len(),
                capacity: STAGING_CAPACITY,
            });
        }
        if !snapshot.bytes.is_empty() {
            self.queue
                .write_buffer(&self.buffers.pcm, 0, &padded_upload(&snapshot.bytes));
        }
        let update = UpdateParams::new(params, snapshot.format, snapshot.sample_count);
        self.queue
            .write_buffer(&self.buffers.update_params, 0, bytemuck::bytes_of(&update));
        Ok(())
    }

    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::ComputePipeline,
        label: &str,
    ) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(label),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.dispatch_workgroups(self.instance_count.div_ceil(WORKGROUP_SIZE), 1, 1);
    }

    fn wait(&self) -> Result<(), AnimatorError> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| GpuAnimatorError::Poll(e.to_string()))?;
        Ok(())
    }

    fn read_words(&self) -> Result<Vec<u32>, GpuAnimatorError> {
        let size = PeakBuffers::state_size(self.instance_count);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("peak_readback_encoder"),
            });
        encoder.copy_buffer_to_buffer(&self.buffers.state, 0, &self.buffers.readback, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let slice = self.buffers.readback.slice(..size);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| GpuAnimatorError::Poll(e.to_string()))?;

        rx.recv()
            .map_err(|e| GpuAnimatorError::BufferMapFailed(e.to_string()))?
            .map_err(|e| GpuAnimatorError::BufferMapFailed(format!("{:?}", e)))?;

        let data = slice.get_mapped_range();
        let words: Vec<u32> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        self.buffers.readback.unmap();

        Ok(words)
    }
}

impl PeakAnimator for GpuAnimator {
    fn instance_count(&self) -> u32 {
        self.instance_count
    }

    fn decay(&mut self, params: &TickParams) -> Result<(), AnimatorError> {
        self.run(params, None, true)
    }

    fn update(
        &mut self,
        params: &TickParams,
        snapshot: &StagingSnapshot,
    ) -> Result<(), AnimatorError> {
        self.run(params, Some(snapshot), false)
    }

    fn step(
        &mut self,
        params: &TickParams,
        snapshot: Option<&StagingSnapshot>,
    ) -> Result<(), AnimatorError> {
        self.run(params, snapshot, true)
    }

    fn read_state(&self) -> Result<AnimationState, AnimatorError> {
        let words = self.read_words()?;
        AnimationState::from_words(&words, self.instance_count).ok_or_else(|| {
            GpuAnimatorError::BufferMapFailed(format!(
                "expected {} state words, got {}",
                self.instance_count as usize * 4,
                words.len()
            ))
            .into()
        })
    }

    fn reset(&mut self) -> Result<(), AnimatorError> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("peak_reset_encoder"),
            });
        encoder.clear_buffer(&self.buffers.state, 0, None);
        self.queue.submit(Some(encoder.finish()));
        self.wait()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::CpuAnimator;
    use crate::audio::SampleFormat;

    fn create_test_context() -> Option<(Arc<Device>, Arc<Queue>)> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
                .ok()?;
        let (device, queue) =
            pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default())).ok()?;
        Some((Arc::new(device), Arc::new(queue)))
    }

    /// A device without compute or storage buffers.
    fn create_limited_context() -> Option<(Arc<Device>, Arc<Queue>)> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
                .ok()?;
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
            ..Default::default()
        }))
        .ok()?;
        Some((Arc::new(device), Arc::new(queue)))
    }

    fn tick(now: f32, fresh_push: bool, instance_count: u32) -> TickParams {
        TickParams {
            now,
            window_start: 0.0,
            window_duration: 0.5,
            decay_factor: 0.9,
            instance_count,
            fresh_push,
        }
    }

    #[test]
    fn test_invalid_instance_count() {
        if let Some((device, queue)) = create_test_context() {
            let result = GpuAnimator::new(device, queue, 0);
            assert!(matches!(
                result,
                Err(GpuAnimatorError::InvalidInstanceCount { got: 0, .. })
            ));
        }
    }

    #[test]
    fn test_setup_on_limited_device_is_an_error() {
        let Some((device, queue)) = create_limited_context() else {
            return;
        };
        let result = GpuAnimator::new(device, queue, 64);
        assert!(matches!(result, Err(GpuAnimatorError::Pipeline(_))));
    }

    #[test]
    fn test_state_starts_zeroed() {
        if let Some((device, queue)) = create_test_context() {
            let animator = GpuAnimator::new(device, queue, 300).unwrap();
            assert_eq!(animator.read_state().unwrap(), AnimationState::new(300));
        }
    }

    #[test]
    fn test_matches_cpu_reference() {
        let Some((device, queue)) = create_test_context() else {
            return;
        };
        let n = 300;
        let mut gpu = GpuAnimator::new(device, queue, n).unwrap();
        let mut cpu = CpuAnimator::new(n);

        let samples: Vec<i16> = (0..1024).map(|i| ((i * 37) % 2000 - 1000) as i16 * 16).collect();
        let snapshot = StagingSnapshot {
            bytes: bytemuck::cast_slice(&samples).to_vec(),
            format: SampleFormat::Int16,
            sample_count: samples.len(),
            window_start: 0.0,
            generation: 1,
        };

        for (now, fresh) in [(0.0, true), (0.2, false), (0.6, false), (0.6, true), (0.9, false)] {
            let params = tick(now, fresh, n);
            let push = fresh.then_some(&snapshot);
            gpu.step(&params, push).unwrap();
            cpu.step(&params, push).unwrap();
        }

        let gpu_state = gpu.read_state().unwrap();
        let cpu_state = cpu.read_state().unwrap();
        assert_eq!(gpu_state.initialized, cpu_state.initialized);
        for i in 0..n as usize {
            assert!((gpu_state.target_peak[i] - cpu_state.target_peak[i]).abs() < 1e-5);
            assert!((gpu_state.old_peak[i] - cpu_state.old_peak[i]).abs() < 1e-5);
            assert!((gpu_state.progress[i] - cpu_state.progress[i]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_reset_clears_state() {
        let Some((device, queue)) = create_test_context() else {
            return;
        };
        let mut gpu = GpuAnimator::new(device, queue, 8).unwrap();
        let samples = [0.5f32; 8];
        let snapshot = StagingSnapshot {
            bytes: bytemuck::cast_slice(&samples).to_vec(),
            format: SampleFormat::Float32,
            sample_count: 8,
            window_start: 0.0,
            generation: 1,
        };
        gpu.step(&tick(0.0, true, 8), Some(&snapshot)).unwrap();
        assert!(gpu.read_state().unwrap().initialized.iter().all(|&f| f));
        gpu.reset().unwrap();
        assert_eq!(gpu.read_state().unwrap(), AnimationState::new(8));
    }
}
