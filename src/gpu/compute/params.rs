//! Uniform parameter structs for the peak kernels.
//!
//! These structs must match the WGSL shader definitions exactly,
//! including alignment requirements.

use crate::animation::TickParams;
use crate::audio::SampleFormat;

/// Decay pass parameters (32 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DecayParams {
    pub now: f32,
    pub window_start: f32,
    pub window_duration: f32,
    pub decay_factor: f32,
    pub instance_count: u32,
    pub fresh_push: u32,
    pub _padding: [u32; 2],
}

impl DecayParams {
    pub fn new(tick: &TickParams) -> Self {
        Self {
            now: tick.now,
            window_start: tick.window_start,
            window_duration: tick.window_duration,
            decay_factor: tick.decay_factor,
            instance_count: tick.instance_count,
            fresh_push: tick.fresh_push as u32,
            _padding: [0; 2],
        }
    }
}

/// Update pass parameters (32 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UpdateParams {
    pub now: f32,
    pub window_start: f32,
    pub window_duration: f32,
    pub instance_count: u32,
    pub sample_count: u32,
    /// Format tag, see [`SampleFormat::tag`].
    pub format: u32,
    pub _padding: [u32; 2],
}

impl UpdateParams {
    pub fn new(tick: &TickParams, format: SampleFormat, sample_count: usize) -> Self {
        Self {
            now: tick.now,
            window_start: tick.window_start,
            window_duration: tick.window_duration,
            instance_count: tick.instance_count,
            sample_count: sample_count as u32,
            format: format.tag(),
            _padding: [0; 2],
        }
    }
}
