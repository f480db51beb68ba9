//! Per-instance peak animation.
//!
//! Each display tick ages the animation state (decay) and, when the audio
//! tap staged a fresh push, derives new target peaks from it (update). Both
//! passes exist as a CPU reference and as wgpu compute kernels behind the
//! [`PeakAnimator`] trait.

pub mod cpu;

pub use cpu::CpuAnimator;

use std::sync::Arc;

use serde::Serialize;
use wgpu::{Device, Queue};

use crate::audio::StagingSnapshot;
use crate::gpu::compute::{GpuAnimator, GpuAnimatorError};

/// Values below this are flushed to zero while decaying.
pub const DECAY_EPSILON: f32 = 1e-4;

/// Errors raised by animator backends.
#[derive(Debug, thiserror::Error)]
pub enum AnimatorError {
    #[error("tick targets {got} instances but the animator holds {expected}")]
    InstanceCountMismatch { expected: u32, got: u32 },
    #[error("staged push of {bytes} bytes exceeds the {capacity}-byte staging buffer")]
    StagingOverflow { bytes: usize, capacity: usize },
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuAnimatorError),
}

/// Inputs shared by the decay and update passes of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickParams {
    /// Clock reading for this tick, in seconds.
    pub now: f32,
    /// Clock reading when the most recent push was staged.
    pub window_start: f32,
    /// Length of one animation window in seconds.
    pub window_duration: f32,
    pub decay_factor: f32,
    pub instance_count: u32,
    /// A push was staged since the previous tick.
    pub fresh_push: bool,
}

impl TickParams {
    /// Position of `now` within the current window, clamped to [0, 1].
    pub fn window_progress(&self) -> f32 {
        if self.window_duration <= 0.0 {
            return 1.0;
        }
        ((self.now - self.window_start) / self.window_duration).clamp(0.0, 1.0)
    }
}

/// Hermite ease used for the displayed amplitude.
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Multiply by `factor`, flushing tiny and negative results to zero.
pub fn decay_value(value: f32, factor: f32) -> f32 {
    let decayed = value * factor;
    if decayed < DECAY_EPSILON {
        0.0
    } else {
        decayed
    }
}

/// Half-open sample range feeding instance `index` out of `instance_count`.
///
/// Every instance gets at least one sample when any are staged.
pub fn bucket_range(index: u32, instance_count: u32, sample_count: usize) -> (usize, usize) {
    let n = instance_count.max(1) as u64;
    let s = sample_count as u64;
    let start = index as u64 * s / n;
    let end = ((index as u64 + 1) * s / n).max(start + 1);
    (start as usize, end as usize)
}

/// CPU mirror of the animation state buffer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimationState {
    pub progress: Vec<f32>,
    pub target_peak: Vec<f32>,
    pub old_peak: Vec<f32>,
    pub initialized: Vec<bool>,
}

impl AnimationState {
    pub fn new(instance_count: u32) -> Self {
        let n = instance_count as usize;
        Self {
            progress: vec![0.0; n],
            target_peak: vec![0.0; n],
            old_peak: vec![0.0; n],
            initialized: vec![false; n],
        }
    }

    pub fn len(&self) -> usize {
        self.progress.len()
    }

    pub fn is_empty(&self) -> bool {
        self.progress.is_empty()
    }

    /// Amplitude the render pass shows for instance `i`.
    pub fn displayed_amplitude(&self, i: usize) -> f32 {
        self.old_peak[i].max(self.target_peak[i] * smoothstep(self.progress[i]))
    }

    /// Pack into the GPU layout: four `N`-word arrays back to back.
    pub fn to_words(&self) -> Vec<u32> {
        let mut words = Vec::with_capacity(self.len() * 4);
        words.extend(self.progress.iter().map(|v| v.to_bits()));
        words.extend(self.target_peak.iter().map(|v| v.to_bits()));
        words.extend(self.old_peak.iter().map(|v| v.to_bits()));
        words.extend(self.initialized.iter().map(|&flag| flag as u32));
        words
    }

    /// Unpack the GPU layout. Returns `None` when `words` is not `4 * N` long.
    pub fn from_words(words: &[u32], instance_count: u32) -> Option<Self> {
        let n = instance_count as usize;
        if words.len() != n * 4 {
            return None;
        }
        let floats = |k: usize| words[k * n..(k + 1) * n].iter().map(|&w| f32::from_bits(w)).collect();
        Some(Self {
            progress: floats(0),
            target_peak: floats(1),
            old_peak: floats(2),
            initialized: words[3 * n..].iter().map(|&w| w != 0).collect(),
        })
    }

    pub fn summary(&self) -> StateSummary {
        let n = self.len().max(1) as f32;
        StateSummary {
            instances: self.len(),
            initialized: self.initialized.iter().filter(|&&flag| flag).count(),
            max_target_peak: self.target_peak.iter().cloned().fold(0.0, f32::max),
            max_old_peak: self.old_peak.iter().cloned().fold(0.0, f32::max),
            mean_progress: self.progress.iter().sum::<f32>() / n,
        }
    }

    /// Dump the first `limit` instances and a summary at debug level.
    pub fn log_dump(&self, limit: usize) {
        log::debug!("animation state: {:?}", self.summary());
        for i in 0..self.len().min(limit) {
            log::debug!(
                "  [{}] progress={:.3} target={:.4} old={:.4} initialized={}",
                i,
                self.progress[i],
                self.target_peak[i],
                self.old_peak[i],
                self.initialized[i]
            );
        }
    }
}

/// Aggregate view of an [`AnimationState`], serializable for state dumps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StateSummary {
    pub instances: usize,
    pub initialized: usize,
    pub max_target_peak: f32,
    pub max_old_peak: f32,
    pub mean_progress: f32,
}

/// Backend running the decay and update passes.
pub trait PeakAnimator {
    fn instance_count(&self) -> u32;

    /// Age every instance. Runs once per tick, before [`update`](Self::update).
    fn decay(&mut self, params: &TickParams) -> Result<(), AnimatorError>;

    /// Derive new targets from a freshly staged push.
    fn update(
        &mut self,
        params: &TickParams,
        snapshot: &StagingSnapshot,
    ) -> Result<(), AnimatorError>;

    /// One tick: decay, then update when a fresh snapshot is present.
    fn step(
        &mut self,
        params: &TickParams,
        snapshot: Option<&StagingSnapshot>,
    ) -> Result<(), AnimatorError> {
        self.decay(params)?;
        if let Some(snapshot) = snapshot {
            self.update(params, snapshot)?;
        }
        Ok(())
    }

    fn read_state(&self) -> Result<AnimationState, AnimatorError>;

    /// Zero all state.
    fn reset(&mut self) -> Result<(), AnimatorError>;

    fn check_instance_count(&self, params: &TickParams) -> Result<(), AnimatorError> {
        if params.instance_count != self.instance_count() {
            return Err(AnimatorError::InstanceCountMismatch {
                expected: self.instance_count(),
                got: params.instance_count,
            });
        }
        Ok(())
    }
}

/// Either animator, chosen at runtime.
pub enum DynamicAnimator {
    Cpu(CpuAnimator),
    Gpu(Box<GpuAnimator>),
}

impl DynamicAnimator {
    pub fn cpu(instance_count: u32) -> Self {
        DynamicAnimator::Cpu(CpuAnimator::new(instance_count))
    }

    pub fn gpu(
        device: Arc<Device>,
        queue: Arc<Queue>,
        instance_count: u32,
    ) -> Result<Self, AnimatorError> {
        Ok(DynamicAnimator::Gpu(Box::new(GpuAnimator::new(
            device,
            queue,
            instance_count,
        )?)))
    }

    /// Use the GPU when a device is available, the CPU reference otherwise.
    pub fn gpu_with_fallback(
        device: Option<Arc<Device>>,
        queue: Option<Arc<Queue>>,
        instance_count: u32,
    ) -> Self {
        match (device, queue) {
            (Some(device), Some(queue)) => {
                match GpuAnimator::new(device, queue, instance_count) {
                    Ok(gpu) => {
                        log::info!("peak animation on GPU ({} instances)", instance_count);
                        DynamicAnimator::Gpu(Box::new(gpu))
                    }
                    Err(e) => {
                        log::warn!("GPU animator unavailable ({}), using CPU", e);
                        DynamicAnimator::cpu(instance_count)
                    }
                }
            }
            _ => {
                log::info!("peak animation on CPU ({} instances)", instance_count);
                DynamicAnimator::cpu(instance_count)
            }
        }
    }

    pub fn is_gpu(&self) -> bool {
        matches!(self, DynamicAnimator::Gpu(_))
    }

    /// The GPU-resident state buffer, when the state lives on the GPU.
    pub fn state_buffer(&self) -> Option<&wgpu::Buffer> {
        match self {
            DynamicAnimator::Cpu(_) => None,
            DynamicAnimator::Gpu(gpu) => Some(gpu.state_buffer()),
        }
    }

    /// Borrow the CPU state directly, when the state lives on the CPU.
    pub fn cpu_state(&self) -> Option<&AnimationState> {
        match self {
            DynamicAnimator::Cpu(cpu) => Some(cpu.state()),
            DynamicAnimator::Gpu(_) => None,
        }
    }
}

impl PeakAnimator for DynamicAnimator {
    fn instance_count(&self) -> u32 {
        match self {
            DynamicAnimator::Cpu(a) => a.instance_count(),
            DynamicAnimator::Gpu(a) => a.instance_count(),
        }
    }

    fn decay(&mut self, params: &TickParams) -> Result<(), AnimatorError> {
        match self {
            DynamicAnimator::Cpu(a) => a.decay(params),
            DynamicAnimator::Gpu(a) => a.decay(params),
        }
    }

    fn update(
        &mut self,
        params: &TickParams,
        snapshot: &StagingSnapshot,
    ) -> Result<(), AnimatorError> {
        match self {
            DynamicAnimator::Cpu(a) => a.update(params, snapshot),
            DynamicAnimator::Gpu(a) => a.update(params, snapshot),
        }
    }

    fn step(
        &mut self,
        params: &TickParams,
        snapshot: Option<&StagingSnapshot>,
    ) -> Result<(), AnimatorError> {
        match self {
            DynamicAnimator::Cpu(a) => a.step(params, snapshot),
            DynamicAnimator::Gpu(a) => a.step(params, snapshot),
        }
    }

    fn read_state(&self) -> Result<AnimationState, AnimatorError> {
        match self {
            DynamicAnimator::Cpu(a) => a.read_state(),
            DynamicAnimator::Gpu(a) => a.read_state(),
        }
    }

    fn reset(&mut self) -> Result<(), AnimatorError> {
        match self {
            DynamicAnimator::Cpu(a) => a.reset(),
            DynamicAnimator::Gpu(a) => a.reset(),
        }
    }
}
