//! GPU compute kernels for peak animation.
//!
//! The decay and update passes run as wgpu compute shaders over the
//! animation state buffer that the render pass reads.

mod buffers;
mod params;
mod pipelines;

pub mod animator;

pub use animator::{GpuAnimator, GpuAnimatorError};
pub use params::{DecayParams, UpdateParams};
