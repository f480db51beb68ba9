//! GPU rendering and compute using wgpu.
//!
//! Provides the peak animation compute kernels and headless instanced
//! rendering of the capsule wave.

pub mod compute;
pub mod context;
pub mod layouts;
pub mod pipeline;
pub mod renderer;
pub mod textures;

pub use compute::{GpuAnimator, GpuAnimatorError};
pub use context::{GpuContext, GpuError};
pub use pipeline::{WavePipeline, WaveUniforms};
pub use renderer::{RenderConfig, RenderError, WaveRenderer};
