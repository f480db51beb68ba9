//! PCM Wave
//!
//! Real-time audio-driven 3D waveform of capsule instances, animated and
//! drawn with wgpu.
//!
//! # Features
//!
//! - PCM ingest from an audio tap into a bounded staging region (float32, int16, int32)
//! - Rate-limited pushes decoupled from the display tick
//! - Per-instance peak animation as wgpu compute kernels, with a CPU reference
//! - Instanced capsule rendering with MSAA and depth testing
//! - First-person Euler camera with press-and-hold controls
//! - Audio file taps (WAV, MP3, FLAC, AAC) via Symphonia

pub mod animation;
pub mod audio;
pub mod camera;
pub mod config;
pub mod controls;
pub mod geometry;
pub mod gpu;
pub mod timing;
pub mod visualizer;

// Re-export commonly used types
pub use animation::{AnimationState, CpuAnimator, DynamicAnimator, PeakAnimator, TickParams};
pub use audio::{
    load_audio, AudioData, CommonFormat, FileTap, IngestError, PcmBuffer, PcmIngest, SampleFormat,
};
pub use camera::{Camera, CameraMovement};
pub use config::{ConfigError, WaveConfig};
pub use controls::{Control, ControlPad};
pub use gpu::{GpuAnimator, GpuContext, WaveRenderer};
pub use timing::{Clock, ManualClock, SystemClock};
pub use visualizer::{TickReport, VisualizerError, WaveVisualizer};
