//! Audio side of the pipeline.
//!
//! This module provides:
//! - The host-facing PCM buffer model and sample format tags
//! - The ingest adapter that stages raw PCM bytes for the compute passes
//! - Push rate limiting that decouples tap cadence from visual cadence
//! - File decoding via Symphonia and a paced background tap
//! - Synthetic signal generators

pub mod buffer;
pub mod format;
pub mod ingest;
pub mod loader;
pub mod player;
pub mod rate;
pub mod staging;
pub mod synth;

pub use buffer::{AudioFormat, ChannelData, PcmBuffer};
pub use format::{CommonFormat, SampleFormat};
pub use ingest::{source_view, stage_buffer, IngestError, IngestStats, PcmIngest, PushOutcome};
pub use loader::{load_audio, AudioData, AudioError};
pub use player::{FileTap, Pacing};
pub use rate::PushRateLimiter;
pub use staging::{lock_staging, SharedStaging, StagingRegion, StagingSnapshot};
