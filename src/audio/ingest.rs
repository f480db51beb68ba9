//! PCM ingest: from a tapped audio buffer to the staging region.
//!
//! Runs on the audio callback thread. Every accepted push is one bounded,
//! bounds-checked memcpy of channel 0 into the shared staging region; no
//! format conversion happens here.

use std::sync::Arc;

use super::buffer::{ChannelData, PcmBuffer};
use super::format::{CommonFormat, SampleFormat};
use super::rate::PushRateLimiter;
use super::staging::{lock_staging, SharedStaging};
use crate::config::WaveConfig;
use crate::timing::Clock;

/// Errors on the ingest path. All of them drop the push.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IngestError {
    #[error("Unsupported PCM format: {0:?}")]
    UnsupportedFormat(CommonFormat),
    #[error("Buffer declares {0:?} but carries no matching channel data")]
    MissingChannelData(CommonFormat),
    #[error("Push of {requested} bytes exceeds staging capacity of {capacity} bytes")]
    BufferOverflow { requested: usize, capacity: usize },
    #[error("Push of {requested} bytes but the source channel only holds {available}")]
    SourceTooShort { requested: usize, available: usize },
    #[error("Empty push")]
    EmptyPush,
}

/// Raw view of the channel a push copies from.
#[derive(Debug, Clone, Copy)]
pub struct SourceView<'a> {
    pub bytes: &'a [u8],
    pub stride: usize,
    pub format: SampleFormat,
}

/// Resolve the source bytes, element stride and format of `buffer`.
///
/// Only channel 0 is used; the view is limited to the buffer's valid frames.
pub fn source_view(buffer: &PcmBuffer) -> Result<SourceView<'_>, IngestError> {
    let declared = buffer.format.common_format;
    let format =
        SampleFormat::from_common(declared).ok_or(IngestError::UnsupportedFormat(declared))?;

    let bytes: &[u8] = match (format, &buffer.channels) {
        (SampleFormat::Float32, ChannelData::Float32(channels)) => channels
            .first()
            .map(|c| bytemuck::cast_slice(&c[..buffer.frame_length.min(c.len())])),
        (SampleFormat::Int16, ChannelData::Int16(channels)) => channels
            .first()
            .map(|c| bytemuck::cast_slice(&c[..buffer.frame_length.min(c.len())])),
        (SampleFormat::Int32, ChannelData::Int32(channels)) => channels
            .first()
            .map(|c| bytemuck::cast_slice(&c[..buffer.frame_length.min(c.len())])),
        _ => None,
    }
    .ok_or(IngestError::MissingChannelData(declared))?;

    Ok(SourceView {
        bytes,
        stride: format.stride(),
        format,
    })
}

/// Copy `requested_count` samples of `buffer` into `staging`.
///
/// Returns the number of bytes copied. On error nothing is written.
pub fn stage_buffer(
    buffer: &PcmBuffer,
    requested_count: usize,
    staging: &SharedStaging,
    now: f32,
) -> Result<usize, IngestError> {
    let view = source_view(buffer)?;
    let capacity = lock_staging(staging).capacity();

    let bytes_to_copy = view
        .stride
        .checked_mul(requested_count)
        .ok_or(IngestError::BufferOverflow {
            requested: usize::MAX,
            capacity,
        })?;
    if bytes_to_copy == 0 {
        return Err(IngestError::EmptyPush);
    }
    if bytes_to_copy > capacity {
        return Err(IngestError::BufferOverflow {
            requested: bytes_to_copy,
            capacity,
        });
    }
    if bytes_to_copy > view.bytes.len() {
        return Err(IngestError::SourceTooShort {
            requested: bytes_to_copy,
            available: view.bytes.len(),
        });
    }

    lock_staging(staging).commit(&view.bytes[..bytes_to_copy], view.format, now)?;
    Ok(bytes_to_copy)
}

/// What happened to one tap call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Not selected by the rate limiter.
    Skipped,
    /// Staged as a new animation window.
    Staged { bytes: usize, generation: u64 },
}

/// Running counters, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub calls: u64,
    pub staged: u64,
    pub dropped: u64,
}

/// Producer half of the pipeline, owned by the audio callback.
pub struct PcmIngest {
    staging: SharedStaging,
    clock: Arc<dyn Clock>,
    limiter: PushRateLimiter,
    samples_per_push: usize,
    stats: IngestStats,
}

impl PcmIngest {
    pub fn new(
        staging: SharedStaging,
        clock: Arc<dyn Clock>,
        limiter: PushRateLimiter,
        samples_per_push: usize,
    ) -> Self {
        Self {
            staging,
            clock,
            limiter,
            samples_per_push,
            stats: IngestStats::default(),
        }
    }

    pub fn from_config(config: &WaveConfig, staging: SharedStaging, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            staging,
            clock,
            PushRateLimiter::new(config.push_frequency, config.callback_rate),
            config.samples_per_push,
        )
    }

    /// Tap callback: rate-limit, then stage.
    pub fn on_pcm(&mut self, buffer: &PcmBuffer) -> Result<PushOutcome, IngestError> {
        self.stats.calls += 1;
        if !self.limiter.tick() {
            log::trace!(
                "pcm tap call {} skipped by rate limiter",
                self.limiter.calls()
            );
            return Ok(PushOutcome::Skipped);
        }
        self.push_now(buffer)
    }

    /// Stage `buffer` immediately, bypassing the rate limiter.
    pub fn push_now(&mut self, buffer: &PcmBuffer) -> Result<PushOutcome, IngestError> {
        match stage_buffer(buffer, self.samples_per_push, &self.staging, self.clock.now()) {
            Ok(bytes) => {
                self.stats.staged += 1;
                let generation = lock_staging(&self.staging).generation();
                log::debug!("staged {} bytes of PCM (generation {})", bytes, generation);
                Ok(PushOutcome::Staged { bytes, generation })
            }
            Err(e) => {
                self.stats.dropped += 1;
                Err(e)
            }
        }
    }

    /// Tap callback that swallows errors: dropped pushes are only logged.
    pub fn on_pcm_lossy(&mut self, buffer: &PcmBuffer) -> PushOutcome {
        match self.on_pcm(buffer) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("dropping PCM push: {}", e);
                PushOutcome::Skipped
            }
        }
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    pub fn limiter(&self) -> &PushRateLimiter {
        &self.limiter
    }

    pub fn staging(&self) -> &SharedStaging {
        &self.staging
    }
}
