//! Bounded staging region shared by the audio tap and the display tick.
//!
//! The producer replaces the staged bytes wholesale under a short lock; the
//! consumer copies them out once per generation. A push is either fully
//! committed or not at all.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::format::SampleFormat;
use super::ingest::IngestError;
use crate::config::STAGING_CAPACITY;

/// Staging region shared between threads.
pub type SharedStaging = Arc<Mutex<StagingRegion>>;

/// Fixed-capacity byte region holding the most recent accepted push.
#[derive(Debug)]
pub struct StagingRegion {
    bytes: Box<[u8]>,
    len: usize,
    format: Option<SampleFormat>,
    sample_count: usize,
    window_start: f32,
    generation: u64,
}

impl StagingRegion {
    /// Zero-filled region of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
            format: None,
            sample_count: 0,
            window_start: 0.0,
            generation: 0,
        }
    }

    pub fn shared(capacity: usize) -> SharedStaging {
        Arc::new(Mutex::new(Self::new(capacity)))
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Copy `src` verbatim and commit it as a new animation window.
    ///
    /// Rejected writes leave the region untouched.
    pub fn commit(
        &mut self,
        src: &[u8],
        format: SampleFormat,
        window_start: f32,
    ) -> Result<(), IngestError> {
        if src.is_empty() {
            return Err(IngestError::EmptyPush);
        }
        if src.len() > self.capacity() {
            return Err(IngestError::BufferOverflow {
                requested: src.len(),
                capacity: self.capacity(),
            });
        }
        self.bytes[..src.len()].copy_from_slice(src);
        self.len = src.len();
        self.format = Some(format);
        self.sample_count = src.len() / format.stride();
        self.window_start = window_start;
        self.generation += 1;
        Ok(())
    }

    /// Bytes of the last committed push.
    pub fn staged_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// The whole region, including bytes beyond the last push.
    pub fn raw(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> Option<SampleFormat> {
        self.format
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn window_start(&self) -> f32 {
        self.window_start
    }

    /// Incremented by every committed push; 0 means nothing staged yet.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Copy out the staged push if it is newer than `seen_generation`.
    pub fn snapshot_since(&self, seen_generation: u64) -> Option<StagingSnapshot> {
        if self.generation <= seen_generation {
            return None;
        }
        let format = self.format?;
        Some(StagingSnapshot {
            bytes: self.staged_bytes().to_vec(),
            format,
            sample_count: self.sample_count,
            window_start: self.window_start,
            generation: self.generation,
        })
    }
}

impl Default for StagingRegion {
    fn default() -> Self {
        Self::new(STAGING_CAPACITY)
    }
}

/// Lock a shared region, recovering the data if a holder panicked.
///
/// The region only ever holds plain bytes plus metadata committed together,
/// so a poisoned lock still guards a consistent value.
pub fn lock_staging(staging: &SharedStaging) -> MutexGuard<'_, StagingRegion> {
    staging.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Consumer-side copy of one committed push.
#[derive(Debug, Clone, PartialEq)]
pub struct StagingSnapshot {
    pub bytes: Vec<u8>,
    pub format: SampleFormat,
    pub sample_count: usize,
    pub window_start: f32,
    pub generation: u64,
}

impl StagingSnapshot {
    /// Decode sample `index` on the float scale.
    pub fn sample(&self, index: usize) -> Option<f32> {
        self.format.decode(&self.bytes, index)
    }

    /// Largest absolute sample in `[start, end)`.
    pub fn bucket_peak(&self, start: usize, end: usize) -> f32 {
        (start..end.min(self.sample_count))
            .filter_map(|i| self.sample(i))
            .fold(0.0f32, |peak, s| peak.max(s.abs()))
    }
}
