//! Time sources shared by the audio tap and the display tick.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

/// Monotonic time in seconds, as seen by the animation passes.
pub trait Clock: Send + Sync {
    fn now(&self) -> f32;
}

/// Seconds elapsed since the clock was created.
///
/// Timestamps stay small so they survive the trip through `f32` uniforms.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f32 {
        self.epoch.elapsed().as_secs_f32()
    }
}

/// Clock advanced by hand. Used by tests and offline renders.
#[derive(Debug, Default)]
pub struct ManualClock {
    bits: AtomicU32,
}

impl ManualClock {
    pub fn new(start: f32) -> Self {
        Self {
            bits: AtomicU32::new(start.to_bits()),
        }
    }

    pub fn set(&self, seconds: f32) {
        self.bits.store(seconds.to_bits(), Ordering::Release);
    }

    pub fn advance(&self, seconds: f32) {
        self.set(self.now() + seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }
}
