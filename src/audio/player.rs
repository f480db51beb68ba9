//! Background tap that replays a decoded track as timed PCM pushes.
//!
//! The delivery thread plays the role of an audio engine tap: it hands
//! consecutive buffers to a callback at the track's own cadence, independent
//! of the display tick.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::buffer::PcmBuffer;
use super::loader::{load_audio, AudioData, AudioError};

/// How buffers are spaced in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// One buffer per buffer-duration of wall-clock time.
    RealTime,
    /// As fast as the callback returns.
    Unpaced,
}

/// A running file tap. Dropping it stops delivery.
pub struct FileTap {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<usize>>,
}

impl FileTap {
    /// Decode `path` and start delivering `frames_per_buffer`-frame buffers.
    ///
    /// Decoding errors are returned before any thread is spawned.
    pub fn open<P, F>(
        path: P,
        frames_per_buffer: usize,
        pacing: Pacing,
        on_pcm: F,
    ) -> Result<Self, AudioError>
    where
        P: AsRef<Path>,
        F: FnMut(&PcmBuffer) + Send + 'static,
    {
        let audio = load_audio(path.as_ref())?;
        Ok(Self::start(audio, frames_per_buffer, pacing, on_pcm))
    }

    /// Start delivering an already decoded track.
    pub fn start<F>(audio: AudioData, frames_per_buffer: usize, pacing: Pacing, mut on_pcm: F) -> Self
    where
        F: FnMut(&PcmBuffer) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let handle = std::thread::spawn(move || {
            let buffers = audio.tap_buffers(frames_per_buffer);
            let started = Instant::now();
            let mut scheduled = Duration::ZERO;
            let mut delivered = 0;

            for buffer in &buffers {
                if thread_stop.load(Ordering::Acquire) {
                    log::info!("file tap stopped after {} buffers", delivered);
                    return delivered;
                }
                on_pcm(buffer);
                delivered += 1;

                if pacing == Pacing::RealTime {
                    scheduled += Duration::from_secs_f64(buffer.duration());
                    if let Some(wait) = scheduled.checked_sub(started.elapsed()) {
                        std::thread::sleep(wait);
                    }
                }
            }
            log::info!("file tap finished: {} buffers delivered", delivered);
            delivered
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Ask the delivery thread to stop after the current buffer.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for delivery to end; returns the number of buffers delivered.
    pub fn join(mut self) -> usize {
        self.join_inner()
    }

    fn join_inner(&mut self) -> usize {
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                log::warn!("file tap thread panicked");
                0
            }),
            None => 0,
        }
    }
}

impl Drop for FileTap {
    fn drop(&mut self) {
        self.stop();
        self.join_inner();
    }
}
