//! Audio file decoding using Symphonia.
//!
//! Stands in for the host audio stack when the visualizer is fed from a
//! file: the decoded track is cut into tap-sized [`PcmBuffer`]s.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use thiserror::Error;

use super::buffer::{ChannelData, PcmBuffer};

/// Errors that abort playback setup.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to open audio file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to probe audio format: {0}")]
    ProbeError(#[from] SymphoniaError),

    #[error("No audio track found in file")]
    NoAudioTrack,

    #[error("Unknown sample rate")]
    UnknownSampleRate,
}

/// A fully decoded track.
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Interleaved samples, normalized to -1.0..1.0.
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: usize,
}

impl AudioData {
    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_frames() as f64 / self.sample_rate as f64
    }

    /// Frames per channel.
    pub fn num_frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels
    }

    /// Samples of one channel, de-interleaved.
    pub fn channel(&self, index: usize) -> Vec<f32> {
        if index >= self.channels {
            return Vec::new();
        }
        self.samples
            .iter()
            .skip(index)
            .step_by(self.channels)
            .copied()
            .collect()
    }

    /// Cut the track into consecutive float32 tap buffers of
    /// `frames_per_buffer` frames. The last buffer may be shorter.
    pub fn tap_buffers(&self, frames_per_buffer: usize) -> Vec<PcmBuffer> {
        if frames_per_buffer == 0 || self.channels == 0 {
            return Vec::new();
        }
        let frame_stride = frames_per_buffer * self.channels;
        self.samples
            .chunks(frame_stride)
            .map(|chunk| {
                let frames = chunk.len() / self.channels;
                let mut planes = vec![Vec::with_capacity(frames); self.channels];
                for frame in chunk.chunks_exact(self.channels) {
                    for (plane, &sample) in planes.iter_mut().zip(frame) {
                        plane.push(sample);
                    }
                }
                PcmBuffer::new(ChannelData::Float32(planes), self.sample_rate as f64)
            })
            .collect()
    }
}

/// Decode an audio file (WAV, MP3, FLAC, AAC) into interleaved f32 samples.
pub fn load_audio(path: &Path) -> Result<AudioData, AudioError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(AudioError::NoAudioTrack)?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(AudioError::UnknownSampleRate)?;
    let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::debug!("skipping undecodable packet: {}", msg);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let buf = sample_buf.get_or_insert_with(|| {
            let spec = *decoded.spec();
            SampleBuffer::new(decoded.capacity() as u64, spec)
        });
        if channels == 0 {
            channels = decoded.spec().channels.count();
        }
        buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buf.samples());
    }

    log::info!(
        "decoded {}: {} Hz, {} channel(s), {} samples",
        path.display(),
        sample_rate,
        channels,
        samples.len()
    );

    Ok(AudioData {
        samples,
        sample_rate,
        channels: channels.max(1),
    })
}
