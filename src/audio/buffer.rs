//! Host-facing PCM buffer model.
//!
//! Mirrors what an audio engine tap hands over: a declared format plus
//! de-interleaved channel data of one concrete element type.

use super::format::CommonFormat;

/// Declared format of a tapped buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFormat {
    pub common_format: CommonFormat,
    pub channel_count: u32,
    pub sample_rate: f64,
}

/// De-interleaved channel storage, one `Vec` per channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelData {
    Float32(Vec<Vec<f32>>),
    Float64(Vec<Vec<f64>>),
    Int16(Vec<Vec<i16>>),
    Int32(Vec<Vec<i32>>),
}

impl ChannelData {
    pub fn channel_count(&self) -> usize {
        match self {
            Self::Float32(c) => c.len(),
            Self::Float64(c) => c.len(),
            Self::Int16(c) => c.len(),
            Self::Int32(c) => c.len(),
        }
    }

    /// Format the storage naturally holds.
    pub fn natural_format(&self) -> CommonFormat {
        match self {
            Self::Float32(_) => CommonFormat::Float32,
            Self::Float64(_) => CommonFormat::Float64,
            Self::Int16(_) => CommonFormat::Int16,
            Self::Int32(_) => CommonFormat::Int32,
        }
    }
}

/// A buffer delivered by the audio source's push callback.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    pub format: AudioFormat,
    pub channels: ChannelData,
    /// Valid frames per channel.
    pub frame_length: usize,
}

impl PcmBuffer {
    /// Build a buffer whose declared format matches its storage.
    pub fn new(channels: ChannelData, sample_rate: f64) -> Self {
        let frame_length = match &channels {
            ChannelData::Float32(c) => c.first().map_or(0, Vec::len),
            ChannelData::Float64(c) => c.first().map_or(0, Vec::len),
            ChannelData::Int16(c) => c.first().map_or(0, Vec::len),
            ChannelData::Int32(c) => c.first().map_or(0, Vec::len),
        };
        Self {
            format: AudioFormat {
                common_format: channels.natural_format(),
                channel_count: channels.channel_count() as u32,
                sample_rate,
            },
            channels,
            frame_length,
        }
    }

    /// Mono float32 buffer.
    pub fn from_f32(samples: Vec<f32>, sample_rate: f64) -> Self {
        Self::new(ChannelData::Float32(vec![samples]), sample_rate)
    }

    /// Mono int16 buffer.
    pub fn from_i16(samples: Vec<i16>, sample_rate: f64) -> Self {
        Self::new(ChannelData::Int16(vec![samples]), sample_rate)
    }

    /// Mono int32 buffer.
    pub fn from_i32(samples: Vec<i32>, sample_rate: f64) -> Self {
        Self::new(ChannelData::Int32(vec![samples]), sample_rate)
    }

    /// Mono float64 buffer. Declared, but never accepted by the ingest path.
    pub fn from_f64(samples: Vec<f64>, sample_rate: f64) -> Self {
        Self::new(ChannelData::Float64(vec![samples]), sample_rate)
    }

    /// Duration covered by the valid frames, in seconds.
    pub fn duration(&self) -> f64 {
        if self.format.sample_rate <= 0.0 {
            return 0.0;
        }
        self.frame_length as f64 / self.format.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_derives_format() {
        let buffer = PcmBuffer::new(
            ChannelData::Int16(vec![vec![0; 512], vec![0; 512]]),
            48000.0,
        );
        assert_eq!(buffer.format.common_format, CommonFormat::Int16);
        assert_eq!(buffer.format.channel_count, 2);
        assert_eq!(buffer.frame_length, 512);
    }

    #[test]
    fn test_duration() {
        let buffer = PcmBuffer::from_f32(vec![0.0; 4410], 44100.0);
        assert!((buffer.duration() - 0.1).abs() < 1e-9);
    }
}
