//! Sample formats and their GPU tags.
//!
//! The host declares one of several common PCM formats; only three of them
//! can be staged. The staged format is resolved once per push into a
//! [`SampleFormat`], whose tag tells the update kernel how to reinterpret the
//! raw bytes.

use serde::{Deserialize, Serialize};

/// PCM formats a host audio stack can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommonFormat {
    Other,
    Float32,
    Float64,
    Int16,
    Int32,
}

impl CommonFormat {
    /// Tag understood by the shaders (`FORMAT_*` in `peaks.wgsl`).
    pub fn tag(self) -> u32 {
        match self {
            Self::Other => 0,
            Self::Float32 => 1,
            Self::Float64 => 2,
            Self::Int16 => 3,
            Self::Int32 => 4,
        }
    }
}

/// A format the staging region accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleFormat {
    Float32,
    Int16,
    Int32,
}

impl SampleFormat {
    pub fn from_common(format: CommonFormat) -> Option<Self> {
        match format {
            CommonFormat::Float32 => Some(Self::Float32),
            CommonFormat::Int16 => Some(Self::Int16),
            CommonFormat::Int32 => Some(Self::Int32),
            CommonFormat::Float64 | CommonFormat::Other => None,
        }
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(Self::Float32),
            3 => Some(Self::Int16),
            4 => Some(Self::Int32),
            _ => None,
        }
    }

    pub fn common(self) -> CommonFormat {
        match self {
            Self::Float32 => CommonFormat::Float32,
            Self::Int16 => CommonFormat::Int16,
            Self::Int32 => CommonFormat::Int32,
        }
    }

    pub fn tag(self) -> u32 {
        self.common().tag()
    }

    /// Bytes per sample element.
    pub fn stride(self) -> usize {
        match self {
            Self::Float32 => std::mem::size_of::<f32>(),
            Self::Int16 => std::mem::size_of::<i16>(),
            Self::Int32 => std::mem::size_of::<i32>(),
        }
    }

    /// Decode sample `index` from native-endian `bytes` into a signed value
    /// on the float scale (integers divided by their full-scale magnitude).
    ///
    /// Returns `None` when the sample lies outside `bytes`.
    pub fn decode(self, bytes: &[u8], index: usize) -> Option<f32> {
        let stride = self.stride();
        let start = index.checked_mul(stride)?;
        let raw = bytes.get(start..start + stride)?;
        let value = match self {
            Self::Float32 => f32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]),
            Self::Int16 => i16::from_ne_bytes([raw[0], raw[1]]) as f32 / 32768.0,
            Self::Int32 => {
                i32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]) as f32 / 2_147_483_648.0
            }
        };
        Some(value)
    }
}
