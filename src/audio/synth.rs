//! Synthetic PCM for tests, benches and demos.

use std::f32::consts::PI;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Sine wave of `duration` seconds.
pub fn generate_sine(frequency: f32, sample_rate: u32, duration: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (duration * sample_rate as f32) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (2.0 * PI * frequency * t).sin()
        })
        .collect()
}

/// Reproducible white noise (LCG-driven).
pub fn generate_white_noise(num_samples: usize, amplitude: f32, seed: u64) -> Vec<f32> {
    let mut state = seed;
    (0..num_samples)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let normalized = (state >> 11) as f32 / (1u64 << 53) as f32 * 2.0 - 1.0;
            amplitude * normalized
        })
        .collect()
}

/// Decaying tone bursts on every beat, for visibly pulsing waveforms.
pub fn generate_pulses(bpm: f32, sample_rate: u32, duration: f32, tone: f32) -> Vec<f32> {
    let num_samples = (duration * sample_rate as f32) as usize;
    let samples_per_beat = ((60.0 / bpm) * sample_rate as f32).max(1.0) as usize;
    (0..num_samples)
        .map(|i| {
            let t = (i % samples_per_beat) as f32 / sample_rate as f32;
            (-t * 12.0).exp() * (2.0 * PI * tone * t).sin()
        })
        .collect()
}

/// Quantize float samples to int16, clamping to full scale.
pub fn to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

/// Quantize float samples to int32, clamping to full scale.
pub fn to_i32(samples: &[f32]) -> Vec<i32> {
    samples
        .iter()
        .map(|s| (s.clamp(-1.0, 1.0) as f64 * i32::MAX as f64) as i32)
        .collect()
}

/// Write mono samples as a 16-bit PCM WAV file.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> std::io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);

    let data_size = samples.len() as u32 * 2;
    file.write_all(b"RIFF")?;
    file.write_all(&(36 + data_size).to_le_bytes())?;
    file.write_all(b"WAVE")?;

    file.write_all(b"fmt ")?;
    file.write_all(&16u32.to_le_bytes())?;
    file.write_all(&1u16.to_le_bytes())?; // PCM
    file.write_all(&1u16.to_le_bytes())?; // mono
    file.write_all(&sample_rate.to_le_bytes())?;
    file.write_all(&(sample_rate * 2).to_le_bytes())?;
    file.write_all(&2u16.to_le_bytes())?;
    file.write_all(&16u16.to_le_bytes())?;

    file.write_all(b"data")?;
    file.write_all(&data_size.to_le_bytes())?;
    for sample in to_i16(samples) {
        file.write_all(&sample.to_le_bytes())?;
    }
    file.flush()
}
