//! Visualizer configuration.
//!
//! Every field has a default tuned for a 4096-instance waveform fed by a
//! 4096-frame audio tap; hosts override what they need, either in code or
//! from a JSON file.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Samples the staging region holds (the tap's buffer size).
pub const STAGING_SAMPLES: usize = 4096;
/// Widest supported sample element, in bytes (float64).
pub const MAX_SAMPLE_STRIDE: usize = 8;
/// Byte capacity of the PCM staging region.
pub const STAGING_CAPACITY: usize = STAGING_SAMPLES * MAX_SAMPLE_STRIDE;
/// Upper bound on instances; keeps `instance * samples` bucket math in `u32`.
pub const MAX_INSTANCES: u32 = 1 << 18;

/// Errors that can occur while loading or validating a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Camera starting pose and tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub world_up: [f32; 3],
    pub yaw: f32,
    pub pitch: f32,
    pub zoom: f32,
    /// Upper zoom bound in degrees. `None` leaves zoom unbounded above.
    pub max_zoom: Option<f32>,
    pub movement_speed: f32,
    pub sensitivity: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 100.0],
            world_up: [0.0, 1.0, 0.0],
            yaw: -90.0,
            pitch: 0.0,
            zoom: 45.0,
            max_zoom: None,
            movement_speed: 2.5,
            sensitivity: 0.1,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Step sizes applied per tick while a control is held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Movement speed the camera uses while driven by controls.
    pub movement_speed: f32,
    /// Delta-time fed to `Camera::move_by` per tick.
    pub move_step: f32,
    /// Rotation offset per tick (before camera sensitivity).
    pub rotate_step: f32,
    /// Zoom offset per tick.
    pub zoom_step: f32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            movement_speed: 50.0,
            move_step: 0.1,
            rotate_step: 0.5,
            zoom_step: 0.5,
        }
    }
}

/// Full configuration for a waveform visualizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    /// Number of capsule instances (N).
    pub instance_count: u32,
    /// Distance between neighbouring instances along X.
    pub instance_spacing: f32,
    /// Semicircle segments per capsule cap.
    pub capsule_segments: u32,
    pub capsule_width: f32,
    pub capsule_height: f32,
    pub capsule_color: [f32; 4],
    /// Samples requested from every accepted audio push.
    pub samples_per_push: usize,
    /// Target push rate in Hz.
    pub push_frequency: f32,
    /// Rate at which the audio tap invokes the ingest callback, in Hz.
    pub callback_rate: f32,
    /// Length of one animation window in seconds.
    pub animation_duration: f32,
    /// Per-tick multiplier applied to resting peaks.
    pub decay_factor: f32,
    /// Vertical stretch applied to a full-scale peak.
    pub max_center_stretch: f32,
    pub width: u32,
    pub height: u32,
    pub msaa_samples: u32,
    pub clear_color: [f64; 4],
    pub camera: CameraConfig,
    pub controls: ControlConfig,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            instance_count: 4096,
            instance_spacing: 1.0,
            capsule_segments: 10,
            capsule_width: 0.5,
            capsule_height: 0.2,
            capsule_color: [1.0, 1.0, 1.0, 1.0],
            samples_per_push: STAGING_SAMPLES,
            push_frequency: 50.0,
            callback_rate: 44.0,
            animation_duration: 0.5,
            decay_factor: 0.9,
            max_center_stretch: 50.0,
            width: 1280,
            height: 720,
            msaa_samples: 4,
            clear_color: [0.0, 0.0, 0.0, 0.0],
            camera: CameraConfig::default(),
            controls: ControlConfig::default(),
        }
    }
}

impl WaveConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check ranges that would otherwise surface as GPU validation errors
    /// or divisions by zero deep inside a tick.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instance_count == 0 || self.instance_count > MAX_INSTANCES {
            return Err(ConfigError::Invalid(format!(
                "instance_count must be in 1..={}, got {}",
                MAX_INSTANCES, self.instance_count
            )));
        }
        if self.samples_per_push == 0 || self.samples_per_push > STAGING_SAMPLES {
            return Err(ConfigError::Invalid(format!(
                "samples_per_push must be in 1..={}, got {}",
                STAGING_SAMPLES, self.samples_per_push
            )));
        }
        if [self.push_frequency, self.callback_rate]
            .iter()
            .any(|rate| rate.is_nan() || *rate <= 0.0)
        {
            return Err(ConfigError::Invalid(
                "push_frequency and callback_rate must be positive".into(),
            ));
        }
        if self.animation_duration.is_nan() || self.animation_duration <= 0.0 {
            return Err(ConfigError::Invalid("animation_duration must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.decay_factor) {
            return Err(ConfigError::Invalid(format!(
                "decay_factor must be in 0..=1, got {}",
                self.decay_factor
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid("render target must be non-empty".into()));
        }
        if !matches!(self.msaa_samples, 1 | 4) {
            return Err(ConfigError::Invalid(format!(
                "msaa_samples must be 1 or 4, got {}",
                self.msaa_samples
            )));
        }
        Ok(())
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}
