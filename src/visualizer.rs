//! Per-tick orchestration of ingest, animation and rendering.
//!
//! The audio side only ever touches the shared staging region through a
//! [`PcmIngest`] handle. Everything else is owned here and driven by
//! [`WaveVisualizer::tick`] on the display thread.

use std::sync::Arc;

use glam::Mat4;

use crate::animation::{AnimationState, AnimatorError, DynamicAnimator, PeakAnimator, TickParams};
use crate::audio::{lock_staging, PcmIngest, SharedStaging, StagingRegion};
use crate::camera::Camera;
use crate::config::{ConfigError, WaveConfig, STAGING_CAPACITY};
use crate::controls::ControlPad;
use crate::gpu::{GpuContext, GpuError, RenderConfig, RenderError, WaveRenderer, WaveUniforms};
use crate::timing::Clock;

/// Errors that can occur while setting up or ticking the visualizer.
#[derive(Debug, thiserror::Error)]
pub enum VisualizerError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    #[error("Animation error: {0}")]
    Animator(#[from] AnimatorError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// A new push was consumed by the update pass.
    pub fresh_push: bool,
    /// Generation of the most recent push consumed so far.
    pub generation: u64,
    pub controls_applied: bool,
    pub rendered: bool,
}

pub struct WaveVisualizer {
    config: WaveConfig,
    clock: Arc<dyn Clock>,
    staging: SharedStaging,
    camera: Camera,
    controls: ControlPad,
    animator: DynamicAnimator,
    renderer: Option<WaveRenderer>,
    last_generation: u64,
    window_start: f32,
    /// Global rotation about Y, in radians.
    spin: f32,
    ticks: u64,
}

impl WaveVisualizer {
    /// CPU animation and no renderer; ticks only advance the state.
    pub fn headless(config: WaveConfig, clock: Arc<dyn Clock>) -> Result<Self, VisualizerError> {
        Self::with_gpu(config, clock, None)
    }

    /// Animate and render on `gpu` when given. Setup failures on the GPU
    /// degrade to CPU animation and/or no renderer instead of failing.
    pub fn with_gpu(
        config: WaveConfig,
        clock: Arc<dyn Clock>,
        gpu: Option<&GpuContext>,
    ) -> Result<Self, VisualizerError> {
        config.validate()?;

        let animator = DynamicAnimator::gpu_with_fallback(
            gpu.map(|ctx| ctx.device.clone()),
            gpu.map(|ctx| ctx.queue.clone()),
            config.instance_count,
        );

        let renderer = gpu.and_then(|ctx| {
            let render_config = RenderConfig::from_wave_config(&config);
            match WaveRenderer::with_device(ctx.device.clone(), ctx.queue.clone(), render_config) {
                Ok(renderer) => Some(renderer),
                Err(e) => {
                    log::warn!("renderer unavailable ({}), frames are skipped", e);
                    None
                }
            }
        });

        Ok(Self {
            camera: Camera::from_config(&config.camera),
            clock,
            staging: StagingRegion::shared(STAGING_CAPACITY),
            controls: ControlPad::new(),
            animator,
            renderer,
            last_generation: 0,
            window_start: 0.0,
            spin: 0.0,
            ticks: 0,
            config,
        })
    }

    /// Acquire a GPU and build on it, falling back to headless without one.
    pub async fn new(config: WaveConfig, clock: Arc<dyn Clock>) -> Result<Self, VisualizerError> {
        match GpuContext::new().await {
            Ok(ctx) => Self::with_gpu(config, clock, Some(&ctx)),
            Err(e) => {
                log::warn!("no GPU ({}), running headless", e);
                Self::headless(config, clock)
            }
        }
    }

    /// Producer handle for the audio tap thread.
    pub fn ingest(&self) -> PcmIngest {
        PcmIngest::from_config(&self.config, self.staging.clone(), self.clock.clone())
    }

    pub fn staging(&self) -> &SharedStaging {
        &self.staging
    }

    pub fn config(&self) -> &WaveConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn controls(&self) -> &ControlPad {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut ControlPad {
        &mut self.controls
    }

    pub fn spin(&self) -> f32 {
        self.spin
    }

    pub fn set_spin(&mut self, radians: f32) {
        self.spin = radians;
    }

    pub fn is_gpu_animated(&self) -> bool {
        self.animator.is_gpu()
    }

    pub fn renderer(&self) -> Option<&WaveRenderer> {
        self.renderer.as_ref()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Camera and spin uniforms for the current frame.
    pub fn uniforms(&self) -> WaveUniforms {
        let projection = self.camera.projection_matrix(
            self.config.aspect_ratio(),
            self.config.camera.near,
            self.config.camera.far,
        );
        WaveUniforms::new(
            projection,
            self.camera.view_matrix(),
            Mat4::from_rotation_y(self.spin),
            self.config.max_center_stretch,
            self.config.instance_count,
        )
    }

    /// Run one display tick: held controls, decay, update on a fresh push,
    /// then the instanced draw.
    pub fn tick(&mut self) -> Result<TickReport, VisualizerError> {
        let controls_applied = self.controls.apply(&mut self.camera, &self.config.controls);

        let now = self.clock.now();
        let snapshot = lock_staging(&self.staging).snapshot_since(self.last_generation);
        if let Some(snapshot) = &snapshot {
            self.last_generation = snapshot.generation;
            self.window_start = snapshot.window_start;
        }

        let params = TickParams {
            now,
            window_start: self.window_start,
            window_duration: self.config.animation_duration,
            decay_factor: self.config.decay_factor,
            instance_count: self.config.instance_count,
            fresh_push: snapshot.is_some(),
        };
        self.animator.step(&params, snapshot.as_ref())?;

        let rendered = self.render_current();
        self.ticks += 1;

        if log::log_enabled!(log::Level::Trace) && snapshot.is_some() {
            self.animator.read_state()?.log_dump(4);
        }

        Ok(TickReport {
            fresh_push: params.fresh_push,
            generation: self.last_generation,
            controls_applied,
            rendered,
        })
    }

    fn render_current(&self) -> bool {
        let Some(renderer) = &self.renderer else {
            return false;
        };
        let uniforms = self.uniforms();
        match (self.animator.state_buffer(), self.animator.cpu_state()) {
            (Some(state), _) => renderer.render(&uniforms, state),
            (None, Some(state)) => {
                renderer.upload_state(state);
                renderer.render(&uniforms, renderer.host_state());
            }
            (None, None) => return false,
        }
        true
    }

    /// RGBA pixels of the last rendered frame, `None` without a renderer.
    pub fn read_frame(&self) -> Result<Option<Vec<u8>>, VisualizerError> {
        match &self.renderer {
            Some(renderer) => Ok(Some(renderer.read_pixels()?)),
            None => Ok(None),
        }
    }

    /// Snapshot of the animation state, read back from the GPU if needed.
    pub fn animation_state(&self) -> Result<AnimationState, VisualizerError> {
        Ok(self.animator.read_state()?)
    }

    /// Zero the animation state and forget consumed pushes.
    pub fn reset(&mut self) -> Result<(), VisualizerError> {
        self.animator.reset()?;
        self.last_generation = lock_staging(&self.staging).generation();
        self.window_start = 0.0;
        Ok(())
    }
}
