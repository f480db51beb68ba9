//! End-to-end tests: audio tap to ingest to ticks.

use std::sync::Arc;

use glam::Vec3;
use pcm_wave::audio::synth::{generate_sine, write_wav};
use pcm_wave::audio::{FileTap, Pacing, PcmBuffer, PushOutcome};
use pcm_wave::camera::Camera;
use pcm_wave::config::WaveConfig;
use pcm_wave::controls::Control;
use pcm_wave::gpu::GpuContext;
use pcm_wave::timing::ManualClock;
use pcm_wave::visualizer::{VisualizerError, WaveVisualizer};

fn small_config() -> WaveConfig {
    WaveConfig {
        instance_count: 64,
        width: 64,
        height: 64,
        ..WaveConfig::default()
    }
}

#[test]
fn test_default_camera_looks_at_the_wave() {
    let camera = Camera::new(Vec3::new(0.0, 0.0, 100.0), Vec3::Y, -90.0, 0.0);
    assert!((camera.front() - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);

    let expected = glam::Mat4::look_at_rh(
        Vec3::new(0.0, 0.0, 100.0),
        Vec3::new(0.0, 0.0, 99.0),
        Vec3::Y,
    );
    assert!(camera.view_matrix().abs_diff_eq(expected, 1e-5));
}

#[test]
fn test_headless_ticks_follow_pushes() {
    let clock = Arc::new(ManualClock::new(0.0));
    let mut vis = WaveVisualizer::headless(small_config(), clock.clone()).unwrap();
    let mut ingest = vis.ingest();

    // No push yet: nothing to animate.
    let idle = vis.tick().unwrap();
    assert!(!idle.fresh_push);
    assert_eq!(idle.generation, 0);

    let tone = generate_sine(440.0, 44100, 0.1, 0.5);
    for _ in 0..3 {
        let outcome = ingest.on_pcm(&PcmBuffer::from_f32(tone.clone(), 44100.0)).unwrap();
        assert!(matches!(outcome, PushOutcome::Staged { .. }));
    }

    // Only the newest push is seen; older ones were overwritten.
    let report = vis.tick().unwrap();
    assert!(report.fresh_push);
    assert_eq!(report.generation, 3);

    clock.advance(1.0);
    for _ in 0..10 {
        vis.tick().unwrap();
    }
    let state = vis.animation_state().unwrap();
    assert!(state.initialized.iter().all(|&f| f));
    assert!(state.progress.iter().all(|&p| p == 1.0));
    assert!(state.target_peak.iter().all(|&p| p < 0.5 * 0.9f32.powi(9)));
    assert_eq!(vis.ticks(), 12);
}

#[test]
fn test_file_tap_feeds_visualizer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    let tone = generate_sine(220.0, 44100, 0.5, 0.8);
    write_wav(&path, &tone[..4 * 4096], 44100).unwrap();

    // 256-sample buckets hold at least one full period of the tone.
    let config = WaveConfig {
        instance_count: 16,
        ..small_config()
    };
    let clock = Arc::new(ManualClock::new(0.0));
    let mut vis = WaveVisualizer::headless(config, clock).unwrap();
    let mut ingest = vis.ingest();

    let tap = FileTap::open(&path, 4096, Pacing::Unpaced, move |buffer| {
        ingest.on_pcm_lossy(buffer);
    })
    .unwrap();
    assert_eq!(tap.join(), 4);

    let report = vis.tick().unwrap();
    assert!(report.fresh_push);
    assert_eq!(report.generation, 4);

    let state = vis.animation_state().unwrap();
    assert_eq!(state.len(), 16);
    assert!(state.target_peak.iter().all(|&p| (p - 0.8).abs() < 0.01));
}

#[test]
fn test_config_file_drives_visualizer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wave.json");
    std::fs::write(
        &path,
        r#"{ "instance_count": 128, "decay_factor": 0.5, "camera": { "position": [0, 5, 50] } }"#,
    )
    .unwrap();

    let config = WaveConfig::from_json_file(&path).unwrap();
    assert_eq!(config.samples_per_push, 4096);

    let vis = WaveVisualizer::headless(config, Arc::new(ManualClock::new(0.0))).unwrap();
    assert_eq!(vis.animation_state().unwrap().len(), 128);
    assert_eq!(vis.camera().position(), Vec3::new(0.0, 5.0, 50.0));
}

#[test]
fn test_oversized_instance_count_is_rejected() {
    let config = WaveConfig {
        instance_count: u32::MAX,
        ..WaveConfig::default()
    };
    let result = WaveVisualizer::headless(config, Arc::new(ManualClock::new(0.0)));
    assert!(matches!(result, Err(VisualizerError::Config(_))));
}

#[test]
fn test_held_controls_apply_every_tick() {
    let mut vis = WaveVisualizer::headless(small_config(), Arc::new(ManualClock::new(0.0))).unwrap();
    vis.controls_mut().press(Control::Backward);
    for _ in 0..4 {
        assert!(vis.tick().unwrap().controls_applied);
    }
    vis.controls_mut().release(Control::Backward);
    assert!(!vis.tick().unwrap().controls_applied);
    assert!((vis.camera().position().z - 120.0).abs() < 1e-3);
}

#[tokio::test]
async fn test_gpu_visualizer_renders_frames() {
    let Ok(ctx) = GpuContext::new().await else {
        return;
    };
    let mut config = small_config();
    config.camera.position = [0.0, 0.0, 40.0];

    let mut vis =
        WaveVisualizer::with_gpu(config, Arc::new(ManualClock::new(0.0)), Some(&ctx)).unwrap();
    let mut ingest = vis.ingest();
    ingest
        .push_now(&PcmBuffer::from_f32(vec![0.5; 4096], 44100.0))
        .unwrap();

    let report = vis.tick().unwrap();
    assert!(report.rendered);

    let pixels = vis.read_frame().unwrap().unwrap();
    assert_eq!(pixels.len(), 64 * 64 * 4);
    assert!(pixels.chunks_exact(4).any(|px| px[3] > 0));
}

#[tokio::test]
async fn test_full_size_silent_cycle_renders() {
    let Ok(ctx) = GpuContext::new().await else {
        return;
    };
    let config = WaveConfig {
        width: 320,
        height: 180,
        ..WaveConfig::default()
    };
    assert_eq!(config.instance_count, 4096);

    let mut vis =
        WaveVisualizer::with_gpu(config, Arc::new(ManualClock::new(0.0)), Some(&ctx)).unwrap();
    let mut ingest = vis.ingest();
    ingest
        .push_now(&PcmBuffer::from_f32(vec![0.0; 4096], 44100.0))
        .unwrap();

    let report = vis.tick().unwrap();
    assert!(report.fresh_push);
    assert!(report.rendered);

    let state = vis.animation_state().unwrap();
    assert_eq!(state.len(), 4096);
    assert!(state.target_peak.iter().all(|&p| p == 0.0));
    assert!(state.initialized.iter().all(|&f| f));

    let pixels = vis.read_frame().unwrap().unwrap();
    assert_eq!(pixels.len(), 320 * 180 * 4);
}

#[test]
fn test_limited_device_degrades_to_cpu_without_frames() {
    let Ok(ctx) = pollster::block_on(GpuContext::with_limits(|_| {
        wgpu::Limits::downlevel_webgl2_defaults()
    })) else {
        return;
    };

    let mut vis =
        WaveVisualizer::with_gpu(small_config(), Arc::new(ManualClock::new(0.0)), Some(&ctx))
            .unwrap();
    assert!(!vis.is_gpu_animated());
    assert!(vis.renderer().is_none());

    let mut ingest = vis.ingest();
    ingest
        .push_now(&PcmBuffer::from_f32(vec![0.3; 4096], 44100.0))
        .unwrap();
    let report = vis.tick().unwrap();
    assert!(report.fresh_push);
    assert!(!report.rendered);
    assert!(vis.read_frame().unwrap().is_none());
    assert!(vis
        .animation_state()
        .unwrap()
        .target_peak
        .iter()
        .all(|&p| (p - 0.3).abs() < 1e-6));
}
