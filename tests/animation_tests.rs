//! Integration tests for the peak animation passes, fed through the real
//! ingest path.

use std::sync::Arc;

use pcm_wave::animation::{smoothstep, DynamicAnimator, PeakAnimator, TickParams};
use pcm_wave::audio::synth::{generate_sine, to_i16, to_i32};
use pcm_wave::audio::{lock_staging, PcmBuffer, PcmIngest, StagingRegion, StagingSnapshot};
use pcm_wave::config::{WaveConfig, STAGING_CAPACITY};
use pcm_wave::gpu::GpuContext;
use pcm_wave::timing::ManualClock;

const SAMPLE_RATE: f64 = 44100.0;

async fn create_gpu_context() -> Option<GpuContext> {
    GpuContext::new().await.ok()
}

/// Push `buffer` through a fresh ingest and return the staged snapshot.
fn stage(buffer: &PcmBuffer, window_start: f32) -> StagingSnapshot {
    let staging = StagingRegion::shared(STAGING_CAPACITY);
    let mut ingest = PcmIngest::from_config(
        &WaveConfig::default(),
        staging.clone(),
        Arc::new(ManualClock::new(window_start)),
    );
    ingest.push_now(buffer).unwrap();
    let region = lock_staging(&staging);
    region.snapshot_since(0).unwrap()
}

fn tick(now: f32, window_start: f32, fresh_push: bool, instance_count: u32) -> TickParams {
    TickParams {
        now,
        window_start,
        window_duration: 0.5,
        decay_factor: 0.9,
        instance_count,
        fresh_push,
    }
}

#[test]
fn test_silence_initializes_every_instance() {
    let snapshot = stage(&PcmBuffer::from_f32(vec![0.0; 4096], SAMPLE_RATE), 0.0);
    let mut animator = DynamicAnimator::cpu(4096);
    animator.step(&tick(0.0, 0.0, true, 4096), Some(&snapshot)).unwrap();

    let state = animator.read_state().unwrap();
    assert!(state.target_peak.iter().all(|&p| p == 0.0));
    assert!(state.initialized.iter().all(|&f| f));
    assert_eq!(state.summary().initialized, 4096);
}

#[test]
fn test_untouched_instances_stay_uninitialized() {
    let mut animator = DynamicAnimator::cpu(64);
    for i in 0..5 {
        animator.step(&tick(i as f32 * 0.1, 0.0, false, 64), None).unwrap();
    }
    let state = animator.read_state().unwrap();
    assert!(state.initialized.iter().all(|&f| !f));
    assert!(state.progress.iter().all(|&p| p == 0.0));
}

#[test]
fn test_full_scale_int16_sine_reaches_unity() {
    let sine = generate_sine(440.0, 44100, 0.1, 1.0);
    let snapshot = stage(&PcmBuffer::from_i16(to_i16(&sine), SAMPLE_RATE), 0.0);
    let mut animator = DynamicAnimator::cpu(4);
    animator.step(&tick(0.0, 0.0, true, 4), Some(&snapshot)).unwrap();

    // Each 1024-sample bucket spans several periods of the tone.
    let state = animator.read_state().unwrap();
    for peak in &state.target_peak {
        assert!((peak - 1.0).abs() < 1e-3, "peak {}", peak);
    }
}

#[test]
fn test_animation_follows_window_then_decays() {
    let snapshot = stage(&PcmBuffer::from_f32(vec![0.8; 4096], SAMPLE_RATE), 1.0);
    let mut animator = DynamicAnimator::cpu(16);
    animator.step(&tick(1.0, 1.0, true, 16), Some(&snapshot)).unwrap();

    // Halfway through the window the displayed amplitude is eased.
    animator.step(&tick(1.25, 1.0, false, 16), None).unwrap();
    let state = animator.read_state().unwrap();
    assert!((state.progress[0] - 0.5).abs() < 1e-6);
    assert!((state.displayed_amplitude(0) - 0.8 * smoothstep(0.5)).abs() < 1e-6);

    // Once the window is over, every tick multiplies the target by 0.9.
    let mut last = f32::INFINITY;
    for k in 0..40 {
        animator
            .step(&tick(1.5 + k as f32 * 0.02, 1.0, false, 16), None)
            .unwrap();
        let shown = animator.read_state().unwrap().displayed_amplitude(0);
        assert!(shown <= last);
        last = shown;
    }
    assert!(last < 0.8 * 0.9f32.powi(39));
}

#[test]
fn test_new_push_keeps_visible_peak() {
    let loud = stage(&PcmBuffer::from_f32(vec![0.9; 4096], SAMPLE_RATE), 0.0);
    let quiet = stage(&PcmBuffer::from_f32(vec![0.1; 4096], SAMPLE_RATE), 0.5);
    let mut animator = DynamicAnimator::cpu(8);

    animator.step(&tick(0.0, 0.0, true, 8), Some(&loud)).unwrap();
    animator.step(&tick(0.5, 0.0, false, 8), None).unwrap();
    animator.step(&tick(0.5, 0.5, true, 8), Some(&quiet)).unwrap();

    // The finished window aged the loud target once before the quiet push.
    let state = animator.read_state().unwrap();
    assert!((state.old_peak[0] - 0.81).abs() < 1e-6);
    assert!((state.target_peak[0] - 0.1).abs() < 1e-6);
    assert!((state.displayed_amplitude(0) - 0.81).abs() < 1e-6);
}

#[test]
fn test_summary_serializes() {
    let snapshot = stage(&PcmBuffer::from_f32(vec![0.25; 4096], SAMPLE_RATE), 0.0);
    let mut animator = DynamicAnimator::cpu(32);
    animator.step(&tick(0.0, 0.0, true, 32), Some(&snapshot)).unwrap();

    let json = serde_json::to_value(animator.read_state().unwrap().summary()).unwrap();
    assert_eq!(json["instances"], 32);
    assert_eq!(json["initialized"], 32);
    assert_eq!(json["max_target_peak"], 0.25);
}

#[tokio::test]
async fn test_gpu_animator_matches_cpu() {
    let Some(ctx) = create_gpu_context().await else {
        return;
    };
    let n = 4096;
    let mut gpu = DynamicAnimator::gpu(ctx.device.clone(), ctx.queue.clone(), n).unwrap();
    let mut cpu = DynamicAnimator::cpu(n);
    assert!(gpu.is_gpu());

    let sine = generate_sine(220.0, 44100, 0.1, 0.7);
    let pushes = [
        stage(&PcmBuffer::from_f32(sine.clone(), SAMPLE_RATE), 0.0),
        stage(&PcmBuffer::from_i32(to_i32(&sine), SAMPLE_RATE), 0.3),
    ];

    let schedule = [
        (0.0, 0.0, Some(&pushes[0])),
        (0.1, 0.0, None),
        (0.3, 0.3, Some(&pushes[1])),
        (0.6, 0.3, None),
        (0.9, 0.3, None),
        (1.0, 0.3, None),
    ];
    for (now, window_start, push) in schedule {
        let params = tick(now, window_start, push.is_some(), n);
        gpu.step(&params, push).unwrap();
        cpu.step(&params, push).unwrap();
    }

    let gpu_state = gpu.read_state().unwrap();
    let cpu_state = cpu.read_state().unwrap();
    assert_eq!(gpu_state.initialized, cpu_state.initialized);
    for i in 0..n as usize {
        assert!(
            (gpu_state.displayed_amplitude(i) - cpu_state.displayed_amplitude(i)).abs() < 1e-4,
            "instance {} differs",
            i
        );
    }
}

#[test]
fn test_gpu_fallback_without_device() {
    let animator = DynamicAnimator::gpu_with_fallback(None, None, 128);
    assert!(!animator.is_gpu());
    assert!(animator.state_buffer().is_none());
    assert_eq!(animator.cpu_state().map(|s| s.len()), Some(128));
}
