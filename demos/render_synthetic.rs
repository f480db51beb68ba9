//! Example: Render the capsule wave from synthetic pulses, deterministically.
//!
//! A manual clock stands in for the display link, so every frame is
//! reproducible. Pushes are fed directly, one per simulated tap callback.
//!
//! Run with:
//!     cargo run --example render_synthetic

use std::sync::Arc;

use pcm_wave::audio::synth::generate_pulses;
use pcm_wave::audio::{AudioData, PushOutcome};
use pcm_wave::config::WaveConfig;
use pcm_wave::controls::Control;
use pcm_wave::timing::{Clock, ManualClock};
use pcm_wave::visualizer::WaveVisualizer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("PCM Wave - Synthetic Audio Example");
    println!("==================================\n");

    let sample_rate: u32 = 44100;
    let frames_per_buffer = 4096;
    let audio = AudioData {
        samples: generate_pulses(120.0, sample_rate, 3.0, 330.0),
        sample_rate,
        channels: 1,
    };
    let buffers = audio.tap_buffers(frames_per_buffer);
    let buffer_secs = frames_per_buffer as f32 / sample_rate as f32;
    println!("  {} tap buffers of {:.1} ms", buffers.len(), buffer_secs * 1000.0);

    let config = WaveConfig {
        instance_count: 1024,
        instance_spacing: 0.25,
        width: 640,
        height: 360,
        ..WaveConfig::default()
    };
    let (width, height) = (config.width, config.height);

    let clock = Arc::new(ManualClock::new(0.0));
    let mut visualizer = WaveVisualizer::new(config, clock.clone()).await?;
    let mut ingest = visualizer.ingest();
    visualizer.controls_mut().press(Control::Backward);

    let ticks_per_buffer = 6;
    let tick_secs = buffer_secs / ticks_per_buffer as f32;
    let mut frame = 0;

    for buffer in buffers.iter().filter(|b| b.frame_length == frames_per_buffer) {
        if let PushOutcome::Staged { generation, .. } = ingest.on_pcm_lossy(buffer) {
            println!("push {:3} at t={:.3}s", generation, clock.now());
        }
        for _ in 0..ticks_per_buffer {
            visualizer.tick()?;
            visualizer.set_spin(visualizer.spin() + 0.01);
            clock.advance(tick_secs);
        }

        if let Some(pixels) = visualizer.read_frame()? {
            let path = format!("synthetic_{:03}.png", frame);
            image::save_buffer(&path, &pixels, width, height, image::ColorType::Rgba8)?;
            frame += 1;
        }
    }
    visualizer.controls_mut().release_all();

    let summary = visualizer.animation_state()?.summary();
    println!("\nFinal state: {:?}", summary);
    println!("Saved {} frames", frame);
    Ok(())
}
