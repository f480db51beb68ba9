//! Example: Drive the capsule wave from an audio file and save PNG frames.
//!
//! The file is replayed by a background tap in real time while the display
//! loop ticks at 60 Hz. Without a path, a synthetic pulse track is used.
//!
//! Run with:
//!     cargo run --example render_file -- path/to/audio.mp3

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pcm_wave::audio::synth::generate_pulses;
use pcm_wave::audio::{load_audio, AudioData, FileTap, Pacing};
use pcm_wave::config::WaveConfig;
use pcm_wave::timing::SystemClock;
use pcm_wave::visualizer::WaveVisualizer;

const TICK_HZ: f32 = 60.0;
const FRAMES_TO_SAVE: usize = 8;

fn save_frame(pixels: Vec<u8>, width: u32, height: u32, path: &Path) -> anyhow::Result<()> {
    let image = image::RgbaImage::from_raw(width, height, pixels)
        .context("frame size does not match the render target")?;
    image.save(path)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let audio = match std::env::args().nth(1) {
        Some(path) => {
            println!("Loading {}", path);
            load_audio(Path::new(&path)).with_context(|| format!("failed to decode {}", path))?
        }
        None => {
            println!("No input given, using a synthetic 120 BPM pulse track");
            AudioData {
                samples: generate_pulses(120.0, 44100, 4.0, 220.0),
                sample_rate: 44100,
                channels: 1,
            }
        }
    };
    println!(
        "  {:.2}s, {} Hz, {} channel(s)",
        audio.duration(),
        audio.sample_rate,
        audio.channels
    );

    let config = WaveConfig {
        width: 960,
        height: 540,
        callback_rate: audio.sample_rate as f32 / 4096.0,
        ..WaveConfig::default()
    };
    let (width, height) = (config.width, config.height);
    let duration = audio.duration() as f32;

    let mut visualizer = WaveVisualizer::new(config, Arc::new(SystemClock::new())).await?;
    if visualizer.renderer().is_none() {
        println!("No GPU renderer available; ticking headless");
    }

    let mut ingest = visualizer.ingest();
    let tap = FileTap::start(audio, 4096, Pacing::RealTime, move |buffer| {
        ingest.on_pcm_lossy(buffer);
    });

    let output_dir = PathBuf::from("wave_frames");
    std::fs::create_dir_all(&output_dir)?;

    let total_ticks = (duration * TICK_HZ) as usize;
    let save_every = (total_ticks / FRAMES_TO_SAVE).max(1);
    let mut saved = 0;

    for i in 0..total_ticks {
        if tap.is_finished() {
            break;
        }
        let report = visualizer.tick()?;
        if report.rendered && i % save_every == 0 {
            if let Some(pixels) = visualizer.read_frame()? {
                let path = output_dir.join(format!("frame_{:05}.png", i));
                save_frame(pixels, width, height, &path)?;
                saved += 1;
            }
        }
        if i % TICK_HZ as usize == 0 {
            let summary = visualizer.animation_state()?.summary();
            println!(
                "  tick {:5}: generation {}, max peak {:.3}",
                i, report.generation, summary.max_target_peak
            );
        }
        std::thread::sleep(Duration::from_secs_f32(1.0 / TICK_HZ));
    }

    tap.stop();
    let delivered = tap.join();
    println!(
        "Done: {} buffers tapped, {} ticks, {} frames saved to {}",
        delivered,
        visualizer.ticks(),
        saved,
        output_dir.display()
    );
    Ok(())
}
