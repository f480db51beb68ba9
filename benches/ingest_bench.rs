//! Benchmarks for staging PCM pushes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pcm_wave::audio::synth::{generate_sine, to_i16, to_i32};
use pcm_wave::audio::{stage_buffer, PcmBuffer, StagingRegion};
use pcm_wave::config::{STAGING_CAPACITY, STAGING_SAMPLES};

const SAMPLE_RATE: u32 = 44100;

fn bench_stage_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("Stage Buffer");

    let tone = generate_sine(440.0, SAMPLE_RATE, 0.1, 0.8);
    let buffers = [
        ("float32", PcmBuffer::from_f32(tone.clone(), SAMPLE_RATE as f64)),
        ("int16", PcmBuffer::from_i16(to_i16(&tone), SAMPLE_RATE as f64)),
        ("int32", PcmBuffer::from_i32(to_i32(&tone), SAMPLE_RATE as f64)),
    ];
    let staging = StagingRegion::shared(STAGING_CAPACITY);

    for (name, buffer) in &buffers {
        group.throughput(Throughput::Elements(STAGING_SAMPLES as u64));
        group.bench_with_input(BenchmarkId::new("stage", name), buffer, |b, buffer| {
            b.iter(|| {
                black_box(stage_buffer(buffer, STAGING_SAMPLES, &staging, 0.0).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let staging = StagingRegion::shared(STAGING_CAPACITY);
    let tone = generate_sine(440.0, SAMPLE_RATE, 0.1, 0.8);
    stage_buffer(
        &PcmBuffer::from_f32(tone, SAMPLE_RATE as f64),
        STAGING_SAMPLES,
        &staging,
        0.0,
    )
    .unwrap();

    c.bench_function("snapshot_since", |b| {
        b.iter(|| {
            black_box(pcm_wave::audio::lock_staging(&staging).snapshot_since(0));
        });
    });
}

criterion_group!(benches, bench_stage_buffer, bench_snapshot);
criterion_main!(benches);
