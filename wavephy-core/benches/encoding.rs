use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use wavephy_core::channel::ChannelDescriptor;
use wavephy_core::encoder::Transmitter;

fn benchmark_baseband_frame(c: &mut Criterion) {
    let tx = Transmitter::new(ChannelDescriptor::default());
    let payload = vec![0xA5u8; 256];

    c.bench_function("baseband_frame_256_octets", |b| {
        b.iter(|| tx.baseband_frame(black_box(&payload), black_box(0xb)).unwrap())
    });
}

fn benchmark_baseband_frame_by_payload_size(c: &mut Criterion) {
    let tx = Transmitter::new(ChannelDescriptor::default());
    let mut group = c.benchmark_group("baseband_frame_by_size");

    for &size in [16usize, 64, 256, 1024, 1500].iter() {
        let payload = vec![0x3Cu8; size];
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| tx.baseband_frame(black_box(&payload), black_box(0xb)).unwrap())
        });
    }
    group.finish();
}

fn benchmark_stereo_clip_and_upsampling(c: &mut Criterion) {
    let payload = vec![0x7Eu8; 256];

    c.bench_function("encode_stereo_clip_256_octets", |b| {
        b.iter(|| {
            let mut tx = Transmitter::new(ChannelDescriptor::default());
            tx.encode_stereo_clip(black_box(&payload), black_box(0xb)).unwrap()
        })
    });
}

criterion_group!(
    benches,
    benchmark_baseband_frame,
    benchmark_baseband_frame_by_payload_size,
    benchmark_stereo_clip_and_upsampling
);
criterion_main!(benches);
