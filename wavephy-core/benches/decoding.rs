use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use wavephy_core::channel::ChannelDescriptor;
use wavephy_core::config::PhyConfig;
use wavephy_core::encoder::Transmitter;
use wavephy_core::frame_decoder::FrameDecoder;
use wavephy_core::streaming::StreamingReceiver;

fn benchmark_frame_decoder(c: &mut Criterion) {
    let tx = Transmitter::new(ChannelDescriptor::default());
    let payload = vec![0x5Au8; 256];
    let baseband = tx.baseband_frame(&payload, 0xb).unwrap();

    c.bench_function("frame_decoder_256_octets", |b| {
        b.iter(|| {
            let mut decoder = FrameDecoder::new(1500);
            decoder.feed(black_box(&baseband));
            let mut outcome = None;
            while outcome.is_none() {
                outcome = decoder.poll();
            }
            outcome
        })
    });
}

fn benchmark_frame_decoder_by_payload_size(c: &mut Criterion) {
    let tx = Transmitter::new(ChannelDescriptor::default());
    let mut group = c.benchmark_group("frame_decoder_by_size");

    for &size in [16usize, 64, 256, 1024, 1500].iter() {
        let payload = vec![0x99u8; size];
        let baseband = tx.baseband_frame(&payload, 0xb).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut decoder = FrameDecoder::new(1500);
                decoder.feed(black_box(&baseband));
                let mut outcome = None;
                while outcome.is_none() {
                    outcome = decoder.poll();
                }
                outcome
            })
        });
    }
    group.finish();
}

fn benchmark_streaming_receiver(c: &mut Criterion) {
    let config = PhyConfig::default();
    let mut tx = Transmitter::new(config.channel);
    let payload = vec![0x12u8; 256];
    let stereo = tx.encode_stereo_clip(&payload, config.rate_code).unwrap();
    let mono: Vec<f32> = stereo.iter().map(|&(l, _r)| l).collect();

    c.bench_function("streaming_receiver_full_clip", |b| {
        b.iter(|| {
            let mut rx = StreamingReceiver::new(config.clone());
            let mut outcomes = Vec::new();
            for chunk in mono.chunks(512) {
                outcomes.extend(rx.process(black_box(chunk)));
            }
            outcomes
        })
    });
}

criterion_group!(
    benches,
    benchmark_frame_decoder,
    benchmark_frame_decoder_by_payload_size,
    benchmark_streaming_receiver
);
criterion_main!(benches);
