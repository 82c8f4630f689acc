//! Codec benchmarks for netsdr-protocol.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use netsdr_protocol::{codec, samples, ControlItemCode, MessageType};

fn bench_encode_control(c: &mut Criterion) {
    let payload = [0x00, 0x40, 0x42, 0x0F, 0x00, 0x00];

    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("control_6B", |b| {
        b.iter(|| {
            codec::encode_control_item(
                black_box(MessageType::SetControlItem),
                black_box(ControlItemCode::ReceiverFrequency),
                black_box(&payload),
            )
        })
    });
    group.finish();
}

fn bench_decode_data(c: &mut Criterion) {
    // Typical NetSDR 16-bit IQ datagram: 2-byte sequence number + 1024 bytes of samples
    let encoded = codec::encode_data_item(MessageType::DataItem0, &vec![0u8; 1026]).unwrap();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(encoded.len() as u64));
    group.bench_function("data_1028B", |b| b.iter(|| codec::decode(black_box(&encoded))));
    group.finish();
}

fn bench_unpack(c: &mut Criterion) {
    let body = vec![0x5Au8; 1024];

    let mut group = c.benchmark_group("unpack");
    group.throughput(Throughput::Bytes(body.len() as u64));
    group.bench_function("16bit_1024B", |b| {
        b.iter(|| {
            samples::unpack(16, black_box(&body))
                .unwrap()
                .fold(0i64, |acc, s| acc + i64::from(s))
        })
    });
    group.finish();
}

criterion_group!(benches, bench_encode_control, bench_decode_data, bench_unpack);
criterion_main!(benches);
