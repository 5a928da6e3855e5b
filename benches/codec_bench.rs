//! Performance benchmarks for DoorCodec.
//!
//! The hub decodes every datagram on its receive task, so decoding a busy
//! site's heartbeat traffic must stay well below the 1 s sweep tick.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench codec_bench
//! ```

use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use doorlink_core::{Channel, ModuleId, Point, PointState};
use doorlink_protocol::{ChannelReport, DoorCodec, Message, MessageParser};
use std::hint::black_box;
use tokio_util::codec::Encoder;

fn module_id() -> ModuleId {
    ModuleId::new("D1").unwrap()
}

fn create_heartbeat() -> Message {
    let report = ChannelReport::new(false, true);
    Message::heartbeat(module_id(), report, report)
}

fn create_event() -> Message {
    Message::event(module_id(), Channel::D0, Point::Door, PointState::Open)
}

/// Benchmark encoding a heartbeat.
fn bench_encode_heartbeat(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_heartbeat");
    group.throughput(Throughput::Elements(1));

    let msg = create_heartbeat();

    group.bench_function("encode_heartbeat", |b| {
        b.iter(|| {
            let mut codec = DoorCodec::new();
            let buffer = codec.encode_datagram(black_box(&msg)).unwrap();
            black_box(buffer);
        });
    });

    group.finish();
}

/// Benchmark decoding single-line datagrams.
fn bench_decode_datagram(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_datagram");
    group.throughput(Throughput::Elements(1));

    let mut codec = DoorCodec::new();
    let heartbeat = codec.encode_datagram(&create_heartbeat()).unwrap().freeze();
    let event = codec.encode_datagram(&create_event()).unwrap().freeze();

    group.bench_function("heartbeat", |b| {
        b.iter(|| {
            let mut codec = DoorCodec::new();
            black_box(codec.decode_datagram(black_box(&heartbeat)).unwrap());
        });
    });

    group.bench_function("event", |b| {
        b.iter(|| {
            let mut codec = DoorCodec::new();
            black_box(codec.decode_datagram(black_box(&event)).unwrap());
        });
    });

    group.finish();
}

/// Benchmark the parser on malformed input, which is skipped or kept opaque.
fn bench_parse_malformed(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_malformed");
    group.throughput(Throughput::Elements(1));

    group.bench_function("malformed_event", |b| {
        b.iter(|| black_box(MessageParser::parse(black_box("D1 EVENT D0 DOOR LOCKED"))));
    });

    group.bench_function("short_line", |b| {
        b.iter(|| black_box(MessageParser::parse(black_box("D1"))));
    });

    group.finish();
}

/// Benchmark decoding datagrams that carry several lines.
fn bench_decode_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_batch");

    for batch_size in [1, 4, 8].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));

        let mut codec = DoorCodec::new();
        let mut encoded = BytesMut::new();
        for _ in 0..*batch_size {
            codec.encode(&create_heartbeat(), &mut encoded).unwrap();
        }
        let encoded_bytes = encoded.freeze();

        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, _| {
                b.iter(|| {
                    let mut codec = DoorCodec::new();
                    let messages = codec.decode_datagram(&encoded_bytes).unwrap();
                    black_box(messages);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_encode_heartbeat,
    bench_decode_datagram,
    bench_parse_malformed,
    bench_decode_batch
);
criterion_main!(benches);
