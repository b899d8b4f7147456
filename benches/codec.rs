use bytes::Bytes;
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use stmp::{BinaryCodec, Context, Encoding, MessageParams, TextCodec};

fn bench_binary(c: &mut Criterion) {
    let mut group = c.benchmark_group("binary");

    for size in [64usize, 1024, 64 * 1024] {
        let mut codec = BinaryCodec::new();
        let msg = codec.build(
            MessageParams::request(1)
                .encoding(Encoding::Raw)
                .payload(vec![0u8; size]),
        );
        let encoded = codec.serialize(&msg).unwrap();
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_function(format!("serialize_{size}b"), |b| {
            b.iter(|| {
                black_box(codec.serialize(&msg).unwrap());
            });
        });

        group.bench_function(format!("parse_{size}b"), |b| {
            let mut parser = BinaryCodec::new();
            b.iter(|| {
                black_box(parser.parse(encoded.clone()).unwrap());
            });
        });

        // Worst case for span assembly: every span crosses chunks.
        let pieces: Vec<Bytes> = encoded.chunks(3).map(Bytes::copy_from_slice).collect();
        group.bench_function(format!("parse_chunked_{size}b"), |b| {
            let mut parser = BinaryCodec::new();
            b.iter(|| {
                for piece in &pieces {
                    black_box(parser.parse(piece.clone()).unwrap());
                }
            });
        });
    }

    group.finish();
}

fn bench_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("text");

    let mut codec = TextCodec::new();
    let payload = "x".repeat(1024);
    let msg = codec.build(
        MessageParams::notify(0x1234_5678)
            .encoding(Encoding::Json)
            .payload(payload.as_str()),
    );
    let line = codec.serialize(&msg).unwrap().header().to_owned();
    group.throughput(Throughput::Bytes(1024));

    group.bench_function("serialize_1kb", |b| {
        b.iter(|| {
            black_box(codec.serialize(&msg).unwrap());
        });
    });

    group.bench_function("parse_1kb", |b| {
        let mut parser = TextCodec::new();
        b.iter(|| {
            black_box(parser.parse(line.as_str()).unwrap());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_binary, bench_text);
criterion_main!(benches);
