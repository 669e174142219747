use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gossip_protocol::network::{decode, encode, Envelope, MsgType};

fn sample_envelope() -> Envelope {
    Envelope::new(
        "bench_msg_0001",
        MsgType::Gossip,
        "bench-node",
        "127.0.0.1:9001",
        1_700_000_000_000,
        5,
        serde_json::json!({"payload": "x".repeat(128)}),
    )
}

fn bench_encode(c: &mut Criterion) {
    let envelope = sample_envelope();
    c.bench_function("codec_encode", |b| {
        b.iter(|| encode(black_box(&envelope)).unwrap());
    });
}

fn bench_decode(c: &mut Criterion) {
    let envelope = sample_envelope();
    let bytes = encode(&envelope).unwrap();
    c.bench_function("codec_decode", |b| {
        b.iter(|| decode(black_box(&bytes)).unwrap());
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
