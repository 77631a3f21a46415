use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use vortex::domains::message::{Envelope, MessageBody};

fn sample_line() -> Vec<u8> {
    let body = json!({
        "type": "broadcast",
        "msg_id": 42,
        "message": 1234,
        "topology": {"n1": ["n2", "n3"], "n2": ["n1"], "n3": ["n1"]},
    });
    Envelope::new("n1", "n2", &body).unwrap().encode().unwrap()
}

fn bench_envelope_codec(c: &mut Criterion) {
    let line = sample_line();
    let envelope = Envelope::decode(&line).unwrap();

    let mut group = c.benchmark_group("envelope");
    group.bench_function("decode", |b| {
        b.iter(|| Envelope::decode(black_box(&line)).unwrap())
    });
    group.bench_function("decode_header", |b| {
        b.iter(|| {
            let envelope = Envelope::decode(black_box(&line)).unwrap();
            let header: MessageBody = envelope.header().unwrap();
            header.msg_id
        })
    });
    group.bench_function("encode", |b| {
        b.iter(|| black_box(&envelope).encode().unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_envelope_codec);
criterion_main!(benches);
