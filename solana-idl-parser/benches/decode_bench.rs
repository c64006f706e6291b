use base64::Engine;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use solana_idl_parser::{event_discriminator, EventDecoder, Idl};

fn bench_idl() -> Idl {
    serde_json::from_value(json!({
        "types": [
            { "name": "Reserve", "type": { "kind": "struct", "fields": [
                { "name": "mint", "type": "publicKey" },
                { "name": "liquidity", "type": "u128" }
            ]}}
        ],
        "events": [
            { "name": "Refresh", "fields": [
                { "name": "slot", "type": "u64" },
                { "name": "reserves", "type": { "vec": { "defined": "Reserve" } } }
            ]}
        ]
    }))
    .unwrap()
}

fn encode_refresh(reserves: usize) -> String {
    let mut record = event_discriminator("Refresh").to_vec();
    record.extend_from_slice(&42u64.to_le_bytes());
    record.extend_from_slice(&(reserves as u32).to_le_bytes());
    for i in 0..reserves {
        record.extend_from_slice(&[i as u8; 32]);
        record.extend_from_slice(&(i as u128).to_le_bytes());
    }
    base64::engine::general_purpose::STANDARD.encode(record)
}

fn decoder_benchmark(c: &mut Criterion) {
    let decoder = EventDecoder::from_idl(&bench_idl()).unwrap();

    let single = encode_refresh(1);
    let large = encode_refresh(100);

    let mut group = c.benchmark_group("event_decoder");

    group.bench_function("decode_single_reserve", |b| {
        b.iter(|| {
            decoder.decode(black_box(&single)).unwrap();
        })
    });

    group.bench_function("decode_100_reserves", |b| {
        b.iter(|| {
            decoder.decode(black_box(&large)).unwrap();
        })
    });

    group.finish();
}

criterion_group!(benches, decoder_benchmark);
criterion_main!(benches);
