use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nippy_rs::{Compressor, Encryptor, FreezeConfig, Password, ThawConfig, Value};

fn sample_value(count: usize) -> Value {
    Value::Vector(
        (0..count)
            .map(|i| {
                Value::Map(
                    [
                        (Value::Str("id".into()), Value::Int((i as i64).into())),
                        (Value::Str("name".into()), Value::Str(format!("entry-{i}"))),
                        (Value::Str("active".into()), Value::Bool(i % 2 == 0)),
                    ]
                    .into_iter()
                    .collect(),
                )
            })
            .collect(),
    )
}

fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_trip");

    for count in [10, 100, 1_000] {
        let value = sample_value(count);
        let plain = FreezeConfig { compressor: Compressor::None, ..Default::default() };
        let frozen = nippy_rs::freeze(&value, &plain).unwrap();

        group.throughput(Throughput::Bytes(frozen.len() as u64));
        group.bench_with_input(BenchmarkId::new("freeze", count), &value, |b, value| {
            b.iter(|| black_box(nippy_rs::freeze(value, &plain).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("thaw", count), &frozen, |b, frozen| {
            b.iter(|| black_box(nippy_rs::thaw(frozen, &ThawConfig::default()).unwrap()));
        });
    }

    group.finish();
}

fn bench_compressors(c: &mut Criterion) {
    let mut group = c.benchmark_group("compressors");
    let value = sample_value(500);

    for compressor in [Compressor::None, Compressor::Lz4, Compressor::Zstd { level: 3 }, Compressor::Snappy] {
        let config = FreezeConfig { compressor, ..Default::default() };
        group.bench_function(format!("{compressor:?}"), |b| {
            b.iter(|| black_box(nippy_rs::freeze(&value, &config).unwrap()));
        });
    }

    group.finish();
}

fn bench_encryption(c: &mut Criterion) {
    let mut group = c.benchmark_group("encryption");
    let value = sample_value(500);
    let password = Password::cached("bench-password");

    for encryptor in [Encryptor::Gcm, Encryptor::Cbc] {
        let config = FreezeConfig { encryptor, password: Some(password.clone()), ..Default::default() };
        group.bench_function(format!("{encryptor:?}"), |b| {
            b.iter(|| black_box(nippy_rs::freeze(&value, &config).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_round_trip, bench_compressors, bench_encryption);
criterion_main!(benches);
