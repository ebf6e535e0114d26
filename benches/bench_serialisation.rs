use std::time::Duration;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use fedgraph::{
    PropertyValue,
    serialisation::{
        CompactRawLongSerialiser, Serialiser, StringSerialiser, TypeSubTypeValueSerialiser,
        compact_raw::{encode_long, read_long},
    },
    value::TypeSubTypeValue,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

const SEED: u64 = 0x5E71;
const SAMPLE_SIZE: usize = 30;
const WARM_UP: Duration = Duration::from_millis(300);
const MEASURE: Duration = Duration::from_millis(500);

fn batch_size() -> usize {
    #[cfg(feature = "bench-ci")]
    {
        1_000
    }
    #[cfg(not(feature = "bench-ci"))]
    {
        50_000
    }
}

fn random_longs(bits: u32) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(SEED + u64::from(bits));
    let bound = 1i64 << (bits - 1);
    (0..batch_size())
        .map(|_| rng.gen_range(-bound..bound))
        .collect()
}

fn bench_compact_long(c: &mut Criterion) {
    let mut group = c.benchmark_group("compact_long");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    for bits in [8u32, 32, 63] {
        let values = random_longs(bits);
        let encoded: Vec<Vec<u8>> = values.iter().map(|v| encode_long(*v)).collect();
        group.bench_function(BenchmarkId::new("encode", bits), |b| {
            b.iter(|| {
                for value in &values {
                    black_box(encode_long(*value));
                }
            });
        });
        group.bench_function(BenchmarkId::new("decode", bits), |b| {
            b.iter(|| {
                for bytes in &encoded {
                    black_box(read_long(bytes).expect("decode"));
                }
            });
        });
        let serialiser = CompactRawLongSerialiser;
        let wrapped: Vec<PropertyValue> = values.iter().copied().map(PropertyValue::Long).collect();
        group.bench_function(BenchmarkId::new("serialiser", bits), |b| {
            b.iter(|| {
                for value in &wrapped {
                    black_box(serialiser.serialise(value).expect("serialise"));
                }
            });
        });
    }
    group.finish();
}

fn bench_text_codecs(c: &mut Criterion) {
    let mut group = c.benchmark_group("text_codecs");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    let mut rng = StdRng::seed_from_u64(SEED);
    let strings: Vec<PropertyValue> = (0..batch_size())
        .map(|_| PropertyValue::String(format!("vertex-{}", rng.gen_range(0..1_000_000u32))))
        .collect();
    let triples: Vec<PropertyValue> = (0..batch_size())
        .map(|i| {
            PropertyValue::from(TypeSubTypeValue::new(
                "type",
                format!("sub\0{}", i % 7),
                format!("value-{}", rng.gen_range(0..1_000u32)),
            ))
        })
        .collect();
    group.bench_function("string", |b| {
        b.iter(|| {
            for value in &strings {
                let bytes = StringSerialiser.serialise(value).expect("serialise");
                black_box(StringSerialiser.deserialise(&bytes).expect("deserialise"));
            }
        });
    });
    group.bench_function("type_sub_type_value", |b| {
        b.iter(|| {
            for value in &triples {
                let bytes = TypeSubTypeValueSerialiser.serialise(value).expect("serialise");
                black_box(TypeSubTypeValueSerialiser.deserialise(&bytes).expect("deserialise"));
            }
        });
    });
    group.finish();
}

criterion_group!(
    name = serialisation_benches;
    config = Criterion::default();
    targets = bench_compact_long, bench_text_codecs
);
criterion_main!(serialisation_benches);
