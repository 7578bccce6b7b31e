use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use timber::dataset::{decode, Dataset, RawValue, Record};
use timber::retrieval::{bucketize, TimeScaling};
use timber::{DataType, Instant, TimeFormat};

fn create_scalar_dataset(count: usize) -> Dataset {
    let records = (0..count)
        .map(|i| {
            Record::new(
                Instant::new(1_500_000_000 + i as i64, (i as u32 % 1000) * 1_000_000),
                RawValue::Double(100.0 + i as f64 * 0.5),
            )
        })
        .collect();
    Dataset::new("BENCH:SCALAR", DataType::Numeric, records)
}

fn create_vector_dataset(count: usize, width: usize) -> Dataset {
    let records = (0..count)
        .map(|i| {
            Record::new(
                Instant::new(1_500_000_000 + i as i64, 0),
                RawValue::DoubleVector((0..width).map(|j| (i * j) as f64).collect()),
            )
        })
        .collect();
    Dataset::new("BENCH:VECTOR", DataType::VectorNumeric, records)
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for size in [100, 1000, 10000].iter() {
        let scalar = create_scalar_dataset(*size);
        group.bench_with_input(BenchmarkId::new("scalar_unix", size), size, |b, _| {
            b.iter(|| black_box(decode(&scalar, DataType::Numeric, TimeFormat::Unix)))
        });
        group.bench_with_input(BenchmarkId::new("scalar_calendar", size), size, |b, _| {
            b.iter(|| black_box(decode(&scalar, DataType::Numeric, TimeFormat::Calendar)))
        });

        let vector = create_vector_dataset(*size, 64);
        group.bench_with_input(BenchmarkId::new("vector_64", size), size, |b, _| {
            b.iter(|| black_box(decode(&vector, DataType::VectorNumeric, TimeFormat::Unix)))
        });
    }

    group.finish();
}

fn bench_bucketize(c: &mut Criterion) {
    let mut group = c.benchmark_group("bucketize");
    let scaling = TimeScaling::parse("1", "MINUTE", "AVG").unwrap();

    for size in [1000, 10000, 100000].iter() {
        let start = Instant::new(1_500_000_000, 0);
        let samples: Vec<(Instant, f64)> = (0..*size)
            .map(|i| (start.add_seconds(i as i64), i as f64))
            .collect();
        let end = start.add_seconds(*size as i64);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(bucketize(&samples, start, end, &scaling)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_bucketize);
criterion_main!(benches);
