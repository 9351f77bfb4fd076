//! Journal benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use entigraph_bench::random_data;
use entigraph_storage::{FileJournal, InMemoryJournal, Journal};
use tempfile::TempDir;

/// Benchmark in-memory journal appends.
fn bench_inmemory_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("inmemory_append");

    for size in [64, 256, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut journal = Journal::new(Box::new(InMemoryJournal::new()), false);
            let data = random_data(size);

            b.iter(|| {
                let offset = journal.append(black_box(&data)).unwrap();
                black_box(offset);
            });
        });
    }

    group.finish();
}

/// Benchmark file journal appends with and without fsync.
fn bench_file_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_append");
    group.sample_size(20);

    for sync in [false, true] {
        let label = if sync { "sync" } else { "nosync" };
        group.throughput(Throughput::Bytes(1024));
        group.bench_function(label, |b| {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("bench.journal");
            let mut journal = Journal::new(Box::new(FileJournal::open(&path).unwrap()), sync);
            let data = random_data(1024);

            b.iter(|| {
                let offset = journal.append(black_box(&data)).unwrap();
                black_box(offset);
            });
        });
    }

    group.finish();
}

/// Benchmark recovery scans over journals of increasing length.
fn bench_recover(c: &mut Criterion) {
    let mut group = c.benchmark_group("recover");

    for frames in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*frames as u64));
        group.bench_with_input(BenchmarkId::from_parameter(frames), frames, |b, &frames| {
            let backend = InMemoryJournal::new();
            let mut journal = Journal::new(Box::new(backend.clone()), false);
            for _ in 0..frames {
                journal.append(&random_data(256)).unwrap();
            }

            b.iter(|| {
                let mut journal = Journal::new(Box::new(backend.clone()), false);
                let recovered = journal.recover().unwrap();
                black_box(recovered.len());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_inmemory_append, bench_file_append, bench_recover);
criterion_main!(benches);
