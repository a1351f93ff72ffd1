//! Local store write benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tandem_bench::row;
use tandem_engine::{LocalStore, MemoryLocalStore};
use tandem_prefs::UserPreferences;
use tandem_store::{FileLocalStore, FileStoreConfig};
use tempfile::tempdir;

/// Benchmark upserts into the in-memory store.
fn bench_memory_upsert(c: &mut Criterion) {
    let store = MemoryLocalStore::<UserPreferences>::new();
    let mut at = 0u64;

    c.bench_function("upsert/memory", |b| {
        b.iter(|| {
            at += 1;
            store.upsert(black_box(row(at))).unwrap();
        });
    });
}

/// Benchmark upserts into the file store, with and without fsync.
fn bench_file_upsert(c: &mut Criterion) {
    let mut group = c.benchmark_group("upsert/file");

    for sync in [false, true] {
        let temp = tempdir().unwrap();
        let config = FileStoreConfig::new(temp.path()).with_sync_on_write(sync);
        let store = FileLocalStore::<UserPreferences>::open(config).unwrap();
        let mut at = 0u64;

        let name = if sync { "sync" } else { "no_sync" };
        group.bench_function(name, |b| {
            b.iter(|| {
                at += 1;
                store.upsert(black_box(row(at))).unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmark reading a row back from the file store.
fn bench_file_load(c: &mut Criterion) {
    let temp = tempdir().unwrap();
    let store = FileLocalStore::<UserPreferences>::open(FileStoreConfig::new(temp.path())).unwrap();
    let first = row(1);
    let owner = first.owner.clone();
    store.upsert(first).unwrap();

    c.bench_function("load/file", |b| {
        b.iter(|| black_box(store.load(&owner).unwrap()));
    });
}

criterion_group!(benches, bench_memory_upsert, bench_file_upsert, bench_file_load);

criterion_main!(benches);
