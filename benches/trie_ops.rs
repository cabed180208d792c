// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Burst trie operation benchmarks.
//!
//! Measures performance of:
//! - insert() - Insert a fresh key
//! - get() - Point lookup by key
//! - get_next() - Sequential cursor scan
//! - delete() - Remove a key's sole payload
//!
//! ## Performance Targets
//! - insert: < 1us amortized at 100k keys (pre-burst container depths)
//! - get: < 1us at 100k keys
//! - get_next: < 200ns amortized per step over a full scan

use burstdb::{BurstTrie, Cursor, Key, KeyKind};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn populated_trie(n: i64) -> BurstTrie {
    let mut trie = BurstTrie::new(KeyKind::Int64);
    for i in 0..n {
        trie.insert(Key::Int64(i), format!("payload-{i}").into_bytes())
            .unwrap();
    }
    trie
}

/// Benchmark insert() into a growing Int64 trie.
fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for size in [1_000, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &n| {
            b.iter_batched(
                || populated_trie(n),
                |mut trie| {
                    black_box(trie.insert(Key::Int64(n), b"new".to_vec()).unwrap());
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark get() point lookups.
///
/// Target: < 1us at 100k keys
fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");

    for size in [1_000, 10_000, 100_000].iter() {
        let trie = populated_trie(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &n| {
            b.iter(|| {
                black_box(trie.get(&Key::Int64(n / 2)).0.unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark a full ascending get_next() drain.
fn bench_get_next_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_next_scan");
    group.sample_size(20);

    for size in [1_000, 10_000, 100_000].iter() {
        let trie = populated_trie(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut cursor = Cursor::Unset;
                loop {
                    let (result, next) = trie.get_next(&cursor);
                    cursor = next;
                    match result {
                        Ok(record) => {
                            black_box(record);
                        }
                        Err(_) => break,
                    }
                }
            });
        });
    }

    group.finish();
}

/// Benchmark delete() of an existing key.
fn bench_delete(c: &mut Criterion) {
    let mut group = c.benchmark_group("delete");

    for size in [1_000, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &n| {
            b.iter_batched(
                || populated_trie(n),
                |mut trie| {
                    black_box(trie.delete(&Key::Int64(n / 2), None).unwrap());
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_insert, bench_get, bench_get_next_scan, bench_delete);
criterion_main!(benches);
