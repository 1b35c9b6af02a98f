// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Benchmarks for the overflow queue.
//!
//! Measures:
//! - Fast-path enqueue/dequeue round-trip latency
//! - Fast-path throughput at different batch sizes
//! - Spill-path round-trip throughput (buffer intentionally undersized)

use std::{hint::black_box, time::Duration};

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use spillq::{BincodeCodec, Queue, QueueBuilder};
use tempfile::TempDir;

/// Burst sizes for throughput tests.
const BURST_SIZES: &[usize] = &[64, 256, 1024];

/// Create a queue that never spills (buffer larger than any burst).
fn fast_queue(temp_dir: &TempDir) -> Queue<BincodeCodec<u64>> {
    QueueBuilder::new(temp_dir.path(), "bench")
        .buffer_size(16 * 1024)
        .build(BincodeCodec::default())
        .expect("failed to create queue")
}

/// Create a queue that spills almost everything.
fn spilling_queue(temp_dir: &TempDir) -> Queue<BincodeCodec<u64>> {
    QueueBuilder::new(temp_dir.path(), "bench")
        .buffer_size(8)
        .timeout(Duration::from_millis(5))
        .build(BincodeCodec::default())
        .expect("failed to create queue")
}

fn bench_fast_path_roundtrip(c: &mut Criterion) {
    let temp_dir = TempDir::new().expect("temp dir");
    let queue = fast_queue(&temp_dir);
    let rx = queue.dequeue();

    c.bench_function("fast_path_roundtrip", |b| {
        b.iter(|| {
            queue.enqueue(black_box(42u64));
            black_box(rx.recv().unwrap());
        });
    });

    queue.close();
}

fn bench_fast_path_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("fast_path_burst");

    for &size in BURST_SIZES {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let temp_dir = TempDir::new().expect("temp dir");
            let queue = fast_queue(&temp_dir);
            let rx = queue.dequeue();

            b.iter(|| {
                for i in 0..size as u64 {
                    queue.enqueue(black_box(i));
                }
                for _ in 0..size {
                    black_box(rx.recv().unwrap());
                }
            });

            queue.close();
        });
    }

    group.finish();
}

fn bench_spill_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("spill_roundtrip");
    group.sample_size(10);

    for &size in BURST_SIZES {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let temp_dir = TempDir::new().expect("temp dir");
            let queue = spilling_queue(&temp_dir);
            let rx = queue.dequeue();

            b.iter(|| {
                for i in 0..size as u64 {
                    queue.enqueue(black_box(i));
                }
                for _ in 0..size {
                    black_box(rx.recv().unwrap());
                }
            });

            queue.close();
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_fast_path_roundtrip,
    bench_fast_path_burst,
    bench_spill_roundtrip
);
criterion_main!(benches);
