mod common;

use common::generate_messages;
use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use substation::prelude::*;

/// Benchmark keyed pushes with different partition counts
fn bench_partitioned_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("partitioned_push");

    for num_keys in [1, 16, 256, 4_096] {
        group.bench_with_input(BenchmarkId::from_parameter(num_keys), &num_keys, |b, &num_keys| {
            b.iter_batched(
                || {
                    let keys: Vec<String> = (0..num_keys).map(|k| format!("key-{k}")).collect();
                    (PartitionedBuffer::new(BufferConfig::new(100, 0)), keys, generate_messages(10_000, 1))
                },
                |(mut buffer, keys, messages)| {
                    for (i, message) in messages.into_iter().enumerate() {
                        black_box(buffer.push(&keys[i % keys.len()], message).unwrap());
                    }
                    buffer
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark draining buffers that hold many partial batches
fn bench_partitioned_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("partitioned_drain");

    for num_keys in [16, 256, 4_096] {
        group.bench_with_input(BenchmarkId::from_parameter(num_keys), &num_keys, |b, &num_keys| {
            b.iter_batched(
                || {
                    let mut buffer = PartitionedBuffer::new(BufferConfig::new(1_000, 0));
                    for (i, message) in generate_messages(10_000, 1).into_iter().enumerate() {
                        buffer.push(&format!("key-{}", i % num_keys), message).unwrap();
                    }
                    buffer
                },
                |mut buffer| black_box(buffer.drain()),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark size-bounded batching where the byte limit triggers flushes
fn bench_size_limited_batches(c: &mut Criterion) {
    let mut group = c.benchmark_group("size_limited_batches");

    for max_size in [1_024, 64 * 1_024, 1_024 * 1_024] {
        group.bench_with_input(BenchmarkId::from_parameter(max_size), &max_size, |b, &max_size| {
            b.iter_batched(
                || generate_messages(10_000, 1),
                |messages| {
                    let mut buffer = PartitionedBuffer::new(BufferConfig::new(0, max_size));
                    let mut flushed = 0;
                    for message in messages {
                        if buffer.push("", message).unwrap().is_some() {
                            flushed += 1;
                        }
                    }
                    black_box((flushed, buffer.drain()))
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_partitioned_push,
    bench_partitioned_drain,
    bench_size_limited_batches
);
criterion_main!(benches);
