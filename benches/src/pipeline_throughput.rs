mod common;

use std::sync::Arc;

use common::{AGGREGATE_CONFIG, STATELESS_CONFIG, generate_lines, generate_messages, load};
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use futures::io::Cursor;
use substation::prelude::*;
use tokio::runtime::Runtime;

/// Benchmark the stage graph alone with different dataset sizes
fn bench_executor_dataset_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("executor_sizes");
    let runtime = Runtime::new().unwrap();
    let sub = load(STATELESS_CONFIG, 4);
    let executor = Arc::new(sub.executor());

    for num_messages in [1_000, 10_000, 100_000] {
        group.throughput(Throughput::Elements(num_messages as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_messages),
            &num_messages,
            |b, &num_messages| {
                b.to_async(&runtime).iter_batched(
                    || generate_messages(num_messages, 16),
                    |messages| {
                        let executor = Arc::clone(&executor);
                        async move {
                            let output = executor
                                .run(messages, CancellationToken::new())
                                .await
                                .unwrap();
                            black_box(output.len());
                        }
                    },
                    BatchSize::LargeInput,
                );
            },
        );
    }

    group.finish();
}

/// Benchmark worker pool scaling on a fixed dataset
fn bench_executor_concurrency(c: &mut Criterion) {
    let mut group = c.benchmark_group("executor_concurrency");
    let runtime = Runtime::new().unwrap();
    let num_messages = 20_000;
    group.throughput(Throughput::Elements(num_messages as u64));

    for concurrency in [1, 2, 4, 8, 16] {
        let executor = Arc::new(load(STATELESS_CONFIG, concurrency).executor());
        group.bench_with_input(
            BenchmarkId::from_parameter(concurrency),
            &concurrency,
            |b, _| {
                b.to_async(&runtime).iter_batched(
                    || generate_messages(num_messages, 16),
                    |messages| {
                        let executor = Arc::clone(&executor);
                        async move {
                            black_box(executor.run(messages, CancellationToken::new()).await.unwrap());
                        }
                    },
                    BatchSize::LargeInput,
                );
            },
        );
    }

    group.finish();
}

/// Benchmark the full source → stages → sink path, aggregation included
fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    let runtime = Runtime::new().unwrap();

    for (name, config) in [("stateless", STATELESS_CONFIG), ("aggregate", AGGREGATE_CONFIG)] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &config, |b, &config| {
            b.to_async(&runtime).iter_batched(
                || (load(config, 4), generate_lines(10_000, 32)),
                |(sub, lines)| async move {
                    let sink = CollectSink::new();
                    let source = LineSource::from_reader(Cursor::new(lines));
                    sub.run(source, sink.clone(), CancellationToken::new())
                        .await
                        .unwrap();
                    black_box(sink.messages().len());
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_executor_dataset_sizes,
    bench_executor_concurrency,
    bench_end_to_end
);
criterion_main!(benches);
