// SPDX-License-Identifier: Apache-2.0 OR MIT
//! **Enqueue Policy Benchmarks**
//!
//! Measures producer-side cost of the three enqueue paths of `BoundedQueue`
//! and the end-to-end cost of logging through a running `WorkerPool`.
//!
//! ```bash
//! cargo bench --bench enqueue_policies
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use logdispatch::logging::{
    AsyncLogger, BoundedQueue, NullSink, OverflowPolicy, PoolConfig, WorkerPool,
};
use std::sync::Arc;
use std::time::Duration;

const BATCH: u64 = 1000;

/// Producer cost with no consumer: the queue is emptied between batches
fn benchmark_queue_enqueue(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_enqueue");
    group.throughput(Throughput::Elements(BATCH));

    let queue = BoundedQueue::new(BATCH as usize);
    group.bench_function("blocking", |b| {
        b.iter(|| {
            for i in 0..BATCH {
                queue.enqueue_blocking(black_box(i));
            }
            queue.clear();
        })
    });

    // Half the batch lands on a full queue and evicts
    let queue = BoundedQueue::new(BATCH as usize / 2);
    group.bench_function("overwrite", |b| {
        b.iter(|| {
            for i in 0..BATCH {
                queue.enqueue_overwrite(black_box(i));
            }
            queue.clear();
        })
    });

    // Half the batch is refused
    let queue = BoundedQueue::new(BATCH as usize / 2);
    group.bench_function("if_space", |b| {
        b.iter(|| {
            for i in 0..BATCH {
                let _ = queue.enqueue_if_space(black_box(i));
            }
            queue.clear();
        })
    });
    group.finish();
}

/// Log, then wait for the workers to write the batch
fn benchmark_logger_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("logger_throughput");
    group.throughput(Throughput::Elements(BATCH));
    group.measurement_time(Duration::from_secs(5));

    for policy in [
        OverflowPolicy::Block,
        OverflowPolicy::OverrunOldest,
        OverflowPolicy::DropIfFull,
    ] {
        let pool = match WorkerPool::spawn(PoolConfig::default().with_capacity(256)) {
            Ok(pool) => pool,
            Err(e) => panic!("cannot start worker pool: {}", e),
        };
        let logger = AsyncLogger::new("bench", Arc::clone(&pool), vec![Arc::new(NullSink::new())]);
        logger.set_overflow_policy(policy);

        group.bench_with_input(BenchmarkId::from_parameter(policy), &logger, |b, logger| {
            b.iter(|| {
                for i in 0..BATCH {
                    logger.info(black_box(if i % 2 == 0 { "even" } else { "odd" }));
                }
                let _ = logger.flush();
            })
        });
        pool.shutdown();
    }
    group.finish();
}

criterion_group!(benches, benchmark_queue_enqueue, benchmark_logger_throughput);
criterion_main!(benches);
