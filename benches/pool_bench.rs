//! Benchmarks for the queue and the full pool.
//!
//! - Raw queue enqueue/dequeue throughput
//! - End-to-end drain with varying worker counts
//! - Retry overhead

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use tokio::runtime::Runtime;
use tqwp::prelude::*;

const TASKS: u64 = 1_000;

struct Noop;

#[async_trait]
impl Task for Noop {
    async fn process(&mut self) -> TaskResult {
        Ok(())
    }
}

/// Fails once, then succeeds
struct FailOnce {
    failed: bool,
    retry: RetryState,
}

#[async_trait]
impl Task for FailOnce {
    async fn process(&mut self) -> TaskResult {
        if !self.failed {
            self.failed = true;
            return Err(TaskError::new("first attempt"));
        }
        Ok(())
    }

    fn retry_state(&mut self) -> Option<&mut dyn Retryable> {
        Some(&mut self.retry)
    }
}

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn bench_queue(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("queue");
    group.throughput(Throughput::Elements(TASKS));

    group.bench_function("enqueue_dequeue", |b| {
        b.to_async(&rt).iter(|| async {
            let queue = BoundedQueue::with_config(QueueConfig::with_capacity(TASKS as usize));
            for _ in 0..TASKS {
                queue.enqueue(QueuedTask::new(Box::new(Noop))).await.unwrap();
            }
            queue.close().await;
            while let Some(task) = queue.dequeue().await {
                black_box(task);
            }
        });
    });

    group.finish();
}

fn bench_pool(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("pool_drain");
    group.throughput(Throughput::Elements(TASKS));

    for workers in [1usize, 4, 16] {
        group.bench_with_input(BenchmarkId::new("noop", workers), &workers, |b, &workers| {
            b.to_async(&rt).iter(|| async move {
                let config = PoolConfig::default().with_workers(workers).with_capacity(256);
                let pool = WorkerPool::builder(config).logger(NoopLogger).build().unwrap();
                pool.start().await.unwrap();
                for _ in 0..TASKS {
                    pool.enqueue_task(Noop).await.unwrap();
                }
                pool.stop().await.unwrap();
                black_box(pool.summary().unwrap());
            });
        });
    }

    group.bench_function("retry_once", |b| {
        b.to_async(&rt).iter(|| async {
            let config = PoolConfig::default().with_workers(4).with_max_retries(1);
            let pool = WorkerPool::builder(config).logger(NoopLogger).build().unwrap();
            pool.start().await.unwrap();
            for _ in 0..TASKS {
                pool.enqueue_task(FailOnce {
                    failed: false,
                    retry: RetryState::new(),
                })
                .await
                .unwrap();
            }
            pool.stop().await.unwrap();
            black_box(pool.summary().unwrap());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_queue, bench_pool);
criterion_main!(benches);
