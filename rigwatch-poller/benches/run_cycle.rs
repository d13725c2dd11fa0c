use std::sync::Arc;

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rigwatch_adapters::Fetcher;
use rigwatch_poller::{Aggregator, SnapshotStore};
use rigwatch_types::{FetchError, MetricsSnapshot, Source};

/// Answers instantly so the bench measures fan-out and collection only
struct Instant;

#[async_trait]
impl Fetcher for Instant {
    async fn fetch(&self, source: &Source) -> MetricsSnapshot {
        let mut snapshot = MetricsSnapshot::failed(source, FetchError::Timeout, "t");
        snapshot.fetch_error = None;
        snapshot
    }
}

fn sources(count: i64) -> Vec<Source> {
    (0..count)
        .rev()
        .map(|id| Source::new(id, format!("source-{}", id), "http://localhost"))
        .collect()
}

/// Benchmark a full cycle with varying source counts
fn bench_run_cycle(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let aggregator = Aggregator::new(Arc::new(Instant));
    let mut group = c.benchmark_group("run_cycle");

    for count in [1i64, 10, 100, 500].iter() {
        let sources = sources(*count);
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &sources, |b, sources| {
            b.to_async(&runtime)
                .iter(|| async { black_box(aggregator.run_cycle(sources).await) });
        });
    }
    group.finish();
}

/// Benchmark committing an aggregate into the store
fn bench_commit(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let aggregator = Aggregator::new(Arc::new(Instant));
    let aggregate = runtime.block_on(aggregator.run_cycle(&sources(100)));
    let store = SnapshotStore::new();

    c.bench_function("commit_aggregate_100", |b| {
        b.iter(|| {
            black_box(store.commit_aggregate(aggregate.clone()));
        });
    });
}

criterion_group!(benches, bench_run_cycle, bench_commit);
criterion_main!(benches);
