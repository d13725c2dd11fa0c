//! Concurrent fan-out of one fetch per source.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rigwatch_adapters::{Fetcher, DEFAULT_TIMEOUT};
use rigwatch_types::{
    format_timestamp_ms, now_ms, AggregateResult, FetchError, MetricsSnapshot, Source,
};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Runs one cycle: fetch every source concurrently and collect the results.
///
/// The aggregator never fails. A source that times out, errors, or whose
/// fetch task panics still contributes exactly one snapshot, and the output
/// is sorted by source id regardless of completion order.
#[derive(Clone)]
pub struct Aggregator {
    fetcher: Arc<dyn Fetcher>,
    timeout: Duration,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Aggregator {
    /// Create an aggregator with the default 2 second budget per fetch.
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_timeout(fetcher, DEFAULT_TIMEOUT)
    }

    /// Create an aggregator that gives up on a fetch after `timeout`.
    pub fn with_timeout(fetcher: Arc<dyn Fetcher>, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch all `sources` in parallel.
    ///
    /// Wall time is bounded by the per-fetch timeout, not by the number of
    /// sources.
    pub async fn run_cycle(&self, sources: &[Source]) -> AggregateResult {
        let started_ms = now_ms();
        let mut tasks = JoinSet::new();
        let mut pending = HashMap::with_capacity(sources.len());

        for source in sources {
            let fetcher = self.fetcher.clone();
            let timeout = self.timeout;
            let owned = source.clone();
            let handle = tasks.spawn(async move {
                match tokio::time::timeout(timeout, fetcher.fetch(&owned)).await {
                    Ok(snapshot) => snapshot,
                    Err(_) => {
                        warn!(source_id = owned.id, source = %owned.name, "fetch exceeded {:?}", timeout);
                        MetricsSnapshot::failed(
                            &owned,
                            FetchError::Timeout,
                            format_timestamp_ms(now_ms()),
                        )
                    }
                }
            });
            pending.insert(handle.id(), source);
        }

        let mut snapshots = Vec::with_capacity(sources.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, snapshot)) => {
                    pending.remove(&id);
                    snapshots.push(snapshot);
                }
                Err(err) => {
                    let Some(source) = pending.remove(&err.id()) else {
                        continue;
                    };
                    warn!(source_id = source.id, source = %source.name, "fetch task failed: {}", err);
                    snapshots.push(MetricsSnapshot::failed(
                        source,
                        FetchError::Unreachable {
                            message: format!("fetch task failed: {err}"),
                        },
                        format_timestamp_ms(now_ms()),
                    ));
                }
            }
        }

        let aggregate = AggregateResult::new(snapshots, started_ms, now_ms());
        debug!(
            sources = aggregate.len(),
            failed = aggregate.summary().failed,
            duration_ms = aggregate.duration_ms(),
            "cycle complete"
        );
        aggregate
    }
}
