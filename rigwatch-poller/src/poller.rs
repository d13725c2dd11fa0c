//! The `Poller` facade: source set, store and subscriptions in one handle.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use rigwatch_adapters::{Fetcher, DEFAULT_TIMEOUT};
use rigwatch_types::{AggregateResult, MetricsSnapshot, Source};
use thiserror::Error;
use tracing::debug;

use crate::aggregator::Aggregator;
use crate::store::SnapshotStore;
use crate::subscription::{
    Subscription, SubscriptionConfig, DEFAULT_COUNTDOWN_TICK, DEFAULT_DETAIL_PERIOD,
    DEFAULT_LIST_PERIOD,
};

/// Errors returned by [`Poller`] lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollerError {
    /// No cycle has produced a snapshot for this source yet.
    #[error("source {source_id} has not been polled yet")]
    NotPolledYet { source_id: i64 },
}

#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) aggregator: Aggregator,
    pub(crate) store: SnapshotStore,
    pub(crate) countdown_tick: Duration,
    sources: RwLock<Vec<Source>>,
}

impl Shared {
    pub(crate) fn sources(&self) -> Vec<Source> {
        self.sources.read().clone()
    }
}

/// Polls a dynamic set of sources and keeps the latest results.
///
/// Cloning is cheap; clones share the same store and source set.
///
/// # Example
///
/// ```rust,no_run
/// use rigwatch_adapters::HttpFetcher;
/// use rigwatch_poller::{Poller, SubscriptionConfig};
/// use rigwatch_types::Source;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let poller = Poller::builder(HttpFetcher::builder().build()?).build();
///     poller.set_sources(vec![Source::new(1, "db-01", "http://10.0.0.5:5002/api/system")]);
///
///     let subscription = poller.subscribe(SubscriptionConfig::list());
///     let mut results = subscription.results();
///     results.changed().await?;
///
///     println!("{:?}", results.borrow().summary());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Poller {
    shared: Arc<Shared>,
    list_period: Duration,
    detail_period: Duration,
}

impl Poller {
    /// Create a poller with default periods and timeout.
    pub fn new(fetcher: impl Fetcher) -> Self {
        Self::builder(fetcher).build()
    }

    /// Create a builder for configuring the poller.
    pub fn builder(fetcher: impl Fetcher) -> PollerBuilder {
        PollerBuilder::new(Arc::new(fetcher))
    }

    /// Replace the set of sources polled by subsequent cycles.
    ///
    /// Cycles already running keep the set they started with, but whatever
    /// they fetched for removed sources is dropped when they commit. Store
    /// entries for sources no longer present are dropped at once.
    pub fn set_sources(&self, mut sources: Vec<Source>) {
        sources.sort_by_key(|s| s.id);
        sources.dedup_by_key(|s| s.id);
        let ids: BTreeSet<i64> = sources.iter().map(|s| s.id).collect();

        debug!(count = sources.len(), "source set updated");
        *self.shared.sources.write() = sources;
        self.shared.store.retain_sources(&ids);
    }

    /// The current source set, ascending by id.
    pub fn sources(&self) -> Vec<Source> {
        self.shared.sources()
    }

    /// Run one cycle over the current sources and commit it as the list
    /// aggregate.
    pub async fn run_cycle(&self) -> Arc<AggregateResult> {
        let sources = self.shared.sources();
        let aggregate = self.shared.aggregator.run_cycle(&sources).await;
        self.shared.store.commit_aggregate(aggregate)
    }

    /// The most recent list aggregate. Empty before the first cycle.
    pub fn latest_aggregate(&self) -> Arc<AggregateResult> {
        self.shared.store.latest_aggregate()
    }

    /// The most recent snapshot for a source from any mode.
    pub fn latest_snapshot(&self, source_id: i64) -> Result<Arc<MetricsSnapshot>, PollerError> {
        self.shared
            .store
            .latest_snapshot(source_id)
            .ok_or(PollerError::NotPolledYet { source_id })
    }

    /// The most recent snapshot for a source that fetched successfully.
    pub fn last_good_snapshot(&self, source_id: i64) -> Option<Arc<MetricsSnapshot>> {
        self.shared.store.last_good_snapshot(source_id)
    }

    /// When the running list subscription will start its next cycle.
    pub fn next_list_cycle_ms(&self) -> Option<u64> {
        self.shared.store.next_list_cycle_ms()
    }

    /// Start periodic polling. The first cycle runs immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe(&self, config: SubscriptionConfig) -> Subscription {
        Subscription::start(self.shared.clone(), config)
    }

    /// List-mode config with this poller's configured period.
    pub fn list_config(&self) -> SubscriptionConfig {
        SubscriptionConfig::list().with_period(self.list_period)
    }

    /// Detail-mode config with this poller's configured period.
    pub fn detail_config(&self, source_id: i64) -> SubscriptionConfig {
        SubscriptionConfig::detail(source_id).with_period(self.detail_period)
    }
}

/// Builder for configuring a Poller.
pub struct PollerBuilder {
    fetcher: Arc<dyn Fetcher>,
    fetch_timeout: Option<Duration>,
    list_period: Option<Duration>,
    detail_period: Option<Duration>,
    countdown_tick: Option<Duration>,
    sources: Vec<Source>,
}

impl std::fmt::Debug for PollerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollerBuilder")
            .field("fetch_timeout", &self.fetch_timeout)
            .field("list_period", &self.list_period)
            .field("detail_period", &self.detail_period)
            .field("countdown_tick", &self.countdown_tick)
            .field("sources", &self.sources)
            .finish_non_exhaustive()
    }
}

impl PollerBuilder {
    fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            fetch_timeout: None,
            list_period: None,
            detail_period: None,
            countdown_tick: None,
            sources: Vec::new(),
        }
    }

    /// Set the per-fetch budget enforced around every fetch (default: 2 seconds).
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Set the list-mode period (default: 2 seconds).
    pub fn list_period(mut self, period: Duration) -> Self {
        self.list_period = Some(period);
        self
    }

    /// Set the detail-mode period (default: 5 seconds).
    pub fn detail_period(mut self, period: Duration) -> Self {
        self.detail_period = Some(period);
        self
    }

    /// Set the countdown tick interval (default: 1 second).
    pub fn countdown_tick(mut self, tick: Duration) -> Self {
        self.countdown_tick = Some(tick);
        self
    }

    /// Set the initial source set.
    pub fn sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }

    /// Build the poller.
    pub fn build(self) -> Poller {
        let aggregator = Aggregator::with_timeout(
            self.fetcher,
            self.fetch_timeout.unwrap_or(DEFAULT_TIMEOUT),
        );
        let poller = Poller {
            shared: Arc::new(Shared {
                aggregator,
                store: SnapshotStore::new(),
                countdown_tick: self.countdown_tick.unwrap_or(DEFAULT_COUNTDOWN_TICK),
                sources: RwLock::new(Vec::new()),
            }),
            list_period: self.list_period.unwrap_or(DEFAULT_LIST_PERIOD),
            detail_period: self.detail_period.unwrap_or(DEFAULT_DETAIL_PERIOD),
        };
        poller.set_sources(self.sources);
        poller
    }
}
