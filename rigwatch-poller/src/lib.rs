//! # rigwatch-poller
//!
//! Polls a dynamic set of hardware-metrics endpoints and keeps the latest
//! result for each.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rigwatch_adapters::HttpFetcher;
//! use rigwatch_poller::Poller;
//! use rigwatch_types::Source;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let poller = Poller::new(HttpFetcher::builder().build()?);
//!     poller.set_sources(vec![
//!         Source::new(1, "web-01", "http://10.0.0.4:5002/api/system"),
//!         Source::new(2, "db-01", "http://10.0.0.5:5002/api/system"),
//!     ]);
//!
//!     // One-shot cycle, committed to the store
//!     let aggregate = poller.run_cycle().await;
//!     for snapshot in aggregate.iter() {
//!         println!("{} {}", snapshot.source_name, snapshot.health.symbol());
//!     }
//!
//!     // Periodic polling while the handle lives
//!     let subscription = poller.subscribe(poller.list_config());
//!     tokio::time::sleep(std::time::Duration::from_secs(10)).await;
//!     subscription.cancel();
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Concurrent cycles**: one task per source, bounded by the fetch timeout
//! - **Failure isolation**: every source yields a snapshot, failed or not
//! - **Cancellable subscriptions**: list and detail modes with an epoch gate
//! - **Last known good**: the latest successful snapshot survives failures

mod aggregator;
mod poller;
mod store;
mod subscription;

pub use aggregator::Aggregator;
pub use poller::{Poller, PollerBuilder, PollerError};
pub use store::SnapshotStore;
pub use subscription::{
    Countdown, Mode, Subscription, SubscriptionConfig, DEFAULT_COUNTDOWN_TICK,
    DEFAULT_DETAIL_PERIOD, DEFAULT_LIST_PERIOD,
};

// Re-export types for convenience
pub use rigwatch_types::{AggregateResult, Health, HealthSummary, MetricsSnapshot, Source};
