//! The seam between the poller and the network.

use std::sync::Arc;

use async_trait::async_trait;
use rigwatch_types::{MetricsSnapshot, Source};

/// Produces one snapshot for one source.
///
/// Implementations never fail: any problem reaching or understanding the
/// source is reported through [`MetricsSnapshot::fetch_error`] on a
/// zero-filled, critical snapshot (see [`MetricsSnapshot::failed`]).
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    async fn fetch(&self, source: &Source) -> MetricsSnapshot;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    async fn fetch(&self, source: &Source) -> MetricsSnapshot {
        (**self).fetch(source).await
    }
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Box<F> {
    async fn fetch(&self, source: &Source) -> MetricsSnapshot {
        (**self).fetch(source).await
    }
}
