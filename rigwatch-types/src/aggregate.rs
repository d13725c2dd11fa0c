//! AggregateResult - the outcome of one poll cycle.

use serde::{Deserialize, Serialize};

use crate::{Health, MetricsSnapshot, SchemaVersion};

/// The ordered set of snapshots produced by one cycle.
///
/// Snapshots are always sorted by ascending `source_id`, whatever order the
/// individual fetches completed in.
///
/// # Example
///
/// ```rust
/// use rigwatch_types::{AggregateResult, FetchError, MetricsSnapshot, Source};
///
/// let b = MetricsSnapshot::failed(&Source::new(2, "b", "http://b"), FetchError::Timeout, "t");
/// let a = MetricsSnapshot::failed(&Source::new(1, "a", "http://a"), FetchError::Timeout, "t");
///
/// let aggregate = AggregateResult::new(vec![b, a], 1_000, 1_250);
/// assert_eq!(aggregate.snapshots[0].source_id, 1);
/// assert_eq!(aggregate.summary().critical, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Schema version for forward compatibility.
    pub version: SchemaVersion,

    /// One snapshot per polled source, ascending by `source_id`.
    pub snapshots: Vec<MetricsSnapshot>,

    /// Unix timestamp in milliseconds when the cycle started.
    pub cycle_started_ms: u64,

    /// Unix timestamp in milliseconds when the last fetch of the cycle finished.
    pub cycle_completed_ms: u64,
}

impl AggregateResult {
    /// Create an aggregate, sorting the snapshots by source id.
    pub fn new(
        mut snapshots: Vec<MetricsSnapshot>,
        cycle_started_ms: u64,
        cycle_completed_ms: u64,
    ) -> Self {
        snapshots.sort_by_key(|s| s.source_id);
        Self {
            version: SchemaVersion::current(),
            snapshots,
            cycle_started_ms,
            cycle_completed_ms,
        }
    }

    /// The aggregate before any cycle has completed.
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, 0)
    }

    /// Check if the aggregate holds no snapshots.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Number of snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Look up the snapshot for a source.
    pub fn get(&self, source_id: i64) -> Option<&MetricsSnapshot> {
        self.snapshots
            .binary_search_by_key(&source_id, |s| s.source_id)
            .ok()
            .map(|idx| &self.snapshots[idx])
    }

    /// Iterate over snapshots in source id order.
    pub fn iter(&self) -> impl Iterator<Item = &MetricsSnapshot> {
        self.snapshots.iter()
    }

    /// Wall time the cycle took, in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.cycle_completed_ms.saturating_sub(self.cycle_started_ms)
    }

    /// Health counts across all snapshots.
    pub fn summary(&self) -> HealthSummary {
        let mut summary = HealthSummary {
            total: self.snapshots.len(),
            ..Default::default()
        };
        for snapshot in &self.snapshots {
            match snapshot.health {
                Health::Healthy => summary.healthy += 1,
                Health::Warning => summary.warning += 1,
                Health::Critical => summary.critical += 1,
            }
            if snapshot.fetch_error.is_some() {
                summary.failed += 1;
            }
        }
        summary
    }

    /// Compare two aggregates ignoring timestamps.
    pub fn same_metrics(&self, other: &Self) -> bool {
        self.snapshots.len() == other.snapshots.len()
            && self
                .snapshots
                .iter()
                .zip(&other.snapshots)
                .all(|(a, b)| a.same_metrics(b))
    }
}

impl Default for AggregateResult {
    fn default() -> Self {
        Self::empty()
    }
}

/// Per-health counts for an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HealthSummary {
    pub total: usize,
    pub healthy: usize,
    pub warning: usize,
    pub critical: usize,
    /// Sources whose fetch failed (a subset of `critical`).
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FetchError, Source};

    fn snapshot(id: i64, health: Health, failed: bool) -> MetricsSnapshot {
        let source = Source::new(id, format!("s{id}"), "http://x");
        let mut s = MetricsSnapshot::failed(&source, FetchError::Timeout, "t");
        s.health = health;
        if !failed {
            s.fetch_error = None;
        }
        s
    }

    #[test]
    fn sorts_by_source_id() {
        let aggregate = AggregateResult::new(
            vec![
                snapshot(3, Health::Healthy, false),
                snapshot(1, Health::Healthy, false),
                snapshot(2, Health::Healthy, false),
            ],
            0,
            0,
        );
        let ids: Vec<i64> = aggregate.iter().map(|s| s.source_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn get_finds_by_id() {
        let aggregate = AggregateResult::new(
            vec![snapshot(10, Health::Warning, false), snapshot(4, Health::Healthy, false)],
            0,
            0,
        );
        assert_eq!(aggregate.get(10).unwrap().health, Health::Warning);
        assert!(aggregate.get(5).is_none());
    }

    #[test]
    fn summary_counts() {
        let aggregate = AggregateResult::new(
            vec![
                snapshot(1, Health::Healthy, false),
                snapshot(2, Health::Warning, false),
                snapshot(3, Health::Critical, false),
                snapshot(4, Health::Critical, true),
            ],
            100,
            350,
        );
        let summary = aggregate.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.healthy, 1);
        assert_eq!(summary.warning, 1);
        assert_eq!(summary.critical, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(aggregate.duration_ms(), 250);
    }

    #[test]
    fn empty_aggregate() {
        let aggregate = AggregateResult::default();
        assert!(aggregate.is_empty());
        assert_eq!(aggregate.summary(), HealthSummary::default());
        assert_eq!(aggregate.version, SchemaVersion::current());
    }
}
