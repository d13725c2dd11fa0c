//! Latest-snapshot storage shared by every cycle.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;
use rigwatch_types::{AggregateResult, MetricsSnapshot};

#[derive(Debug, Default)]
struct StoreState {
    aggregate: Arc<AggregateResult>,
    latest: BTreeMap<i64, Arc<MetricsSnapshot>>,
    last_good: BTreeMap<i64, Arc<MetricsSnapshot>>,
    next_list_cycle_ms: Option<u64>,
    /// Ids accepted by commits. `None` until the first `retain_sources`.
    tracked: Option<BTreeSet<i64>>,
}

impl StoreState {
    fn is_tracked(&self, source_id: i64) -> bool {
        self.tracked
            .as_ref()
            .map_or(true, |ids| ids.contains(&source_id))
    }

    fn record(&mut self, snapshot: Arc<MetricsSnapshot>) {
        if !self.is_tracked(snapshot.source_id) {
            return;
        }
        if snapshot.is_ok() {
            self.last_good.insert(snapshot.source_id, snapshot.clone());
        }
        self.latest.insert(snapshot.source_id, snapshot);
    }
}

/// Process-local store of the most recent results.
///
/// Every commit takes the write lock once, so readers see either the state
/// before a commit or after it, never a mix.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    state: RwLock<StoreState>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list aggregate and update per-source entries from it.
    ///
    /// Snapshots for sources removed while the cycle was running are dropped,
    /// so the returned aggregate may be smaller than the one passed in.
    pub fn commit_aggregate(&self, aggregate: AggregateResult) -> Arc<AggregateResult> {
        let mut state = self.state.write();

        let aggregate = if aggregate.iter().all(|s| state.is_tracked(s.source_id)) {
            Arc::new(aggregate)
        } else {
            let AggregateResult {
                snapshots,
                cycle_started_ms,
                cycle_completed_ms,
                ..
            } = aggregate;
            let kept = snapshots
                .into_iter()
                .filter(|s| state.is_tracked(s.source_id))
                .collect();
            Arc::new(AggregateResult::new(kept, cycle_started_ms, cycle_completed_ms))
        };

        state.aggregate = aggregate.clone();
        for snapshot in aggregate.iter() {
            state.record(Arc::new(snapshot.clone()));
        }
        aggregate
    }

    /// Update the entries for a single source without touching the aggregate.
    ///
    /// Ignored if the source has been removed.
    pub fn commit_snapshot(&self, snapshot: MetricsSnapshot) -> Arc<MetricsSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.state.write().record(snapshot.clone());
        snapshot
    }

    /// The most recent list-mode aggregate. Empty until the first cycle.
    pub fn latest_aggregate(&self) -> Arc<AggregateResult> {
        self.state.read().aggregate.clone()
    }

    /// The most recent snapshot for a source, from either mode.
    pub fn latest_snapshot(&self, source_id: i64) -> Option<Arc<MetricsSnapshot>> {
        self.state.read().latest.get(&source_id).cloned()
    }

    /// The most recent snapshot for a source that had no fetch error.
    pub fn last_good_snapshot(&self, source_id: i64) -> Option<Arc<MetricsSnapshot>> {
        self.state.read().last_good.get(&source_id).cloned()
    }

    pub fn set_next_list_cycle_ms(&self, at_ms: u64) {
        self.state.write().next_list_cycle_ms = Some(at_ms);
    }

    /// When the next list cycle is scheduled, if one is running.
    pub fn next_list_cycle_ms(&self) -> Option<u64> {
        self.state.read().next_list_cycle_ms
    }

    /// Forget everything about sources not in `ids`, and refuse later
    /// commits for them.
    pub fn retain_sources(&self, ids: &BTreeSet<i64>) {
        let mut state = self.state.write();
        state.tracked = Some(ids.clone());
        state.latest.retain(|id, _| ids.contains(id));
        state.last_good.retain(|id, _| ids.contains(id));

        if state.aggregate.iter().any(|s| !ids.contains(&s.source_id)) {
            let current = state.aggregate.as_ref();
            let kept = current
                .iter()
                .filter(|s| ids.contains(&s.source_id))
                .cloned()
                .collect();
            let pruned = AggregateResult::new(
                kept,
                current.cycle_started_ms,
                current.cycle_completed_ms,
            );
            state.aggregate = Arc::new(pruned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigwatch_types::{FetchError, Health, Source};

    fn ok(id: i64) -> MetricsSnapshot {
        let mut snapshot = failed(id);
        snapshot.fetch_error = None;
        snapshot.health = Health::Healthy;
        snapshot
    }

    fn failed(id: i64) -> MetricsSnapshot {
        let source = Source::new(id, format!("s{id}"), "http://x");
        MetricsSnapshot::failed(&source, FetchError::Timeout, "t")
    }

    #[test]
    fn starts_empty() {
        let store = SnapshotStore::new();
        assert!(store.latest_aggregate().is_empty());
        assert!(store.latest_snapshot(1).is_none());
        assert!(store.next_list_cycle_ms().is_none());
    }

    #[test]
    fn commit_aggregate_updates_per_source_entries() {
        let store = SnapshotStore::new();
        store.commit_aggregate(AggregateResult::new(vec![ok(1), failed(2)], 0, 1));

        assert_eq!(store.latest_aggregate().len(), 2);
        assert!(store.latest_snapshot(2).is_some());
        assert!(store.last_good_snapshot(1).is_some());
        assert!(store.last_good_snapshot(2).is_none());
    }

    #[test]
    fn last_good_survives_a_failure() {
        let store = SnapshotStore::new();
        store.commit_snapshot(ok(1));
        store.commit_snapshot(failed(1));

        assert!(!store.latest_snapshot(1).unwrap().is_ok());
        assert!(store.last_good_snapshot(1).unwrap().is_ok());
    }

    #[test]
    fn commit_snapshot_leaves_aggregate_alone() {
        let store = SnapshotStore::new();
        store.commit_aggregate(AggregateResult::new(vec![ok(1)], 0, 1));
        store.commit_snapshot(failed(1));

        assert!(store.latest_aggregate().get(1).unwrap().is_ok());
        assert!(!store.latest_snapshot(1).unwrap().is_ok());
    }

    #[test]
    fn retain_drops_removed_sources() {
        let store = SnapshotStore::new();
        store.commit_aggregate(AggregateResult::new(vec![ok(1), ok(2), ok(3)], 5, 9));

        store.retain_sources(&BTreeSet::from([1, 3]));

        let aggregate = store.latest_aggregate();
        let ids: Vec<i64> = aggregate.iter().map(|s| s.source_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(aggregate.cycle_started_ms, 5);
        assert!(store.latest_snapshot(2).is_none());
        assert!(store.last_good_snapshot(2).is_none());
    }

    #[test]
    fn commits_for_removed_sources_are_dropped() {
        let store = SnapshotStore::new();
        store.retain_sources(&BTreeSet::from([1]));

        let committed = store.commit_aggregate(AggregateResult::new(vec![ok(1), ok(2)], 3, 4));
        store.commit_snapshot(ok(2));

        let ids: Vec<i64> = committed.iter().map(|s| s.source_id).collect();
        assert_eq!(ids, vec![1]);
        assert_eq!(committed.cycle_completed_ms, 4);
        assert_eq!(store.latest_aggregate().len(), 1);
        assert!(store.latest_snapshot(2).is_none());
        assert!(store.last_good_snapshot(2).is_none());
    }
}
