#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rigwatch_adapters::Fetcher;
use rigwatch_types::{normalize, FetchError, MetricsSnapshot, RawPayload, Source};
use serde_json::json;

/// How the mock answers for one source.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Answer at once with these cpu/ram/storage percentages.
    Usage(f64, f64, f64),
    /// Answer with `usage` cpu after sleeping.
    Slow(Duration, f64),
    Fail(FetchError),
    Panic,
}

#[derive(Debug, Default)]
pub struct MockFetcher {
    behaviors: Mutex<HashMap<i64, Behavior>>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, source_id: i64, behavior: Behavior) -> Self {
        self.set(source_id, behavior);
        self
    }

    pub fn set(&self, source_id: i64, behavior: Behavior) {
        self.behaviors.lock().insert(source_id, behavior);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn payload(cpu: f64, ram: f64, storage: f64) -> RawPayload {
    serde_json::from_value(json!({
        "hardware": {
            "cpu": {"usage_percent": cpu, "current_frequency_mhz": 3000.0, "physical_cores": 4, "total_cores": 8},
            "ram": {"usage_percent": ram, "used_gb": 8.0, "total_gb": 16.0, "available_gb": 8.0},
            "storage": {"usage_percent": storage, "used_gb": 100.0, "free_gb": 100.0, "total_gb": 200.0}
        },
        "system": {"os": "Linux", "os_version": "6.1", "architecture": "x86_64", "processor": "x86_64"},
        "timestamp": "2024-01-01T00:00:00Z"
    }))
    .unwrap()
}

fn healthy(source: &Source, cpu: f64, ram: f64, storage: f64) -> MetricsSnapshot {
    normalize(&payload(cpu, ram, storage), source, 0).unwrap()
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, source: &Source) -> MetricsSnapshot {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self
            .behaviors
            .lock()
            .get(&source.id)
            .cloned()
            .unwrap_or(Behavior::Usage(10.0, 10.0, 10.0));

        match behavior {
            Behavior::Usage(cpu, ram, storage) => healthy(source, cpu, ram, storage),
            Behavior::Slow(delay, cpu) => {
                tokio::time::sleep(delay).await;
                healthy(source, cpu, 10.0, 10.0)
            }
            Behavior::Fail(error) => MetricsSnapshot::failed(source, error, "t"),
            Behavior::Panic => panic!("fetch for source {} blew up", source.id),
        }
    }
}

pub fn sources(ids: &[i64]) -> Vec<Source> {
    ids.iter()
        .map(|&id| Source::new(id, format!("source-{id}"), format!("http://10.0.0.{id}:5002/api/system")))
        .collect()
}
