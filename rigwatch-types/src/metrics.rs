//! The canonical metrics record.

use serde::{Deserialize, Serialize};

use crate::{FetchError, Health, Source, UsagePercents};

/// Placeholder for system identity strings the source did not report.
pub const UNKNOWN: &str = "Unknown";

/// CPU metrics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CpuMetrics {
    /// Utilisation in `[0, 100]`.
    pub usage_percent: f64,
    pub current_frequency_mhz: f64,
    pub physical_cores: u32,
    pub logical_cores: u32,
}

/// Memory metrics, in gigabytes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub usage_percent: f64,
    pub used_gb: f64,
    pub total_gb: f64,
    pub available_gb: f64,
}

/// Storage metrics, in gigabytes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StorageMetrics {
    pub usage_percent: f64,
    pub used_gb: f64,
    pub free_gb: f64,
    pub total_gb: f64,
}

/// Free-form system identity reported by the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub os_version: String,
    pub architecture: String,
    pub processor: String,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            os: UNKNOWN.to_string(),
            os_version: UNKNOWN.to_string(),
            architecture: UNKNOWN.to_string(),
            processor: UNKNOWN.to_string(),
        }
    }
}

/// Normalized metrics for one source as of one cycle.
///
/// A source that failed to produce metrics has the same shape as a healthy
/// one: all numeric fields are zero, identity strings are `"Unknown"`,
/// `health` is [`Health::Critical`], and `fetch_error` says what went wrong.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub source_id: i64,
    pub source_name: String,
    pub cpu: CpuMetrics,
    pub memory: MemoryMetrics,
    pub storage: StorageMetrics,
    pub system: SystemInfo,

    /// Timestamp reported by the source, or the fetch time if it sent none.
    pub captured_at: String,

    pub health: Health,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<FetchError>,
}

impl MetricsSnapshot {
    /// Build the zero-filled, critical snapshot for a failed fetch.
    pub fn failed(source: &Source, error: FetchError, captured_at: impl Into<String>) -> Self {
        Self {
            source_id: source.id,
            source_name: source.name.clone(),
            cpu: CpuMetrics::default(),
            memory: MemoryMetrics::default(),
            storage: StorageMetrics::default(),
            system: SystemInfo::default(),
            captured_at: captured_at.into(),
            health: Health::Critical,
            fetch_error: Some(error),
        }
    }

    /// The usage percentages used for classification.
    pub fn usage(&self) -> UsagePercents {
        UsagePercents::new(
            self.cpu.usage_percent,
            self.memory.usage_percent,
            self.storage.usage_percent,
        )
    }

    /// True if the source answered with a valid payload this cycle.
    pub fn is_ok(&self) -> bool {
        self.fetch_error.is_none()
    }

    /// Compare two snapshots ignoring `captured_at`.
    pub fn same_metrics(&self, other: &Self) -> bool {
        self.source_id == other.source_id
            && self.source_name == other.source_name
            && self.cpu == other.cpu
            && self.memory == other.memory
            && self.storage == other.storage
            && self.system == other.system
            && self.health == other.health
            && self.fetch_error == other.fetch_error
    }
}
