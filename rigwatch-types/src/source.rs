//! Registered metrics sources.

use serde::{Deserialize, Serialize};

/// A remote endpoint believed to expose hardware metrics.
///
/// Sources are owned by the registry. The poller only reads them: a source
/// never changes while a cycle is in flight, although the registry may add
/// or remove sources between cycles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    /// Unique, registry-assigned identifier. Snapshots are ordered by it.
    pub id: i64,

    /// Human-readable server name.
    pub name: String,

    /// URL of the metrics endpoint (e.g. `http://10.0.0.5:5001/api/system`).
    #[serde(rename = "url_api")]
    pub endpoint_url: String,

    /// Unix timestamp in milliseconds when the source was registered.
    #[serde(default)]
    pub created_at_ms: u64,
}

impl Source {
    /// Create a source with a zero creation timestamp.
    pub fn new(id: i64, name: impl Into<String>, endpoint_url: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            endpoint_url: endpoint_url.into(),
            created_at_ms: 0,
        }
    }

    /// Set the creation timestamp.
    pub fn with_created_at_ms(mut self, created_at_ms: u64) -> Self {
        self.created_at_ms = created_at_ms;
        self
    }
}
