//! Schema version stamped on every aggregate.

use serde::{Deserialize, Serialize};

use crate::SCHEMA_VERSION;

/// Lets API consumers detect format changes in the JSON they receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Bumped on breaking changes.
    pub major: u32,
    /// Bumped on additive changes.
    pub minor: u32,
}

impl SchemaVersion {
    /// The version this library produces.
    pub const fn current() -> Self {
        Self {
            major: SCHEMA_VERSION,
            minor: 0,
        }
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::current()
    }
}
