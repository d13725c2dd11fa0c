//! # rigwatch-types
//!
//! Canonical types for hardware-metrics polling. This crate defines the
//! normalized record every remote metrics endpoint is converted into, the
//! typed view of the raw endpoint payload, and the health classification
//! rules shared by the poller and its consumers.
//!
//! ## Design Goals
//!
//! - **Pure**: no I/O, no async. Everything here is synchronous and cheap.
//! - **Defensive**: raw payloads are fully optional records; validation yields
//!   a typed [`NormalizationError`] instead of panicking on missing paths.
//! - **Uniform failures**: a source that could not be polled still produces a
//!   [`MetricsSnapshot`], zero-filled and `Critical`, with [`FetchError`] set.
//! - **Versioned schema**: aggregates carry a [`SchemaVersion`].
//!
//! ## Example
//!
//! ```rust
//! use rigwatch_types::{normalize, Health, RawPayload, Source};
//!
//! let raw: RawPayload = serde_json::from_str(r#"{
//!     "hardware": {
//!         "cpu": {"usage_percent": 42.0, "current_frequency_mhz": 2400,
//!                 "physical_cores": 4, "total_cores": 8},
//!         "ram": {"usage_percent": 80.5, "used_gb": 12.9, "total_gb": 16.0,
//!                 "free_gb": 3.1},
//!         "storage": {"usage_percent": 40.0, "used_gb": 200.0,
//!                     "free_gb": 300.0, "total_gb": 500.0}
//!     },
//!     "system": {"os": "Linux", "os_version": "6.1", "architecture": "x86_64",
//!                "processor": "x86_64"},
//!     "timestamp": "2024-05-01T10:00:00"
//! }"#).unwrap();
//!
//! let source = Source::new(1, "web-1", "http://10.0.0.5:5001/api/system");
//! let snapshot = normalize(&raw, &source, 0).unwrap();
//!
//! assert_eq!(snapshot.memory.available_gb, 3.1);
//! assert_eq!(snapshot.health, Health::Warning);
//! ```
//!
//! ## Schema Version
//!
//! The current schema version is **1**.

mod aggregate;
mod error;
mod health;
mod metrics;
mod normalize;
mod source;
mod timestamp;
mod version;

pub use aggregate::*;
pub use error::*;
pub use health::*;
pub use metrics::*;
pub use normalize::*;
pub use source::*;
pub use timestamp::*;
pub use version::*;

/// Current schema version.
///
/// Increment this when making breaking changes to the aggregate format.
pub const SCHEMA_VERSION: u32 = 1;
