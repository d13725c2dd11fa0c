//! rigwatch - live health dashboard for machines exposing hardware metrics.
//!
//! This library exposes the application pieces around the polling core so
//! they can be tested and embedded:
//!
//! - [`config`]: layered settings (defaults, TOML file, `RIGWATCH_*` env)
//! - [`registry`]: the JSON-file server registry
//! - [`http`]: the axum router with CRUD, dashboard and SSE routes
//! - [`export`]: one-shot cycle written to a JSON file
//! - [`telemetry`]: tracing subscriber setup

pub mod config;
pub mod export;
pub mod http;
pub mod registry;
pub mod telemetry;

pub use config::Settings;
pub use http::{build_router, AppState};
pub use registry::{Registry, RegistryError};
