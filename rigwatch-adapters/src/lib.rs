//! # rigwatch-adapters
//!
//! Fetchers that collect hardware metrics from remote endpoints and convert
//! them to the rigwatch model.
//!
//! The [`Fetcher`] trait is what the poller drives; [`HttpFetcher`] is the
//! production implementation over reqwest. Tests and embedders can provide
//! their own implementations.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rigwatch_adapters::{Fetcher, HttpFetcher};
//! use rigwatch_types::Source;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = HttpFetcher::builder().build()?;
//!
//!     let source = Source::new(1, "web-01", "http://10.0.0.4:5002/api/system");
//!     let snapshot = fetcher.fetch(&source).await;
//!
//!     println!("cpu {:.1}%", snapshot.cpu.usage_percent);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod fetcher;
pub mod http;

pub use error::AdapterError;
pub use fetcher::Fetcher;
pub use http::{HttpFetcher, HttpFetcherBuilder, DEFAULT_TIMEOUT};

// Re-export types for convenience
pub use rigwatch_types::{FetchError, MetricsSnapshot, Source};
