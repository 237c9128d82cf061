//! # Breadth Core
//!
//! Sector market breadth engine: for a universe of equities grouped into
//! sectors, the share of constituents closing above their 20-day moving
//! average, per sector and summed across the market.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Price sources (Schwab `pricehistory`, fixtures) |
//! | [`breadth`] | Signal extraction, sector and market aggregation, reports |
//! | [`circuit_breaker`] | Fail-fast guard for upstream calls |
//! | [`config`] | Layered run configuration |
//! | [`data_source`] | `PriceSource` trait and request/error types |
//! | [`domain`] | Validated value types |
//! | [`envelope`] | Response envelope for machine-readable output |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`pipeline`] | Concurrent end-to-end run |
//! | [`retry`] | Backoff policy |
//! | [`throttling`] | Concurrency and rate limits |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use breadth_core::{BreadthConfig, BreadthPipeline, SchwabAdapter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BreadthConfig::load(None)?;
//!     let token = config.access_token.clone().unwrap_or_default();
//!     let pipeline = BreadthPipeline::new(Arc::new(SchwabAdapter::new(token)), &config)?;
//!
//!     let report = pipeline.run().await?;
//!     if let Some(latest) = report.latest() {
//!         println!("{}: {:.1} ({:?})", latest.date, latest.score, latest.zone);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Data flow
//!
//! ```text
//! PriceSource ──▶ SymbolSeries ──▶ SignalSeries ──▶ SectorBreadth ──▶ MarketBreadth
//!  (per symbol,      (validated)      (MA20 flags)     (UTC instants)    + SectorMatrix
//!   concurrent)                                                          (trading dates)
//! ```

pub mod adapters;
pub mod breadth;
pub mod circuit_breaker;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod http_client;
pub mod pipeline;
pub mod retry;
pub mod throttling;

pub use adapters::{FixturePriceSource, SchwabAdapter};
pub use breadth::{
    aggregate_market, aggregate_sector, extract_signal, BreadthReport, BreadthThresholds,
    BreadthZone, MarketBreadth, MissingPolicy, ReportPoint, RunDiagnostics, SectorBreadth,
    SectorMatrix, SignalExtractor, TradingZone,
};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use config::BreadthConfig;
pub use data_source::{PriceHistoryRequest, PriceSource, SourceError, SourceErrorKind, SourceId};
pub use domain::*;
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta, SCHEMA_VERSION};
pub use error::{BreadthError, CoreError, ValidationError};
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, RecordingHttpClient,
    ReqwestHttpClient,
};
pub use pipeline::{aggregate_universe, BreadthPipeline};
pub use retry::{Backoff, RetryPolicy};
pub use throttling::{FetchPermit, FetchPolicy, FetchThrottle};
