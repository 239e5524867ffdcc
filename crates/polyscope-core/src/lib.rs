//! # Polyscope Core
//!
//! Data ingestion and analytics core for prediction-market research.
//!
//! ## Overview
//!
//! This crate provides the foundational components for Polyscope:
//!
//! - **Canonical domain models** for markets, events, price histories, and order books
//! - **Typed source clients** for the trading-data, metadata, and portfolio APIs
//! - **A unified router** with fallback, caching, and partial-failure tolerance
//! - **A shared transport** with one request budget and retry policy across all sources
//! - **Series alignment** merging per-outcome histories onto one timestamp axis
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Expiring market metadata cache |
//! | [`clients`] | Typed clients for the three upstream sources |
//! | [`config`] | Connection and policy settings |
//! | [`domain`] | Domain models (Market, Event, PriceHistory, Interval) |
//! | [`error`] | Validation and core error types |
//! | [`export`] | Export column naming, metadata blocks, summary statistics |
//! | [`http_client`] | HTTP client abstraction |
//! | [`merge`] | Materialized and streaming timestamp-axis merges |
//! | [`orderbook`] | Order book depth, spread, and market-impact analysis |
//! | [`rate_limit`] | Shared request budget |
//! | [`retry`] | Backoff and retry policy |
//! | [`router`] | Source selection and fallback |
//! | [`timerange`] | Time ranges and market-lifetime clipping |
//! | [`transport`] | Budgeted, retrying request execution |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use polyscope_core::{CacheMode, Config, DataRouter, Interval, ReqwestHttpClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = DataRouter::new(&Config::default(), Arc::new(ReqwestHttpClient::new()));
//!
//!     let market = router.get_market("will-it-rain-tomorrow", CacheMode::Use).await?;
//!     let fetch = router
//!         .get_price_history(&market, Interval::OneDay, None, None)
//!         .await;
//!
//!     for (outcome, history) in &fetch.histories {
//!         println!("{outcome}: latest {:?}", history.latest_price());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Source operations return [`SourceError`] with a kind the caller can
//! branch on:
//!
//! ```rust
//! use polyscope_core::{SourceError, SourceErrorKind};
//!
//! fn handle_error(error: SourceError) {
//!     match error.kind() {
//!         SourceErrorKind::RateLimited => {
//!             // Wait and retry
//!         }
//!         SourceErrorKind::NotFound => {
//!             // Try another slug
//!         }
//!         SourceErrorKind::InvalidRequest => {
//!             // Report to user
//!         }
//!         _ => {}
//!     }
//! }
//! ```

pub mod cache;
pub mod clients;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod http_client;
pub mod merge;
pub mod orderbook;
pub mod rate_limit;
pub mod retry;
pub mod router;
pub mod timerange;
pub mod transport;

// Re-export commonly used types at crate root for convenience

// Domain models
pub use domain::{
    validate_price, Event, Interval, Market, PriceHistory, PricePoint, UtcDateTime,
    PRICE_PRECISION,
};

// Errors
pub use error::{CoreError, ValidationError};

// Source clients
pub use clients::{
    ActivityQuery, ActivityRecord, ClobClient, DataClient, GammaClient, HistoryQuery, Holder,
    HoldingsPoint, ListQuery, MarketsPage, Position, PositionQuery, SourceError, SourceErrorKind,
    TradeRecord,
};

// Router
pub use router::{
    source_order, DataRouter, HistoryFetch, Operation, OutcomeFailure, PriceSide, SourceId,
};

// Order books
pub use orderbook::{BookError, ImpactReport, MarketOrderBooks, OrderBook, OrderLevel, Side};

// Caching
pub use cache::{CacheMode, MarketCache};

// Configuration
pub use config::Config;

// Transport stack
pub use http_client::{HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use rate_limit::RateBudget;
pub use retry::{Backoff, RetryConfig};
pub use transport::{Transport, TransportError};

// Series alignment and export
pub use merge::{
    merge_histories, merge_with_strategy, Merge, MergeStrategy, MergedRows, MergedTable, Row,
};
pub use timerange::{AdjustedRange, TimeRange};
pub use export::{column_name, column_names, summary_stats, SummaryStats};
