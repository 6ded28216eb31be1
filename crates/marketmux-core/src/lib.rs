//! # marketmux-core
//!
//! Multi-source market data aggregation engine.
//!
//! ## Overview
//!
//! The engine answers four canonical queries — instantaneous price,
//! historical candles, 24h change statistics, and ranked top movers — by
//! dispatching to several schema-incompatible upstream providers and
//! normalizing whatever comes back:
//!
//! - **Canonical domain models** for symbols, intervals, candles, and movers
//! - **Provider adapters** (Binance, Bybit, Frankfurter, Yahoo chart) owning
//!   endpoint templates, response schemas, and error translation
//! - **Two dispatch disciplines**: sequential priority fallback for scalar
//!   prices, race-to-first-success for candles/stats/snapshots
//! - **Timeframe synthesis** for intervals a provider cannot serve natively
//! - **Short-TTL response cache** written only by successful resolutions
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters and shared transport plumbing |
//! | [`cache`] | TTL response cache |
//! | [`circuit_breaker`] | Per-provider circuit breaker |
//! | [`domain`] | Domain models (Symbol, Interval, Candle, Mover) |
//! | [`engine`] | The engine object and its builder |
//! | [`error`] | Caller-visible error taxonomy |
//! | [`http`] | HTTP client abstraction |
//! | [`market_source`] | Source adapter contract |
//! | [`registry`] | Injected provider registry |
//! | [`resolve`] | Fallback and race dispatch strategies |
//! | [`retry`] | Transport retry policy |
//! | [`source`] | Provider identifiers |
//! | [`throttling`] | Outbound rate budget |
//! | [`timeframe`] | Interval vocabularies and candle synthesis |
//! | [`translate`] | Canonical-to-provider symbol tables |
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use marketmux_core::{AssetClass, Interval, MarketEngine, Symbol};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = MarketEngine::builder()
//!         .with_default_providers()
//!         .from_env()
//!         .build();
//!
//!     let symbol = Symbol::parse("BTCUSDT")?;
//!     let price = engine.price(AssetClass::Crypto, &symbol).await?;
//!     let candles = engine
//!         .candles(AssetClass::Crypto, &symbol, Interval::FourHours, 5)
//!         .await?;
//!
//!     println!("BTCUSDT: {price} ({} candles)", candles.candles.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Error handling
//!
//! Adapter-level failures (transport errors, malformed responses, rate
//! limits) are folded into the aggregate kinds at the resolver boundary;
//! callers only ever observe [`EngineError`].

pub mod adapters;
pub mod cache;
pub mod circuit_breaker;
pub mod domain;
pub mod engine;
pub mod error;
pub mod http;
pub mod market_source;
pub mod registry;
pub mod resolve;
pub mod retry;
pub mod source;
pub mod throttling;
pub mod timeframe;
pub mod translate;

// Re-export commonly used types at crate root for convenience

// Adapter implementations
pub use adapters::{BinanceAdapter, BybitAdapter, FrankfurterAdapter, YahooChartAdapter};

// Caching
pub use cache::{CacheKey, CachedAnswer, ResponseCache};

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

// Domain models
pub use domain::{
    rank_movers, AssetClass, Candle, CandleSeries, DayStats, Direction, Interval, Mover, Symbol,
};

// Engine
pub use engine::{EngineBuilder, MarketEngine};

// Error types
pub use error::{EngineError, ValidationError};

// HTTP client types
pub use http::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

// Source adapter contract
pub use market_source::{
    CandlesRequest, CapabilitySet, Endpoint, HistoryRequest, MarketSource, RatePoint,
    SnapshotRequest, SourceError, SourceErrorKind, SpotRequest, StatsRequest,
};

// Registry
pub use registry::{ProviderRegistry, SourceSnapshot};

// Dispatch policy
pub use resolve::RacePolicy;

// Retry policy
pub use retry::{Backoff, RetryConfig};

// Provider identifiers
pub use source::ProviderId;

// Throttling
pub use throttling::RateGate;

// Symbol translation
pub use translate::SymbolTranslator;
