//! Source adapter contract and request/response types.
//!
//! Every upstream provider implements [`MarketSource`]: it translates a
//! canonical request into that provider's API call and the response back into
//! the canonical schema, and owns the translation of provider failures into
//! [`SourceError`]. Provider errors never cross the resolver boundary.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{CandleSeries, DayStats, Interval, Mover, ProviderId, ValidationError};

/// Operation type used for capability checks and cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Spot,
    Candles,
    Stats,
    Snapshot,
    History,
}

impl Endpoint {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spot => "spot",
            Self::Candles => "candles",
            Self::Stats => "stats",
            Self::Snapshot => "snapshot",
            Self::History => "history",
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported endpoint matrix for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub spot: bool,
    pub candles: bool,
    pub stats: bool,
    pub snapshot: bool,
    pub history: bool,
}

impl CapabilitySet {
    pub const fn new(
        spot: bool,
        candles: bool,
        stats: bool,
        snapshot: bool,
        history: bool,
    ) -> Self {
        Self {
            spot,
            candles,
            stats,
            snapshot,
            history,
        }
    }

    pub const fn supports(self, endpoint: Endpoint) -> bool {
        match endpoint {
            Endpoint::Spot => self.spot,
            Endpoint::Candles => self.candles,
            Endpoint::Stats => self.stats,
            Endpoint::Snapshot => self.snapshot,
            Endpoint::History => self.history,
        }
    }

    pub fn supported_endpoints(self) -> Vec<&'static str> {
        let mut values = Vec::with_capacity(5);
        if self.spot {
            values.push("spot");
        }
        if self.candles {
            values.push("candles");
        }
        if self.stats {
            values.push("stats");
        }
        if self.snapshot {
            values.push("snapshot");
        }
        if self.history {
            values.push("history");
        }
        values
    }
}

/// Adapter-level failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Transport or HTTP failure reaching the provider.
    Unavailable,
    /// A response arrived but the expected fields could not be extracted.
    InvalidResponse,
    /// The provider has no endpoint (or no interval plan) for the request.
    UnsupportedEndpoint,
    /// The provider's rate budget is exhausted.
    RateLimited,
    /// The request failed adapter-side validation.
    InvalidRequest,
}

/// Structured source error consumed by the resolvers. Always folded into an
/// aggregate [`crate::EngineError`] before reaching a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidResponse,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn unsupported_endpoint(provider: ProviderId, endpoint: Endpoint) -> Self {
        Self {
            kind: SourceErrorKind::UnsupportedEndpoint,
            message: format!("endpoint '{endpoint}' is not supported by '{provider}'"),
            retryable: false,
        }
    }

    pub fn unsupported_interval(provider: ProviderId, interval: Interval) -> Self {
        Self {
            kind: SourceErrorKind::UnsupportedEndpoint,
            message: format!("interval '{interval}' cannot be served by '{provider}'"),
            retryable: false,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::InvalidResponse => "source.invalid_response",
            SourceErrorKind::UnsupportedEndpoint => "source.unsupported_endpoint",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

impl From<ValidationError> for SourceError {
    fn from(error: ValidationError) -> Self {
        Self::invalid_response(error.to_string())
    }
}

/// Scalar price request. `provider_symbol` is the already-translated
/// instrument code in the target provider's vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotRequest {
    pub provider_symbol: String,
}

impl SpotRequest {
    pub fn new(provider_symbol: impl Into<String>) -> Self {
        Self {
            provider_symbol: provider_symbol.into(),
        }
    }
}

/// Candle request at a canonical interval. The adapter plans its own native
/// fetch (possibly finer) and returns a series at the requested interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandlesRequest {
    pub provider_symbol: String,
    pub canonical: crate::Symbol,
    pub interval: Interval,
    pub limit: usize,
}

impl CandlesRequest {
    pub fn new(
        provider_symbol: impl Into<String>,
        canonical: crate::Symbol,
        interval: Interval,
        limit: usize,
    ) -> Result<Self, SourceError> {
        if limit == 0 {
            return Err(SourceError::invalid_request(
                "candles request limit must be greater than zero",
            ));
        }
        Ok(Self {
            provider_symbol: provider_symbol.into(),
            canonical,
            interval,
            limit,
        })
    }
}

/// Trailing-24h statistics request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsRequest {
    pub provider_symbol: String,
}

impl StatsRequest {
    pub fn new(provider_symbol: impl Into<String>) -> Self {
        Self {
            provider_symbol: provider_symbol.into(),
        }
    }
}

/// Full-market ticker snapshot request, filtered to one quote asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRequest {
    pub quote_asset: String,
}

impl SnapshotRequest {
    pub fn new(quote_asset: impl Into<String>) -> Self {
        Self {
            quote_asset: quote_asset.into(),
        }
    }
}

/// Historical daily-rate request over a closed date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub base: String,
    pub quote: String,
    pub start: time::Date,
    pub end: time::Date,
}

impl HistoryRequest {
    pub fn new(
        base: impl Into<String>,
        quote: impl Into<String>,
        start: time::Date,
        end: time::Date,
    ) -> Result<Self, SourceError> {
        if start > end {
            return Err(SourceError::invalid_request(
                "history request start date must not follow end date",
            ));
        }
        Ok(Self {
            base: base.into(),
            quote: quote.into(),
            start,
            end,
        })
    }
}

/// One daily rate sample from a history query, ascending by date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatePoint {
    pub date: time::Date,
    pub rate: f64,
}

type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Source adapter contract implemented once per upstream provider.
///
/// Implementations must be `Send + Sync`; the race strategy shares them
/// across spawned tasks. Methods for endpoints outside the adapter's
/// [`CapabilitySet`] return an `UnsupportedEndpoint` error.
pub trait MarketSource: Send + Sync {
    /// Unique provider identifier.
    fn id(&self) -> ProviderId;

    /// Supported endpoint matrix, consulted before dispatch.
    fn capabilities(&self) -> CapabilitySet;

    /// Last traded price / current rate for one instrument.
    fn spot<'a>(&'a self, req: SpotRequest) -> SourceFuture<'a, f64>;

    /// OHLCV candles at the canonical interval, ascending by open time.
    fn candles<'a>(&'a self, req: CandlesRequest) -> SourceFuture<'a, CandleSeries>;

    /// Trailing-24h change statistics for one instrument.
    fn day_stats<'a>(&'a self, req: StatsRequest) -> SourceFuture<'a, DayStats>;

    /// Full-market ticker snapshot for the given quote asset.
    fn snapshot<'a>(&'a self, req: SnapshotRequest) -> SourceFuture<'a, Vec<Mover>>;

    /// Historical daily rates over a date range, ascending by date.
    fn rate_history<'a>(&'a self, req: HistoryRequest) -> SourceFuture<'a, Vec<RatePoint>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_set_lists_supported_endpoints() {
        let caps = CapabilitySet::new(true, true, false, false, true);
        assert!(caps.supports(Endpoint::Spot));
        assert!(!caps.supports(Endpoint::Stats));
        assert_eq!(caps.supported_endpoints(), vec!["spot", "candles", "history"]);
    }

    #[test]
    fn zero_limit_candles_request_is_rejected() {
        let symbol = crate::Symbol::parse("BTCUSDT").expect("valid symbol");
        let err = CandlesRequest::new("BTCUSDT", symbol, Interval::OneHour, 0)
            .expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::InvalidRequest);
    }

    #[test]
    fn inverted_history_range_is_rejected() {
        let start = time::macros::date!(2024 - 02 - 01);
        let end = time::macros::date!(2024 - 01 - 01);
        let err = HistoryRequest::new("EUR", "USD", start, end).expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::InvalidRequest);
    }
}
