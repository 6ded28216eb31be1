use thiserror::Error;

/// Validation and contract errors for domain type construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid interval '{value}', expected one of 1m, 5m, 15m, 30m, 1h, 4h, 1d, 1w")]
    InvalidInterval { value: String },
    #[error("invalid asset class '{value}', expected one of crypto, forex, equity, commodity, index")]
    InvalidAssetClass { value: String },
    #[error("invalid direction '{value}', expected gainers or losers")]
    InvalidDirection { value: String },
    #[error("invalid provider '{value}', expected one of binance, bybit, frankfurter, yahoo")]
    InvalidProvider { value: String },
    #[error("invalid race policy '{value}', expected let_finish or cancel_on_win")]
    InvalidRacePolicy { value: String },

    #[error("candle open time {open_time} must precede close time {close_time}")]
    InvalidCandleWindow { open_time: i64, close_time: i64 },
    #[error("candle high must be >= low")]
    InvalidCandleRange,
    #[error("candle open/close must be within high/low range")]
    InvalidCandleBounds,

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("limit must be greater than zero")]
    ZeroLimit,
}

/// Caller-visible failure taxonomy. Provider-specific failures never reach
/// this type; the resolvers fold them into the aggregate kinds below.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Every configured provider for the asset class failed to produce an
    /// acceptable price.
    #[error("no provider could resolve a price for '{symbol}'")]
    NoPriceAvailable { symbol: String },

    /// Every eligible provider failed to produce usable data for the request.
    #[error("no provider could resolve data for '{symbol}'")]
    NoDataAvailable { symbol: String },

    /// The translator has no mapping for the instrument on any eligible
    /// provider.
    #[error("symbol '{symbol}' is not supported for asset class {asset_class}")]
    UnsupportedSymbol {
        symbol: String,
        asset_class: crate::AssetClass,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
