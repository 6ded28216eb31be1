use serde::{Deserialize, Serialize};

use crate::{Interval, Symbol, ValidationError};

/// Canonical instrument class. Carried on every request; never inferred from
/// the symbol string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Crypto,
    Forex,
    Equity,
    Commodity,
    Index,
}

impl AssetClass {
    pub const ALL: [Self; 5] = [
        Self::Crypto,
        Self::Forex,
        Self::Equity,
        Self::Commodity,
        Self::Index,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Crypto => "crypto",
            Self::Forex => "forex",
            Self::Equity => "equity",
            Self::Commodity => "commodity",
            Self::Index => "index",
        }
    }
}

impl std::fmt::Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AssetClass {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "crypto" => Ok(Self::Crypto),
            "forex" => Ok(Self::Forex),
            "equity" => Ok(Self::Equity),
            "commodity" => Ok(Self::Commodity),
            "index" => Ok(Self::Index),
            other => Err(ValidationError::InvalidAssetClass {
                value: other.to_owned(),
            }),
        }
    }
}

/// OHLCV sample for one time bucket. Times are unix epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
}

impl Candle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        open_time: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        close_time: i64,
    ) -> Result<Self, ValidationError> {
        for (field, value) in [
            ("open", open),
            ("high", high),
            ("low", low),
            ("close", close),
            ("volume", volume),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::NonFiniteValue { field });
            }
            if value < 0.0 {
                return Err(ValidationError::NegativeValue { field });
            }
        }

        if open_time >= close_time {
            return Err(ValidationError::InvalidCandleWindow {
                open_time,
                close_time,
            });
        }

        if high < low {
            return Err(ValidationError::InvalidCandleRange);
        }

        if open < low || open > high || close < low || close > high {
            return Err(ValidationError::InvalidCandleBounds);
        }

        Ok(Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
            close_time,
        })
    }
}

/// Candle sequence for one symbol and interval, ascending by open time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleSeries {
    pub symbol: Symbol,
    pub interval: Interval,
    pub candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(symbol: Symbol, interval: Interval, candles: Vec<Candle>) -> Self {
        Self {
            symbol,
            interval,
            candles,
        }
    }

    /// Non-empty and strictly ascending by open time. This is the structural
    /// check a racing branch must pass before it can win.
    pub fn is_well_formed(&self) -> bool {
        !self.candles.is_empty()
            && self
                .candles
                .windows(2)
                .all(|pair| pair[0].open_time < pair[1].open_time)
    }
}

/// Trailing-24h change statistics for one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayStats {
    pub price_change: f64,
    pub price_change_percent: f64,
    pub last_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub volume: f64,
}

/// Instrument plus its percent change, used for top-gainer/loser ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mover {
    pub symbol: Symbol,
    pub price: f64,
    pub change_percent: f64,
}

/// Ranking direction for mover queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Gainers,
    Losers,
}

impl Direction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gainers => "gainers",
            Self::Losers => "losers",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gainers" => Ok(Self::Gainers),
            "losers" => Ok(Self::Losers),
            other => Err(ValidationError::InvalidDirection {
                value: other.to_owned(),
            }),
        }
    }
}

/// Rank movers in place: descending change for gainers, ascending for losers.
pub fn rank_movers(movers: &mut Vec<Mover>, direction: Direction, limit: usize) {
    movers.sort_by(|left, right| {
        let ordering = left
            .change_percent
            .partial_cmp(&right.change_percent)
            .unwrap_or(std::cmp::Ordering::Equal);
        match direction {
            Direction::Gainers => ordering.reverse(),
            Direction::Losers => ordering,
        }
    });
    movers.truncate(limit);
}
