//! Provider interval vocabularies and candle synthesis.
//!
//! Every provider speaks its own timeframe vocabulary, and not every
//! canonical interval exists natively everywhere. A [`FetchPlan`] names the
//! native interval and token to fetch plus the group size to fold finer
//! candles into the requested bucket; `group == 1` means the interval is
//! served natively.

use crate::{Candle, Interval, ProviderId};

/// How a provider serves one canonical interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPlan {
    /// Interval to actually request from the provider.
    pub native: Interval,
    /// Token for `native` in the provider's vocabulary.
    pub token: &'static str,
    /// Consecutive native candles folded into one derived candle.
    pub group: usize,
}

impl FetchPlan {
    const fn native_plan(interval: Interval, token: &'static str) -> Self {
        Self {
            native: interval,
            token,
            group: 1,
        }
    }

    pub const fn is_native(self) -> bool {
        self.group == 1
    }
}

/// Resolve the fetch plan for `(provider, interval)`, or `None` when the
/// provider cannot serve the interval at all (which makes it ineligible for
/// the request rather than an error).
pub fn plan_for(provider: ProviderId, interval: Interval) -> Option<FetchPlan> {
    match provider {
        ProviderId::Binance => Some(FetchPlan::native_plan(interval, binance_token(interval))),
        ProviderId::Bybit => Some(FetchPlan::native_plan(interval, bybit_token(interval))),
        ProviderId::Yahoo => match interval {
            // The chart API has no 4h bucket; fold four hourly candles.
            Interval::FourHours => Some(FetchPlan {
                native: Interval::OneHour,
                token: "1h",
                group: 4,
            }),
            Interval::OneWeek => Some(FetchPlan::native_plan(interval, "1wk")),
            other => Some(FetchPlan::native_plan(other, other.as_str())),
        },
        ProviderId::Frankfurter => match interval {
            Interval::OneDay => Some(FetchPlan::native_plan(Interval::OneDay, "1d")),
            Interval::OneWeek => Some(FetchPlan {
                native: Interval::OneDay,
                token: "1d",
                group: 7,
            }),
            _ => None,
        },
    }
}

const fn binance_token(interval: Interval) -> &'static str {
    // The exchange vocabulary matches the canonical tokens.
    interval.as_str()
}

const fn bybit_token(interval: Interval) -> &'static str {
    match interval {
        Interval::OneMinute => "1",
        Interval::FiveMinutes => "5",
        Interval::FifteenMinutes => "15",
        Interval::ThirtyMinutes => "30",
        Interval::OneHour => "60",
        Interval::FourHours => "240",
        Interval::OneDay => "D",
        Interval::OneWeek => "W",
    }
}

/// Fold consecutive groups of `group` native candles into derived candles.
///
/// Each full group emits one candle: open from the first member, close from
/// the last, high/low as the group extrema, volume summed, open/close times
/// from the first/last member. A trailing group smaller than `group` is
/// dropped, not padded.
pub fn synthesize(native: &[Candle], group: usize) -> Vec<Candle> {
    if group <= 1 {
        return native.to_vec();
    }

    native
        .chunks_exact(group)
        .map(|members| {
            let first = &members[0];
            let last = &members[members.len() - 1];
            Candle {
                open_time: first.open_time,
                open: first.open,
                high: members.iter().map(|c| c.high).fold(f64::MIN, f64::max),
                low: members.iter().map(|c| c.low).fold(f64::MAX, f64::min),
                close: last.close,
                volume: members.iter().map(|c| c.volume).sum(),
                close_time: last.close_time,
            }
        })
        .collect()
}

/// Truncate to the requested count, keeping the most recent entries.
pub fn keep_recent(mut candles: Vec<Candle>, limit: usize) -> Vec<Candle> {
    if candles.len() > limit {
        candles.drain(..candles.len() - limit);
    }
    candles
}
