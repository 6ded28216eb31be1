//! Top-mover ranking strategies.
//!
//! Crypto rides the same race as candles: one full-market snapshot per
//! exchange, first non-empty list wins. Forex has no bulk endpoint anywhere,
//! so it walks the fixed pair universe with one historical-rate comparison
//! per pair, skipping failures; the partial list is ranked the same way.
//! The asymmetry is a deliberate cost tradeoff, not an oversight: the forex
//! universe is small and fixed, the crypto universe is not.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::rank_movers;
use crate::market_source::{HistoryRequest, MarketSource};
use crate::resolve::race::{self, RaceEntry, RacePolicy};
use crate::{Direction, Mover, Symbol};

/// Race full-market snapshots and rank the winning list.
pub(crate) async fn crypto_movers(
    entries: Vec<RaceEntry<Vec<Mover>>>,
    direction: Direction,
    limit: usize,
    policy: RacePolicy,
) -> Option<Vec<Mover>> {
    let (provider, mut movers) =
        race::first_acceptable(entries, |list| !list.is_empty(), policy).await?;
    log::debug!("market snapshot race won by '{provider}'");

    rank_movers(&mut movers, direction, limit);
    Some(movers)
}

/// One configured forex pair with its decomposition.
pub(crate) struct ForexComparison {
    pub pair: Symbol,
    pub base: &'static str,
    pub quote: &'static str,
}

/// Compare each pair's latest rate against the reference date, sequentially,
/// skipping pairs whose lookup fails. Returns the ranked partial list, which
/// is empty when every pair failed.
pub(crate) async fn forex_movers(
    adapter: Arc<dyn MarketSource>,
    timeout: Duration,
    comparisons: Vec<ForexComparison>,
    reference_days: i64,
    direction: Direction,
    limit: usize,
) -> Vec<Mover> {
    let end = time::OffsetDateTime::now_utc().date();
    let Some(start) = end.checked_sub(time::Duration::days(reference_days)) else {
        return Vec::new();
    };

    let mut movers = Vec::with_capacity(comparisons.len());
    for comparison in comparisons {
        let request = match HistoryRequest::new(comparison.base, comparison.quote, start, end) {
            Ok(request) => request,
            Err(error) => {
                log::warn!("skipping pair '{}': {error}", comparison.pair);
                continue;
            }
        };

        let points = match tokio::time::timeout(timeout, adapter.rate_history(request)).await {
            Err(_) => {
                log::warn!("rate comparison for '{}' timed out", comparison.pair);
                continue;
            }
            Ok(Err(error)) => {
                log::warn!("rate comparison for '{}' failed: {error}", comparison.pair);
                continue;
            }
            Ok(Ok(points)) => points,
        };

        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            log::warn!("rate series for '{}' is empty; skipping", comparison.pair);
            continue;
        };
        if points.len() < 2 || first.rate <= 0.0 {
            log::warn!(
                "rate series for '{}' has too few usable samples; skipping",
                comparison.pair
            );
            continue;
        }

        movers.push(Mover {
            symbol: comparison.pair,
            price: last.rate,
            change_percent: (last.rate - first.rate) / first.rate * 100.0,
        });
    }

    rank_movers(&mut movers, direction, limit);
    movers
}
