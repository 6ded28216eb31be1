//! Sequential-fallback price resolution.
//!
//! Providers are tried strictly in the configured priority order, one
//! in-flight call at a time, each under its own timeout. The resolver
//! advances only on rejection, so the common case pays exactly one upstream
//! call; the worst case is the sum of the chain's timeouts.

use std::sync::Arc;
use std::time::Duration;

use crate::market_source::{MarketSource, SpotRequest};
use crate::ProviderId;

/// One fallback-chain step: the adapter plus its translated symbol and
/// timeout.
pub(crate) struct PriceAttempt {
    pub provider: ProviderId,
    pub adapter: Arc<dyn MarketSource>,
    pub provider_symbol: String,
    pub timeout: Duration,
}

/// Whether a scalar price is usable: a finite number greater than zero.
pub(crate) fn acceptable_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

/// Walk the chain and return the first acceptable price. `None` means every
/// provider was exhausted; the failure detail has already been logged.
pub(crate) async fn resolve_price(attempts: Vec<PriceAttempt>) -> Option<(ProviderId, f64)> {
    for attempt in attempts {
        let call = attempt
            .adapter
            .spot(SpotRequest::new(&attempt.provider_symbol));

        match tokio::time::timeout(attempt.timeout, call).await {
            Err(_) => {
                log::warn!(
                    "price lookup via '{}' timed out after {:?}",
                    attempt.provider,
                    attempt.timeout
                );
            }
            Ok(Err(error)) => {
                log::warn!("price lookup via '{}' failed: {error}", attempt.provider);
            }
            Ok(Ok(price)) if acceptable_price(price) => {
                return Some((attempt.provider, price));
            }
            Ok(Ok(price)) => {
                log::warn!(
                    "price lookup via '{}' returned unusable value {price}; trying next provider",
                    attempt.provider
                );
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_source::{
        CandlesRequest, CapabilitySet, HistoryRequest, RatePoint, SnapshotRequest, SourceError,
        StatsRequest,
    };
    use crate::{CandleSeries, DayStats, Mover};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedPriceSource {
        provider: ProviderId,
        outcome: Result<f64, ()>,
        calls: AtomicUsize,
    }

    impl FixedPriceSource {
        fn new(provider: ProviderId, outcome: Result<f64, ()>) -> Arc<Self> {
            Arc::new(Self {
                provider,
                outcome,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl MarketSource for FixedPriceSource {
        fn id(&self) -> ProviderId {
            self.provider
        }

        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::new(true, false, false, false, false)
        }

        fn spot<'a>(
            &'a self,
            _req: SpotRequest,
        ) -> Pin<Box<dyn Future<Output = Result<f64, SourceError>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let outcome = self
                .outcome
                .map_err(|_| SourceError::unavailable("scripted failure"));
            Box::pin(async move { outcome })
        }

        fn candles<'a>(
            &'a self,
            _req: CandlesRequest,
        ) -> Pin<Box<dyn Future<Output = Result<CandleSeries, SourceError>> + Send + 'a>> {
            Box::pin(async move { Err(SourceError::unavailable("not under test")) })
        }

        fn day_stats<'a>(
            &'a self,
            _req: StatsRequest,
        ) -> Pin<Box<dyn Future<Output = Result<DayStats, SourceError>> + Send + 'a>> {
            Box::pin(async move { Err(SourceError::unavailable("not under test")) })
        }

        fn snapshot<'a>(
            &'a self,
            _req: SnapshotRequest,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<Mover>, SourceError>> + Send + 'a>> {
            Box::pin(async move { Err(SourceError::unavailable("not under test")) })
        }

        fn rate_history<'a>(
            &'a self,
            _req: HistoryRequest,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<RatePoint>, SourceError>> + Send + 'a>> {
            Box::pin(async move { Err(SourceError::unavailable("not under test")) })
        }
    }

    fn attempt(source: &Arc<FixedPriceSource>) -> PriceAttempt {
        PriceAttempt {
            provider: source.id(),
            adapter: source.clone(),
            provider_symbol: String::from("BTCUSDT"),
            timeout: Duration::from_secs(10),
        }
    }

    #[tokio::test]
    async fn first_provider_success_stops_the_chain() {
        let first = FixedPriceSource::new(ProviderId::Binance, Ok(65_000.5));
        let second = FixedPriceSource::new(ProviderId::Bybit, Ok(64_990.0));

        let (provider, price) = resolve_price(vec![attempt(&first), attempt(&second)])
            .await
            .expect("price");

        assert_eq!(provider, ProviderId::Binance);
        assert_eq!(price, 65_000.5);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_value_advances_to_next_provider() {
        let first = FixedPriceSource::new(ProviderId::Binance, Ok(0.0));
        let second = FixedPriceSource::new(ProviderId::Bybit, Ok(3_200.0));

        let (provider, price) = resolve_price(vec![attempt(&first), attempt(&second)])
            .await
            .expect("price");

        assert_eq!(provider, ProviderId::Bybit);
        assert_eq!(price, 3_200.0);
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_chain_yields_none() {
        let first = FixedPriceSource::new(ProviderId::Binance, Err(()));
        let second = FixedPriceSource::new(ProviderId::Bybit, Ok(-1.0));

        let outcome = resolve_price(vec![attempt(&first), attempt(&second)]).await;
        assert!(outcome.is_none());
    }

    #[test]
    fn nan_and_infinity_are_rejected() {
        assert!(!acceptable_price(f64::NAN));
        assert!(!acceptable_price(f64::INFINITY));
        assert!(!acceptable_price(0.0));
        assert!(acceptable_price(1.0856));
    }
}
