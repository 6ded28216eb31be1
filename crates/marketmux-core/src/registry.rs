//! Injected provider registry: which adapters exist, in what priority order
//! per asset class, and under what timeout.
//!
//! The engine holds no global state; everything it dispatches to comes from
//! this registry, so tests swap in fake adapters freely.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::market_source::{CapabilitySet, MarketSource};
use crate::{AssetClass, ProviderId};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Registry of adapters plus per-asset-class priority chains and
/// per-provider timeouts.
pub struct ProviderRegistry {
    adapters: HashMap<ProviderId, Arc<dyn MarketSource>>,
    chains: HashMap<AssetClass, Vec<ProviderId>>,
    timeouts: HashMap<ProviderId, Duration>,
    default_timeout: Duration,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
            chains: HashMap::new(),
            timeouts: HashMap::new(),
            default_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn register(&mut self, adapter: Arc<dyn MarketSource>) {
        let provider = adapter.id();
        if self.adapters.insert(provider, adapter).is_some() {
            log::warn!("adapter '{provider}' registered twice; keeping the latest");
        }
    }

    /// Set the priority-ordered provider chain for an asset class. Unknown
    /// providers are logged and skipped rather than failing construction.
    pub fn set_chain(&mut self, asset_class: AssetClass, chain: Vec<ProviderId>) {
        let mut seen = Vec::with_capacity(chain.len());
        for provider in chain {
            if seen.contains(&provider) {
                continue;
            }
            if !self.adapters.contains_key(&provider) {
                log::warn!(
                    "chain for '{asset_class}' names unregistered provider '{provider}'; skipping"
                );
                continue;
            }
            seen.push(provider);
        }
        self.chains.insert(asset_class, seen);
    }

    pub fn set_timeout(&mut self, provider: ProviderId, timeout: Duration) {
        self.timeouts.insert(provider, timeout);
    }

    pub fn set_default_timeout(&mut self, timeout: Duration) {
        self.default_timeout = timeout;
    }

    pub fn chain(&self, asset_class: AssetClass) -> &[ProviderId] {
        self.chains
            .get(&asset_class)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn adapter(&self, provider: ProviderId) -> Option<Arc<dyn MarketSource>> {
        self.adapters.get(&provider).cloned()
    }

    pub fn timeout(&self, provider: ProviderId) -> Duration {
        self.timeouts
            .get(&provider)
            .copied()
            .unwrap_or(self.default_timeout)
    }

    /// Registered source listing, sorted by provider name.
    pub fn snapshots(&self) -> Vec<SourceSnapshot> {
        let mut entries: Vec<SourceSnapshot> = self
            .adapters
            .values()
            .map(|adapter| SourceSnapshot {
                id: adapter.id(),
                capabilities: adapter.capabilities(),
                timeout: self.timeout(adapter.id()),
            })
            .collect();
        entries.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        entries
    }
}

/// One registered source as reported to the calling layer.
#[derive(Debug, Clone, Copy)]
pub struct SourceSnapshot {
    pub id: ProviderId,
    pub capabilities: CapabilitySet,
    pub timeout: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_source::{
        CandlesRequest, HistoryRequest, RatePoint, SnapshotRequest, SourceError, SpotRequest,
        StatsRequest,
    };
    use crate::{CandleSeries, DayStats, Mover};
    use std::future::Future;
    use std::pin::Pin;

    struct NamedSource(ProviderId);

    impl MarketSource for NamedSource {
        fn id(&self) -> ProviderId {
            self.0
        }

        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::new(true, true, true, true, true)
        }

        fn spot<'a>(
            &'a self,
            _req: SpotRequest,
        ) -> Pin<Box<dyn Future<Output = Result<f64, SourceError>> + Send + 'a>> {
            Box::pin(async move { Ok(1.0) })
        }

        fn candles<'a>(
            &'a self,
            _req: CandlesRequest,
        ) -> Pin<Box<dyn Future<Output = Result<CandleSeries, SourceError>> + Send + 'a>> {
            Box::pin(async move { Err(SourceError::unavailable("unused")) })
        }

        fn day_stats<'a>(
            &'a self,
            _req: StatsRequest,
        ) -> Pin<Box<dyn Future<Output = Result<DayStats, SourceError>> + Send + 'a>> {
            Box::pin(async move { Err(SourceError::unavailable("unused")) })
        }

        fn snapshot<'a>(
            &'a self,
            _req: SnapshotRequest,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<Mover>, SourceError>> + Send + 'a>> {
            Box::pin(async move { Err(SourceError::unavailable("unused")) })
        }

        fn rate_history<'a>(
            &'a self,
            _req: HistoryRequest,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<RatePoint>, SourceError>> + Send + 'a>> {
            Box::pin(async move { Err(SourceError::unavailable("unused")) })
        }
    }

    #[test]
    fn chain_drops_unknown_and_duplicate_providers() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(NamedSource(ProviderId::Binance)));

        registry.set_chain(
            AssetClass::Crypto,
            vec![ProviderId::Binance, ProviderId::Bybit, ProviderId::Binance],
        );

        assert_eq!(registry.chain(AssetClass::Crypto), &[ProviderId::Binance]);
        assert!(registry.chain(AssetClass::Forex).is_empty());
    }

    #[test]
    fn timeout_falls_back_to_default() {
        let mut registry = ProviderRegistry::new();
        registry.set_timeout(ProviderId::Yahoo, Duration::from_secs(15));

        assert_eq!(registry.timeout(ProviderId::Yahoo), Duration::from_secs(15));
        assert_eq!(registry.timeout(ProviderId::Binance), DEFAULT_TIMEOUT);
    }

    #[test]
    fn snapshots_are_sorted_by_provider_name() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(NamedSource(ProviderId::Yahoo)));
        registry.register(Arc::new(NamedSource(ProviderId::Binance)));

        let ids: Vec<ProviderId> = registry.snapshots().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![ProviderId::Binance, ProviderId::Yahoo]);
    }
}
