//! The aggregation engine: four canonical operations over the provider
//! registry, with the response cache read and written only at operation
//! boundaries.

use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use crate::adapters::{BinanceAdapter, BybitAdapter, FrankfurterAdapter, YahooChartAdapter};
use crate::cache::{CacheKey, CachedAnswer, ResponseCache};
use crate::http::{HttpClient, ReqwestHttpClient};
use crate::market_source::{
    CandlesRequest, MarketSource, SnapshotRequest, SourceError, StatsRequest,
};
use crate::registry::{ProviderRegistry, SourceSnapshot};
use crate::resolve::movers::{crypto_movers, forex_movers, ForexComparison};
use crate::resolve::price::{resolve_price, PriceAttempt};
use crate::resolve::race::{self, RaceEntry, RacePolicy};
use crate::translate::SymbolTranslator;
use crate::{
    timeframe, AssetClass, CandleSeries, DayStats, Direction, Endpoint, EngineError, Interval,
    Mover, ProviderId, Symbol, ValidationError,
};

const DEFAULT_QUOTE_ASSET: &str = "USDT";
const DEFAULT_REFERENCE_DAYS: i64 = 7;

/// Multi-source market data engine.
///
/// Constructed from an injected [`ProviderRegistry`] via [`EngineBuilder`];
/// holds no global state. All operations are safe to call concurrently;
/// identical concurrent requests may each resolve upstream (no in-flight
/// de-duplication), which is harmless because only successes write the cache.
pub struct MarketEngine {
    registry: ProviderRegistry,
    cache: ResponseCache,
    race_policy: RacePolicy,
    quote_asset: String,
    forex_pairs: Vec<Symbol>,
    reference_days: i64,
}

impl MarketEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Instantaneous price via sequential priority fallback.
    pub async fn price(&self, asset_class: AssetClass, symbol: &Symbol) -> Result<f64, EngineError> {
        let key = CacheKey::price(asset_class, symbol);
        if let Some(CachedAnswer::Price(price)) = self.cache.get(&key).await {
            return Ok(price);
        }

        let mut attempts = Vec::new();
        let mut unmapped = 0_usize;
        for &provider in self.registry.chain(asset_class) {
            let Some(adapter) = self.registry.adapter(provider) else {
                continue;
            };
            if !adapter.capabilities().supports(Endpoint::Spot) {
                continue;
            }
            match SymbolTranslator::translate(asset_class, symbol, provider) {
                Ok(provider_symbol) => attempts.push(PriceAttempt {
                    provider,
                    adapter,
                    provider_symbol,
                    timeout: self.registry.timeout(provider),
                }),
                Err(_) => unmapped += 1,
            }
        }

        if attempts.is_empty() {
            if unmapped > 0 {
                return Err(EngineError::UnsupportedSymbol {
                    symbol: symbol.to_string(),
                    asset_class,
                });
            }
            return Err(EngineError::NoPriceAvailable {
                symbol: symbol.to_string(),
            });
        }

        match resolve_price(attempts).await {
            Some((provider, price)) => {
                log::info!("price for '{symbol}' resolved by '{provider}'");
                self.cache.put(key, CachedAnswer::Price(price)).await;
                Ok(price)
            }
            None => Err(EngineError::NoPriceAvailable {
                symbol: symbol.to_string(),
            }),
        }
    }

    /// Historical candles via race-to-first-valid across eligible providers.
    pub async fn candles(
        &self,
        asset_class: AssetClass,
        symbol: &Symbol,
        interval: Interval,
        limit: usize,
    ) -> Result<CandleSeries, EngineError> {
        if limit == 0 {
            return Err(ValidationError::ZeroLimit.into());
        }

        let key = CacheKey::candles(asset_class, symbol, interval);
        if let Some(CachedAnswer::Candles(series)) = self.cache.get(&key).await {
            return Ok(series);
        }

        let mut entries: Vec<RaceEntry<CandleSeries>> = Vec::new();
        let mut unmapped = 0_usize;
        for &provider in self.registry.chain(asset_class) {
            let Some(adapter) = self.registry.adapter(provider) else {
                continue;
            };
            if !adapter.capabilities().supports(Endpoint::Candles) {
                continue;
            }
            // A provider with no plan for the interval is ineligible, not an error.
            if timeframe::plan_for(provider, interval).is_none() {
                continue;
            }

            let provider_symbol = match SymbolTranslator::translate(asset_class, symbol, provider) {
                Ok(provider_symbol) => provider_symbol,
                Err(_) => {
                    unmapped += 1;
                    continue;
                }
            };

            let request = CandlesRequest::new(provider_symbol, symbol.clone(), interval, limit)
                .expect("limit was validated above");
            let timeout = self.registry.timeout(provider);
            let future: BoxFuture<'static, Result<CandleSeries, SourceError>> =
                Box::pin(async move {
                    tokio::time::timeout(timeout, adapter.candles(request))
                        .await
                        .unwrap_or_else(|_| Err(timed_out(provider, timeout)))
                });
            entries.push((provider, future));
        }

        if entries.is_empty() {
            if unmapped > 0 {
                return Err(EngineError::UnsupportedSymbol {
                    symbol: symbol.to_string(),
                    asset_class,
                });
            }
            return Err(EngineError::NoDataAvailable {
                symbol: symbol.to_string(),
            });
        }

        let winner =
            race::first_acceptable(entries, CandleSeries::is_well_formed, self.race_policy).await;

        match winner {
            Some((provider, series)) => {
                log::info!("candles for '{symbol}' ({interval}) resolved by '{provider}'");
                self.cache
                    .put(key, CachedAnswer::Candles(series.clone()))
                    .await;
                Ok(series)
            }
            None => Err(EngineError::NoDataAvailable {
                symbol: symbol.to_string(),
            }),
        }
    }

    /// Trailing-24h statistics; resolves against the crypto chain with race
    /// semantics.
    pub async fn day_stats(&self, symbol: &Symbol) -> Result<DayStats, EngineError> {
        let asset_class = AssetClass::Crypto;
        let key = CacheKey::stats(symbol);
        if let Some(CachedAnswer::Stats(stats)) = self.cache.get(&key).await {
            return Ok(stats);
        }

        let mut entries: Vec<RaceEntry<DayStats>> = Vec::new();
        let mut unmapped = 0_usize;
        for &provider in self.registry.chain(asset_class) {
            let Some(adapter) = self.registry.adapter(provider) else {
                continue;
            };
            if !adapter.capabilities().supports(Endpoint::Stats) {
                continue;
            }

            let provider_symbol = match SymbolTranslator::translate(asset_class, symbol, provider) {
                Ok(provider_symbol) => provider_symbol,
                Err(_) => {
                    unmapped += 1;
                    continue;
                }
            };

            let request = StatsRequest::new(provider_symbol);
            let timeout = self.registry.timeout(provider);
            let future: BoxFuture<'static, Result<DayStats, SourceError>> =
                Box::pin(async move {
                    tokio::time::timeout(timeout, adapter.day_stats(request))
                        .await
                        .unwrap_or_else(|_| Err(timed_out(provider, timeout)))
                });
            entries.push((provider, future));
        }

        if entries.is_empty() {
            if unmapped > 0 {
                return Err(EngineError::UnsupportedSymbol {
                    symbol: symbol.to_string(),
                    asset_class,
                });
            }
            return Err(EngineError::NoDataAvailable {
                symbol: symbol.to_string(),
            });
        }

        let winner = race::first_acceptable(
            entries,
            |stats| stats.last_price.is_finite() && stats.last_price > 0.0,
            self.race_policy,
        )
        .await;

        match winner {
            Some((provider, stats)) => {
                log::info!("24h stats for '{symbol}' resolved by '{provider}'");
                self.cache.put(key, CachedAnswer::Stats(stats)).await;
                Ok(stats)
            }
            None => Err(EngineError::NoDataAvailable {
                symbol: symbol.to_string(),
            }),
        }
    }

    /// Ranked top movers. Crypto races full-market snapshots; forex walks
    /// the configured pair universe sequentially.
    pub async fn top_movers(
        &self,
        asset_class: AssetClass,
        direction: Direction,
        limit: usize,
    ) -> Result<Vec<Mover>, EngineError> {
        if limit == 0 {
            return Err(ValidationError::ZeroLimit.into());
        }

        let key = CacheKey::movers(asset_class, direction, limit);
        if let Some(CachedAnswer::Movers(movers)) = self.cache.get(&key).await {
            return Ok(movers);
        }

        let exhausted = || EngineError::NoDataAvailable {
            symbol: format!("{asset_class}:{direction}"),
        };

        let movers = match asset_class {
            AssetClass::Crypto => {
                let mut entries: Vec<RaceEntry<Vec<Mover>>> = Vec::new();
                for &provider in self.registry.chain(asset_class) {
                    let Some(adapter) = self.registry.adapter(provider) else {
                        continue;
                    };
                    if !adapter.capabilities().supports(Endpoint::Snapshot) {
                        continue;
                    }

                    let request = SnapshotRequest::new(self.quote_asset.clone());
                    let timeout = self.registry.timeout(provider);
                    let future: BoxFuture<'static, Result<Vec<Mover>, SourceError>> =
                        Box::pin(async move {
                            tokio::time::timeout(timeout, adapter.snapshot(request))
                                .await
                                .unwrap_or_else(|_| Err(timed_out(provider, timeout)))
                        });
                    entries.push((provider, future));
                }

                crypto_movers(entries, direction, limit, self.race_policy)
                    .await
                    .ok_or_else(exhausted)?
            }
            AssetClass::Forex => {
                let adapter = self
                    .registry
                    .chain(asset_class)
                    .iter()
                    .filter_map(|&provider| self.registry.adapter(provider))
                    .find(|adapter| adapter.capabilities().supports(Endpoint::History))
                    .ok_or_else(exhausted)?;

                let comparisons: Vec<ForexComparison> = self
                    .forex_pairs
                    .iter()
                    .filter_map(|pair| {
                        SymbolTranslator::forex_components(pair).map(|(base, quote)| {
                            ForexComparison {
                                pair: pair.clone(),
                                base,
                                quote,
                            }
                        })
                    })
                    .collect();

                let timeout = self.registry.timeout(adapter.id());
                let ranked = forex_movers(
                    adapter,
                    timeout,
                    comparisons,
                    self.reference_days,
                    direction,
                    limit,
                )
                .await;

                if ranked.is_empty() {
                    return Err(exhausted());
                }
                ranked
            }
            // No provider serves a bulk snapshot for these classes.
            _ => return Err(exhausted()),
        };

        self.cache
            .put(key, CachedAnswer::Movers(movers.clone()))
            .await;
        Ok(movers)
    }

    /// Registered source listing for the calling layer.
    pub fn sources(&self) -> Vec<SourceSnapshot> {
        self.registry.snapshots()
    }
}

fn timed_out(provider: ProviderId, timeout: Duration) -> SourceError {
    SourceError::unavailable(format!("'{provider}' call timed out after {timeout:?}"))
}

/// Builder assembling a [`MarketEngine`] from adapters, chains, and policy.
pub struct EngineBuilder {
    registry: ProviderRegistry,
    cache_ttl: Duration,
    race_policy: RacePolicy,
    quote_asset: String,
    forex_pairs: Vec<Symbol>,
    reference_days: i64,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            registry: ProviderRegistry::new(),
            cache_ttl: Duration::from_secs(60),
            race_policy: RacePolicy::default(),
            quote_asset: DEFAULT_QUOTE_ASSET.to_owned(),
            forex_pairs: SymbolTranslator::forex_pairs(),
            reference_days: DEFAULT_REFERENCE_DAYS,
        }
    }

    /// Register the production provider set over a shared `reqwest`
    /// transport: Binance and Bybit for crypto, Frankfurter for forex, the
    /// quote-chart service for equities/commodities/indices.
    pub fn with_default_providers(mut self) -> Self {
        let timeout_ms = env::var("MARKETMUX_HTTP_TIMEOUT_MS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or(10_000);

        let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
        self.registry
            .register(Arc::new(BinanceAdapter::with_timeout_ms(http.clone(), timeout_ms)));
        self.registry
            .register(Arc::new(BybitAdapter::with_timeout_ms(http.clone(), timeout_ms)));
        self.registry.register(Arc::new(FrankfurterAdapter::with_timeout_ms(
            http.clone(),
            timeout_ms,
        )));
        self.registry
            .register(Arc::new(YahooChartAdapter::with_timeout_ms(http, timeout_ms)));

        self.registry
            .set_chain(AssetClass::Crypto, vec![ProviderId::Binance, ProviderId::Bybit]);
        self.registry
            .set_chain(AssetClass::Forex, vec![ProviderId::Frankfurter]);
        for asset_class in [AssetClass::Equity, AssetClass::Commodity, AssetClass::Index] {
            self.registry.set_chain(asset_class, vec![ProviderId::Yahoo]);
        }

        self.registry
            .set_default_timeout(Duration::from_millis(timeout_ms));
        self
    }

    /// Apply `MARKETMUX_CACHE_TTL_SECS` and `MARKETMUX_RACE_POLICY`
    /// environment overrides.
    pub fn from_env(mut self) -> Self {
        if let Some(ttl) = env::var("MARKETMUX_CACHE_TTL_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
        {
            self.cache_ttl = Duration::from_secs(ttl);
        }
        if let Ok(raw) = env::var("MARKETMUX_RACE_POLICY") {
            match RacePolicy::from_str(&raw) {
                Ok(policy) => self.race_policy = policy,
                Err(error) => log::warn!("ignoring MARKETMUX_RACE_POLICY: {error}"),
            }
        }
        self
    }

    /// Register an arbitrary adapter (fakes included).
    pub fn register(mut self, adapter: Arc<dyn MarketSource>) -> Self {
        self.registry.register(adapter);
        self
    }

    pub fn with_chain(mut self, asset_class: AssetClass, chain: Vec<ProviderId>) -> Self {
        self.registry.set_chain(asset_class, chain);
        self
    }

    pub fn with_timeout(mut self, provider: ProviderId, timeout: Duration) -> Self {
        self.registry.set_timeout(provider, timeout);
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.registry.set_default_timeout(timeout);
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_race_policy(mut self, policy: RacePolicy) -> Self {
        self.race_policy = policy;
        self
    }

    pub fn with_quote_asset(mut self, quote_asset: impl Into<String>) -> Self {
        self.quote_asset = quote_asset.into();
        self
    }

    pub fn with_forex_pairs(mut self, pairs: Vec<Symbol>) -> Self {
        self.forex_pairs = pairs;
        self
    }

    pub fn with_reference_days(mut self, days: i64) -> Self {
        self.reference_days = days;
        self
    }

    pub fn build(self) -> MarketEngine {
        MarketEngine {
            registry: self.registry,
            cache: ResponseCache::new(self.cache_ttl),
            race_policy: self.race_policy,
            quote_asset: self.quote_asset,
            forex_pairs: self.forex_pairs,
            reference_days: self.reference_days,
        }
    }
}
