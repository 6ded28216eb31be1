//! Shared test doubles for engine behavior tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use marketmux_core::{
    Candle, CandleSeries, CandlesRequest, CapabilitySet, DayStats, HistoryRequest, Interval,
    MarketSource, Mover, ProviderId, RatePoint, SnapshotRequest, SourceError, SpotRequest,
    StatsRequest, Symbol,
};

type Scripted<T> = Option<Result<T, String>>;

/// Configurable fake provider. Endpoints answer with the scripted value (or
/// scripted failure message) after an optional delay; unscripted endpoints
/// report themselves as unsupported through the capability matrix.
pub struct FakeSource {
    provider: ProviderId,
    delay: Duration,
    spot: Scripted<f64>,
    candles: Scripted<Vec<Candle>>,
    stats: Scripted<DayStats>,
    snapshot: Scripted<Vec<Mover>>,
    history: Scripted<Vec<f64>>,
    pub spot_calls: AtomicUsize,
    pub candles_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            delay: Duration::ZERO,
            spot: None,
            candles: None,
            stats: None,
            snapshot: None,
            history: None,
            spot_calls: AtomicUsize::new(0),
            candles_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_spot(mut self, price: f64) -> Self {
        self.spot = Some(Ok(price));
        self
    }

    pub fn with_spot_failure(mut self, message: &str) -> Self {
        self.spot = Some(Err(message.to_owned()));
        self
    }

    pub fn with_candles(mut self, candles: Vec<Candle>) -> Self {
        self.candles = Some(Ok(candles));
        self
    }

    pub fn with_candles_failure(mut self, message: &str) -> Self {
        self.candles = Some(Err(message.to_owned()));
        self
    }

    pub fn with_stats(mut self, stats: DayStats) -> Self {
        self.stats = Some(Ok(stats));
        self
    }

    pub fn with_snapshot(mut self, movers: Vec<Mover>) -> Self {
        self.snapshot = Some(Ok(movers));
        self
    }

    pub fn with_snapshot_failure(mut self, message: &str) -> Self {
        self.snapshot = Some(Err(message.to_owned()));
        self
    }

    /// Daily rates handed out as one point per day from the requested start.
    pub fn with_history(mut self, rates: Vec<f64>) -> Self {
        self.history = Some(Ok(rates));
        self
    }

    pub fn with_history_failure(mut self, message: &str) -> Self {
        self.history = Some(Err(message.to_owned()));
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn resolve<T: Clone>(script: &Scripted<T>) -> Result<T, SourceError> {
        match script {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(message)) => Err(SourceError::unavailable(message.clone())),
            None => Err(SourceError::unavailable("endpoint not scripted")),
        }
    }
}

impl MarketSource for FakeSource {
    fn id(&self) -> ProviderId {
        self.provider
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(
            self.spot.is_some(),
            self.candles.is_some(),
            self.stats.is_some(),
            self.snapshot.is_some(),
            self.history.is_some(),
        )
    }

    fn spot<'a>(
        &'a self,
        _req: SpotRequest,
    ) -> Pin<Box<dyn Future<Output = Result<f64, SourceError>> + Send + 'a>> {
        self.spot_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay;
        let outcome = Self::resolve(&self.spot);
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            outcome
        })
    }

    fn candles<'a>(
        &'a self,
        req: CandlesRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CandleSeries, SourceError>> + Send + 'a>> {
        self.candles_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay;
        let outcome = Self::resolve(&self.candles);
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            let candles = outcome?;
            Ok(CandleSeries::new(req.canonical, req.interval, candles))
        })
    }

    fn day_stats<'a>(
        &'a self,
        _req: StatsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<DayStats, SourceError>> + Send + 'a>> {
        let delay = self.delay;
        let outcome = Self::resolve(&self.stats);
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            outcome
        })
    }

    fn snapshot<'a>(
        &'a self,
        _req: SnapshotRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Mover>, SourceError>> + Send + 'a>> {
        let delay = self.delay;
        let outcome = Self::resolve(&self.snapshot);
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            outcome
        })
    }

    fn rate_history<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RatePoint>, SourceError>> + Send + 'a>> {
        let delay = self.delay;
        let outcome = Self::resolve(&self.history);
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            let rates = outcome?;
            let points = rates
                .into_iter()
                .enumerate()
                .filter_map(|(index, rate)| {
                    let date = req.start.checked_add(time::Duration::days(index as i64))?;
                    Some(RatePoint { date, rate })
                })
                .collect();
            Ok(points)
        })
    }
}

/// A run of well-formed candles starting at epoch zero.
pub fn candle_run(count: usize, interval: Interval) -> Vec<Candle> {
    let step = interval.duration_ms();
    (0..count)
        .map(|index| {
            let base = 100.0 + index as f64;
            Candle::new(
                index as i64 * step,
                base,
                base + 2.0,
                base - 1.0,
                base + 1.0,
                10.0,
                (index as i64 + 1) * step,
            )
            .expect("fixture candle is valid")
        })
        .collect()
}

pub fn mover(symbol: &str, change: f64) -> Mover {
    Mover {
        symbol: Symbol::parse(symbol).expect("fixture symbol is valid"),
        price: 1.0,
        change_percent: change,
    }
}

pub fn stats_with_last(last_price: f64) -> DayStats {
    DayStats {
        price_change: 10.0,
        price_change_percent: 1.0,
        last_price,
        high_price: last_price.max(1.0) * 1.1,
        low_price: last_price.max(1.0) * 0.9,
        volume: 100.0,
    }
}
