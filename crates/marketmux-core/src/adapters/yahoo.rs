//! Yahoo quote-chart adapter for equities, commodities, and indices.
//!
//! Single endpoint: `/v8/finance/chart/{code}?interval=&range=`. OHLCV
//! arrays are keyed by a parallel `timestamp` array (seconds); the chart
//! `meta` carries the regular market price used for spot lookups. The chart
//! vocabulary has no `4h` bucket, so that interval is folded from hourly
//! candles per the adapter's fetch plan.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;

use crate::adapters::Transport;
use crate::http::HttpClient;
use crate::market_source::{
    CandlesRequest, CapabilitySet, HistoryRequest, MarketSource, RatePoint, SnapshotRequest,
    SourceError, SpotRequest, StatsRequest,
};
use crate::throttling::RateGate;
use crate::{timeframe, Candle, CandleSeries, DayStats, Endpoint, Interval, Mover, ProviderId};

const BASE_URL: &str = "https://query1.finance.yahoo.com";

pub struct YahooChartAdapter {
    transport: Transport,
}

impl YahooChartAdapter {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            transport: Transport::new(ProviderId::Yahoo, http, RateGate::free_tier()),
        }
    }

    pub fn with_timeout_ms(http: Arc<dyn HttpClient>, timeout_ms: u64) -> Self {
        Self {
            transport: Transport::new(ProviderId::Yahoo, http, RateGate::free_tier())
                .with_timeout_ms(timeout_ms),
        }
    }

    async fn fetch_chart(
        &self,
        provider_symbol: &str,
        interval_token: &str,
        range_token: &str,
    ) -> Result<ChartResult, SourceError> {
        let url = format!(
            "{BASE_URL}/v8/finance/chart/{}?interval={interval_token}&range={range_token}",
            urlencoding::encode(provider_symbol)
        );
        let body = self.transport.get_body(&url).await?;

        let response: ChartResponse = serde_json::from_str(&body).map_err(|e| {
            SourceError::invalid_response(format!("'yahoo' chart did not parse: {e}"))
        })?;

        if let Some(error) = response.chart.error {
            if !error.is_null() {
                return Err(SourceError::unavailable(format!(
                    "'yahoo' chart API error: {error}"
                )));
            }
        }

        response.chart.result.into_iter().flatten().next().ok_or_else(|| {
            SourceError::invalid_response("'yahoo' chart response carries no result")
        })
    }

    async fn fetch_spot(&self, req: &SpotRequest) -> Result<f64, SourceError> {
        let result = self.fetch_chart(&req.provider_symbol, "1d", "1d").await?;
        let price = result.meta.regular_market_price.ok_or_else(|| {
            SourceError::invalid_response("'yahoo' chart meta is missing regularMarketPrice")
        })?;
        Ok(price)
    }

    async fn fetch_candles(&self, req: &CandlesRequest) -> Result<CandleSeries, SourceError> {
        let plan = timeframe::plan_for(ProviderId::Yahoo, req.interval)
            .ok_or_else(|| SourceError::unsupported_interval(ProviderId::Yahoo, req.interval))?;

        let native_count = req.limit * plan.group;
        let range = range_token(plan.native, native_count);
        let result = self.fetch_chart(&req.provider_symbol, plan.token, range).await?;

        let timestamps = result.timestamp.ok_or_else(|| {
            SourceError::invalid_response("'yahoo' chart result has no timestamp array")
        })?;
        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::invalid_response("'yahoo' chart result has no quote block"))?;

        let step_ms = plan.native.duration_ms();
        let mut candles = Vec::with_capacity(timestamps.len());
        for (index, &ts_secs) in timestamps.iter().enumerate() {
            // Rows with any null OHLC slot are halted/partial buckets; skip them.
            let (Some(Some(open)), Some(Some(high)), Some(Some(low)), Some(Some(close))) = (
                quote.open.get(index),
                quote.high.get(index),
                quote.low.get(index),
                quote.close.get(index),
            ) else {
                continue;
            };
            let volume = quote
                .volume
                .get(index)
                .copied()
                .flatten()
                .unwrap_or_default();

            let open_time = ts_secs * 1_000;
            candles.push(Candle::new(
                open_time,
                *open,
                *high,
                *low,
                *close,
                volume as f64,
                open_time + step_ms,
            )?);
        }

        let derived = timeframe::keep_recent(timeframe::synthesize(&candles, plan.group), req.limit);
        Ok(CandleSeries::new(req.canonical.clone(), req.interval, derived))
    }
}

impl MarketSource for YahooChartAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, true, false, false, false)
    }

    fn spot<'a>(
        &'a self,
        req: SpotRequest,
    ) -> Pin<Box<dyn Future<Output = Result<f64, SourceError>> + Send + 'a>> {
        Box::pin(async move { self.fetch_spot(&req).await })
    }

    fn candles<'a>(
        &'a self,
        req: CandlesRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CandleSeries, SourceError>> + Send + 'a>> {
        Box::pin(async move { self.fetch_candles(&req).await })
    }

    fn day_stats<'a>(
        &'a self,
        _req: StatsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<DayStats, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            Err(SourceError::unsupported_endpoint(
                ProviderId::Yahoo,
                Endpoint::Stats,
            ))
        })
    }

    fn snapshot<'a>(
        &'a self,
        _req: SnapshotRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Mover>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            Err(SourceError::unsupported_endpoint(
                ProviderId::Yahoo,
                Endpoint::Snapshot,
            ))
        })
    }

    fn rate_history<'a>(
        &'a self,
        _req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RatePoint>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            Err(SourceError::unsupported_endpoint(
                ProviderId::Yahoo,
                Endpoint::History,
            ))
        })
    }
}

/// Smallest chart range that still covers `count` native buckets.
fn range_token(native: Interval, count: usize) -> &'static str {
    match native {
        Interval::OneMinute => {
            if count <= 300 {
                "1d"
            } else {
                "5d"
            }
        }
        Interval::FiveMinutes | Interval::FifteenMinutes | Interval::ThirtyMinutes => {
            if count <= 100 {
                "5d"
            } else {
                "1mo"
            }
        }
        Interval::OneHour | Interval::FourHours => {
            if count <= 150 {
                "1mo"
            } else {
                "3mo"
            }
        }
        Interval::OneDay => {
            if count <= 60 {
                "3mo"
            } else {
                "1y"
            }
        }
        Interval::OneWeek => {
            if count <= 50 {
                "1y"
            } else {
                "5y"
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartPayload,
}

#[derive(Debug, Deserialize)]
struct ChartPayload {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(rename = "regularMarketPrice", default)]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize, Default)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<i64>>,
}
