//! Binance spot REST adapter.
//!
//! Endpoints: `/api/v3/ticker/price` (spot), `/api/v3/klines` (candles),
//! `/api/v3/ticker/24hr` with and without a symbol (stats, full snapshot).
//! Prices arrive as decimal strings; klines as positional arrays.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;

use crate::adapters::{parse_decimal, Transport};
use crate::http::HttpClient;
use crate::market_source::{
    CandlesRequest, CapabilitySet, HistoryRequest, MarketSource, RatePoint, SnapshotRequest,
    SourceError, SpotRequest, StatsRequest,
};
use crate::throttling::RateGate;
use crate::{timeframe, Candle, CandleSeries, DayStats, Endpoint, Mover, ProviderId, Symbol};

const BASE_URL: &str = "https://api.binance.com";
const MAX_KLINES: usize = 1_000;

pub struct BinanceAdapter {
    transport: Transport,
}

impl BinanceAdapter {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            transport: Transport::new(ProviderId::Binance, http, RateGate::exchange_tier()),
        }
    }

    pub fn with_timeout_ms(http: Arc<dyn HttpClient>, timeout_ms: u64) -> Self {
        Self {
            transport: Transport::new(ProviderId::Binance, http, RateGate::exchange_tier())
                .with_timeout_ms(timeout_ms),
        }
    }

    async fn fetch_spot(&self, req: &SpotRequest) -> Result<f64, SourceError> {
        let url = format!(
            "{BASE_URL}/api/v3/ticker/price?symbol={}",
            urlencoding::encode(&req.provider_symbol)
        );
        let body = self.transport.get_body(&url).await?;

        let ticker: BinancePriceTicker = serde_json::from_str(&body).map_err(|e| {
            SourceError::invalid_response(format!("'binance' price ticker did not parse: {e}"))
        })?;

        parse_decimal(ProviderId::Binance, "price", &ticker.price)
    }

    async fn fetch_candles(&self, req: &CandlesRequest) -> Result<CandleSeries, SourceError> {
        let plan = timeframe::plan_for(ProviderId::Binance, req.interval)
            .ok_or_else(|| SourceError::unsupported_interval(ProviderId::Binance, req.interval))?;

        let native_limit = (req.limit * plan.group).min(MAX_KLINES);
        let url = format!(
            "{BASE_URL}/api/v3/klines?symbol={}&interval={}&limit={native_limit}",
            urlencoding::encode(&req.provider_symbol),
            plan.token
        );
        let body = self.transport.get_body(&url).await?;

        let rows: Vec<Vec<serde_json::Value>> = serde_json::from_str(&body).map_err(|e| {
            SourceError::invalid_response(format!("'binance' klines did not parse: {e}"))
        })?;

        let step_ms = plan.native.duration_ms();
        let mut candles = Vec::with_capacity(rows.len());
        for row in &rows {
            let open_time = row_int(row, 0)?;
            let open = row_decimal(row, 1)?;
            let high = row_decimal(row, 2)?;
            let low = row_decimal(row, 3)?;
            let close = row_decimal(row, 4)?;
            let volume = row_decimal(row, 5)?;

            // Binance closes klines at open + interval - 1ms; normalize to the
            // exact bucket width.
            candles.push(Candle::new(
                open_time,
                open,
                high,
                low,
                close,
                volume,
                open_time + step_ms,
            )?);
        }

        let derived = timeframe::keep_recent(timeframe::synthesize(&candles, plan.group), req.limit);
        Ok(CandleSeries::new(req.canonical.clone(), req.interval, derived))
    }

    async fn fetch_day_stats(&self, req: &StatsRequest) -> Result<DayStats, SourceError> {
        let url = format!(
            "{BASE_URL}/api/v3/ticker/24hr?symbol={}",
            urlencoding::encode(&req.provider_symbol)
        );
        let body = self.transport.get_body(&url).await?;

        let ticker: BinanceDayTicker = serde_json::from_str(&body).map_err(|e| {
            SourceError::invalid_response(format!("'binance' 24hr ticker did not parse: {e}"))
        })?;

        ticker.into_day_stats()
    }

    async fn fetch_snapshot(&self, req: &SnapshotRequest) -> Result<Vec<Mover>, SourceError> {
        let url = format!("{BASE_URL}/api/v3/ticker/24hr");
        let body = self.transport.get_body(&url).await?;

        let tickers: Vec<BinanceDayTicker> = serde_json::from_str(&body).map_err(|e| {
            SourceError::invalid_response(format!("'binance' ticker snapshot did not parse: {e}"))
        })?;

        let movers = tickers
            .iter()
            .filter(|ticker| ticker.symbol.ends_with(&req.quote_asset))
            .filter_map(|ticker| ticker.to_mover())
            .collect();

        Ok(movers)
    }
}

impl MarketSource for BinanceAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Binance
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, true, true, true, false)
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
        req: StatsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<DayStats, SourceError>> + Send + 'a>> {
        Box::pin(async move { self.fetch_day_stats(&req).await })
    }

    fn snapshot<'a>(
        &'a self,
        req: SnapshotRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Mover>, SourceError>> + Send + 'a>> {
        Box::pin(async move { self.fetch_snapshot(&req).await })
    }

    fn rate_history<'a>(
        &'a self,
        _req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RatePoint>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            Err(SourceError::unsupported_endpoint(
                ProviderId::Binance,
                Endpoint::History,
            ))
        })
    }
}

#[derive(Debug, Deserialize)]
struct BinancePriceTicker {
    price: String,
}

#[derive(Debug, Deserialize)]
struct BinanceDayTicker {
    symbol: String,
    #[serde(rename = "priceChange")]
    price_change: String,
    #[serde(rename = "priceChangePercent")]
    price_change_percent: String,
    #[serde(rename = "lastPrice")]
    last_price: String,
    #[serde(rename = "highPrice")]
    high_price: String,
    #[serde(rename = "lowPrice")]
    low_price: String,
    volume: String,
}

impl BinanceDayTicker {
    fn into_day_stats(self) -> Result<DayStats, SourceError> {
        Ok(DayStats {
            price_change: parse_decimal(ProviderId::Binance, "priceChange", &self.price_change)?,
            price_change_percent: parse_decimal(
                ProviderId::Binance,
                "priceChangePercent",
                &self.price_change_percent,
            )?,
            last_price: parse_decimal(ProviderId::Binance, "lastPrice", &self.last_price)?,
            high_price: parse_decimal(ProviderId::Binance, "highPrice", &self.high_price)?,
            low_price: parse_decimal(ProviderId::Binance, "lowPrice", &self.low_price)?,
            volume: parse_decimal(ProviderId::Binance, "volume", &self.volume)?,
        })
    }

    /// Snapshot rows with unparsable fields are skipped, not fatal.
    fn to_mover(&self) -> Option<Mover> {
        let symbol = Symbol::parse(&self.symbol).ok()?;
        let price = self.last_price.trim().parse::<f64>().ok()?;
        let change_percent = self.price_change_percent.trim().parse::<f64>().ok()?;
        (price.is_finite() && price > 0.0 && change_percent.is_finite()).then(|| Mover {
            symbol,
            price,
            change_percent,
        })
    }
}

fn row_int(row: &[serde_json::Value], index: usize) -> Result<i64, SourceError> {
    row.get(index).and_then(serde_json::Value::as_i64).ok_or_else(|| {
        SourceError::invalid_response(format!(
            "'binance' kline row is missing integer column {index}"
        ))
    })
}

fn row_decimal(row: &[serde_json::Value], index: usize) -> Result<f64, SourceError> {
    let raw = row
        .get(index)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| {
            SourceError::invalid_response(format!(
                "'binance' kline row is missing decimal column {index}"
            ))
        })?;
    parse_decimal(ProviderId::Binance, "kline", raw)
}
