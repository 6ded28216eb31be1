//! Bybit v5 spot REST adapter.
//!
//! Endpoints: `/v5/market/tickers?category=spot` (spot, stats, snapshot) and
//! `/v5/market/kline?category=spot` (candles). Every payload sits inside the
//! `{retCode, retMsg, result}` envelope; klines arrive newest-first as
//! positional string arrays, and 24h change is a fraction, not a percent.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::adapters::{parse_decimal, Transport};
use crate::http::HttpClient;
use crate::market_source::{
    CandlesRequest, CapabilitySet, HistoryRequest, MarketSource, RatePoint, SnapshotRequest,
    SourceError, SpotRequest, StatsRequest,
};
use crate::throttling::RateGate;
use crate::{timeframe, Candle, CandleSeries, DayStats, Endpoint, Mover, ProviderId, Symbol};

const BASE_URL: &str = "https://api.bybit.com";
const MAX_KLINES: usize = 1_000;

pub struct BybitAdapter {
    transport: Transport,
}

impl BybitAdapter {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            transport: Transport::new(ProviderId::Bybit, http, RateGate::exchange_tier()),
        }
    }

    pub fn with_timeout_ms(http: Arc<dyn HttpClient>, timeout_ms: u64) -> Self {
        Self {
            transport: Transport::new(ProviderId::Bybit, http, RateGate::exchange_tier())
                .with_timeout_ms(timeout_ms),
        }
    }

    async fn fetch_envelope<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let body = self.transport.get_body(url).await?;

        let envelope: BybitEnvelope<T> = serde_json::from_str(&body).map_err(|e| {
            SourceError::invalid_response(format!("'bybit' response did not parse: {e}"))
        })?;

        if envelope.ret_code != 0 {
            return Err(SourceError::unavailable(format!(
                "'bybit' API error {}: {}",
                envelope.ret_code, envelope.ret_msg
            )));
        }

        Ok(envelope.result)
    }

    async fn fetch_ticker(&self, provider_symbol: &str) -> Result<BybitTicker, SourceError> {
        let url = format!(
            "{BASE_URL}/v5/market/tickers?category=spot&symbol={}",
            urlencoding::encode(provider_symbol)
        );
        let result: BybitTickerList = self.fetch_envelope(&url).await?;

        result.list.into_iter().next().ok_or_else(|| {
            SourceError::invalid_response(format!(
                "'bybit' ticker list is empty for '{provider_symbol}'"
            ))
        })
    }

    async fn fetch_candles(&self, req: &CandlesRequest) -> Result<CandleSeries, SourceError> {
        let plan = timeframe::plan_for(ProviderId::Bybit, req.interval)
            .ok_or_else(|| SourceError::unsupported_interval(ProviderId::Bybit, req.interval))?;

        let native_limit = (req.limit * plan.group).min(MAX_KLINES);
        let url = format!(
            "{BASE_URL}/v5/market/kline?category=spot&symbol={}&interval={}&limit={native_limit}",
            urlencoding::encode(&req.provider_symbol),
            plan.token
        );
        let result: BybitKlineList = self.fetch_envelope(&url).await?;

        let step_ms = plan.native.duration_ms();
        let mut candles = Vec::with_capacity(result.list.len());
        // Rows arrive newest-first; walk them backwards into ascending order.
        for row in result.list.iter().rev() {
            if row.len() < 6 {
                return Err(SourceError::invalid_response(format!(
                    "'bybit' kline row has {} columns, expected at least 6",
                    row.len()
                )));
            }

            let open_time = row[0].trim().parse::<i64>().map_err(|_| {
                SourceError::invalid_response(format!(
                    "'bybit' kline start time is not an integer: '{}'",
                    row[0]
                ))
            })?;

            candles.push(Candle::new(
                open_time,
                parse_decimal(ProviderId::Bybit, "open", &row[1])?,
                parse_decimal(ProviderId::Bybit, "high", &row[2])?,
                parse_decimal(ProviderId::Bybit, "low", &row[3])?,
                parse_decimal(ProviderId::Bybit, "close", &row[4])?,
                parse_decimal(ProviderId::Bybit, "volume", &row[5])?,
                open_time + step_ms,
            )?);
        }

        let derived = timeframe::keep_recent(timeframe::synthesize(&candles, plan.group), req.limit);
        Ok(CandleSeries::new(req.canonical.clone(), req.interval, derived))
    }

    async fn fetch_snapshot(&self, req: &SnapshotRequest) -> Result<Vec<Mover>, SourceError> {
        let url = format!("{BASE_URL}/v5/market/tickers?category=spot");
        let result: BybitTickerList = self.fetch_envelope(&url).await?;

        let movers = result
            .list
            .iter()
            .filter(|ticker| ticker.symbol.ends_with(&req.quote_asset))
            .filter_map(BybitTicker::to_mover)
            .collect();

        Ok(movers)
    }
}

impl MarketSource for BybitAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Bybit
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, true, true, true, false)
    }

    fn spot<'a>(
        &'a self,
        req: SpotRequest,
    ) -> Pin<Box<dyn Future<Output = Result<f64, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let ticker = self.fetch_ticker(&req.provider_symbol).await?;
            parse_decimal(ProviderId::Bybit, "lastPrice", &ticker.last_price)
        })
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
        Box::pin(async move {
            let ticker = self.fetch_ticker(&req.provider_symbol).await?;
            ticker.into_day_stats()
        })
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
                ProviderId::Bybit,
                Endpoint::History,
            ))
        })
    }
}

#[derive(Debug, Deserialize)]
struct BybitEnvelope<T> {
    #[serde(rename = "retCode")]
    ret_code: i64,
    #[serde(rename = "retMsg", default)]
    ret_msg: String,
    result: T,
}

#[derive(Debug, Deserialize)]
struct BybitTickerList {
    list: Vec<BybitTicker>,
}

#[derive(Debug, Deserialize)]
struct BybitKlineList {
    list: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct BybitTicker {
    symbol: String,
    #[serde(rename = "lastPrice")]
    last_price: String,
    #[serde(rename = "prevPrice24h")]
    prev_price_24h: String,
    #[serde(rename = "price24hPcnt")]
    price_24h_pcnt: String,
    #[serde(rename = "highPrice24h")]
    high_price_24h: String,
    #[serde(rename = "lowPrice24h")]
    low_price_24h: String,
    #[serde(rename = "volume24h")]
    volume_24h: String,
}

impl BybitTicker {
    fn into_day_stats(self) -> Result<DayStats, SourceError> {
        let last_price = parse_decimal(ProviderId::Bybit, "lastPrice", &self.last_price)?;
        let prev_price = parse_decimal(ProviderId::Bybit, "prevPrice24h", &self.prev_price_24h)?;
        let change_fraction =
            parse_decimal(ProviderId::Bybit, "price24hPcnt", &self.price_24h_pcnt)?;

        Ok(DayStats {
            price_change: last_price - prev_price,
            price_change_percent: change_fraction * 100.0,
            last_price,
            high_price: parse_decimal(ProviderId::Bybit, "highPrice24h", &self.high_price_24h)?,
            low_price: parse_decimal(ProviderId::Bybit, "lowPrice24h", &self.low_price_24h)?,
            volume: parse_decimal(ProviderId::Bybit, "volume24h", &self.volume_24h)?,
        })
    }

    fn to_mover(&self) -> Option<Mover> {
        let symbol = Symbol::parse(&self.symbol).ok()?;
        let price = self.last_price.trim().parse::<f64>().ok()?;
        let change_fraction = self.price_24h_pcnt.trim().parse::<f64>().ok()?;
        (price.is_finite() && price > 0.0 && change_fraction.is_finite()).then(|| Mover {
            symbol,
            price,
            change_percent: change_fraction * 100.0,
        })
    }
}
