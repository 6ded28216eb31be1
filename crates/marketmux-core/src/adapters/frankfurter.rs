//! Frankfurter forex rate adapter.
//!
//! Free-tier ECB reference rates: `/latest?from=&to=` for the current rate
//! and `/{start}..{end}?from=&to=` for the historical daily series. Rates are
//! published on banking days only, so daily series legitimately have weekend
//! gaps. Provider symbols arrive as `BASE/QUOTE`.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use time::macros::format_description;

use crate::adapters::Transport;
use crate::http::HttpClient;
use crate::market_source::{
    CandlesRequest, CapabilitySet, HistoryRequest, MarketSource, RatePoint, SnapshotRequest,
    SourceError, SpotRequest, StatsRequest,
};
use crate::throttling::RateGate;
use crate::{timeframe, Candle, CandleSeries, DayStats, Endpoint, Mover, ProviderId};

const BASE_URL: &str = "https://api.frankfurter.app";
const DAY_MS: i64 = 86_400_000;

pub struct FrankfurterAdapter {
    transport: Transport,
}

impl FrankfurterAdapter {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            transport: Transport::new(ProviderId::Frankfurter, http, RateGate::free_tier()),
        }
    }

    pub fn with_timeout_ms(http: Arc<dyn HttpClient>, timeout_ms: u64) -> Self {
        Self {
            transport: Transport::new(ProviderId::Frankfurter, http, RateGate::free_tier())
                .with_timeout_ms(timeout_ms),
        }
    }

    async fn fetch_spot(&self, req: &SpotRequest) -> Result<f64, SourceError> {
        let (base, quote) = split_pair(&req.provider_symbol)?;
        let url = format!("{BASE_URL}/latest?from={base}&to={quote}");
        let body = self.transport.get_body(&url).await?;

        let latest: FrankfurterLatest = serde_json::from_str(&body).map_err(|e| {
            SourceError::invalid_response(format!("'frankfurter' latest rate did not parse: {e}"))
        })?;

        latest.rates.get(quote).copied().ok_or_else(|| {
            SourceError::invalid_response(format!(
                "'frankfurter' response is missing the '{quote}' rate"
            ))
        })
    }

    async fn fetch_history(&self, req: &HistoryRequest) -> Result<Vec<RatePoint>, SourceError> {
        let iso = format_description!("[year]-[month]-[day]");
        let start = req.start.format(&iso).map_err(|e| {
            SourceError::invalid_request(format!("history start date did not format: {e}"))
        })?;
        let end = req.end.format(&iso).map_err(|e| {
            SourceError::invalid_request(format!("history end date did not format: {e}"))
        })?;

        let url = format!("{BASE_URL}/{start}..{end}?from={}&to={}", req.base, req.quote);
        let body = self.transport.get_body(&url).await?;

        let series: FrankfurterSeries = serde_json::from_str(&body).map_err(|e| {
            SourceError::invalid_response(format!("'frankfurter' rate series did not parse: {e}"))
        })?;

        // BTreeMap keys are ISO dates, so iteration order is chronological.
        let mut points = Vec::with_capacity(series.rates.len());
        for (date_raw, rates) in &series.rates {
            let date = time::Date::parse(date_raw, &iso).map_err(|_| {
                SourceError::invalid_response(format!(
                    "'frankfurter' series contains a malformed date: '{date_raw}'"
                ))
            })?;
            let rate = rates.get(&req.quote).copied().ok_or_else(|| {
                SourceError::invalid_response(format!(
                    "'frankfurter' series is missing the '{}' rate on {date_raw}",
                    req.quote
                ))
            })?;
            points.push(RatePoint { date, rate });
        }

        Ok(points)
    }

    /// Daily point-sample candles derived from the rate series. The service
    /// publishes one closing rate per banking day, so each candle collapses
    /// to that sample with zero volume.
    async fn fetch_candles(&self, req: &CandlesRequest) -> Result<CandleSeries, SourceError> {
        let plan = timeframe::plan_for(ProviderId::Frankfurter, req.interval).ok_or_else(|| {
            SourceError::unsupported_interval(ProviderId::Frankfurter, req.interval)
        })?;

        let (base, quote) = split_pair(&req.provider_symbol)?;
        let native_count = req.limit * plan.group;
        let end = time::OffsetDateTime::now_utc().date();
        // Calendar window padded for weekends and ECB holidays.
        let span_days = (native_count as i64) * 2 + 7;
        let start = end
            .checked_sub(time::Duration::days(span_days))
            .ok_or_else(|| SourceError::invalid_request("history window underflows calendar"))?;

        let history = self
            .fetch_history(&HistoryRequest::new(base, quote, start, end)?)
            .await?;

        let mut candles = Vec::with_capacity(history.len().min(native_count));
        for point in history.iter().rev().take(native_count).rev() {
            let open_time = point.date.midnight().assume_utc().unix_timestamp() * 1_000;
            candles.push(Candle::new(
                open_time,
                point.rate,
                point.rate,
                point.rate,
                point.rate,
                0.0,
                open_time + DAY_MS,
            )?);
        }

        let derived = timeframe::keep_recent(timeframe::synthesize(&candles, plan.group), req.limit);
        Ok(CandleSeries::new(req.canonical.clone(), req.interval, derived))
    }
}

impl MarketSource for FrankfurterAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Frankfurter
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, true, false, false, true)
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
                ProviderId::Frankfurter,
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
                ProviderId::Frankfurter,
                Endpoint::Snapshot,
            ))
        })
    }

    fn rate_history<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RatePoint>, SourceError>> + Send + 'a>> {
        Box::pin(async move { self.fetch_history(&req).await })
    }
}

fn split_pair(provider_symbol: &str) -> Result<(&str, &str), SourceError> {
    provider_symbol.split_once('/').ok_or_else(|| {
        SourceError::invalid_request(format!(
            "forex provider symbol must be BASE/QUOTE, got '{provider_symbol}'"
        ))
    })
}

#[derive(Debug, Deserialize)]
struct FrankfurterLatest {
    rates: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct FrankfurterSeries {
    rates: BTreeMap<String, HashMap<String, f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpError, HttpRequest, HttpResponse};

    struct StaticHttpClient {
        body: &'static str,
    }

    impl HttpClient for StaticHttpClient {
        fn execute<'a>(
            &'a self,
            _request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            let body = self.body;
            Box::pin(async move { Ok(HttpResponse::ok_json(body)) })
        }
    }

    fn adapter(body: &'static str) -> FrankfurterAdapter {
        FrankfurterAdapter::new(Arc::new(StaticHttpClient { body }))
    }

    #[tokio::test]
    async fn spot_extracts_the_quote_rate() {
        let rate = adapter(r#"{"amount":1.0,"base":"EUR","date":"2024-03-01","rates":{"USD":1.0856}}"#)
            .spot(SpotRequest::new("EUR/USD"))
            .await
            .expect("rate");
        assert_eq!(rate, 1.0856);
    }

    #[tokio::test]
    async fn missing_quote_rate_is_invalid_response() {
        let error = adapter(r#"{"amount":1.0,"base":"EUR","date":"2024-03-01","rates":{"GBP":0.85}}"#)
            .spot(SpotRequest::new("EUR/USD"))
            .await
            .expect_err("must fail");
        assert_eq!(error.kind(), crate::SourceErrorKind::InvalidResponse);
    }

    #[tokio::test]
    async fn history_is_chronological_despite_object_keys() {
        let adapter = adapter(
            r#"{
                "amount":1.0,"base":"EUR","start_date":"2024-01-02","end_date":"2024-01-04",
                "rates":{
                    "2024-01-04":{"USD":1.0950},
                    "2024-01-02":{"USD":1.0920},
                    "2024-01-03":{"USD":1.0890}
                }
            }"#,
        );
        let req = HistoryRequest::new(
            "EUR",
            "USD",
            time::macros::date!(2024 - 01 - 02),
            time::macros::date!(2024 - 01 - 04),
        )
        .expect("request");

        let points = adapter.rate_history(req).await.expect("series");
        assert_eq!(points.len(), 3);
        assert!(points.windows(2).all(|pair| pair[0].date < pair[1].date));
        assert_eq!(points[0].rate, 1.0920);
        assert_eq!(points[2].rate, 1.0950);
    }

    #[tokio::test]
    async fn malformed_pair_is_rejected_before_any_call() {
        let error = adapter("{}")
            .spot(SpotRequest::new("EURUSD"))
            .await
            .expect_err("must fail");
        assert_eq!(error.kind(), crate::SourceErrorKind::InvalidRequest);
    }
}
