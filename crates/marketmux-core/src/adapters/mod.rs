//! Provider adapters.
//!
//! One module per upstream. Each adapter owns its endpoint templates, query
//! parameters, response field paths, and error translation; the shared
//! [`Transport`] concentrates the resilience plumbing (rate gate, circuit
//! breaker, bounded-retry HTTP) so the adapters are translation only.

mod binance;
mod bybit;
mod frankfurter;
mod yahoo;

pub use binance::BinanceAdapter;
pub use bybit::BybitAdapter;
pub use frankfurter::FrankfurterAdapter;
pub use yahoo::YahooChartAdapter;

use std::sync::Arc;

use crate::circuit_breaker::CircuitBreaker;
use crate::http::{HttpClient, HttpRequest};
use crate::throttling::RateGate;
use crate::{ProviderId, SourceError};

/// Guarded GET pipeline shared by every adapter: rate gate, then circuit
/// breaker, then the HTTP call, with failures recorded against the breaker.
pub(crate) struct Transport {
    provider: ProviderId,
    http: Arc<dyn HttpClient>,
    breaker: CircuitBreaker,
    gate: RateGate,
    timeout_ms: u64,
}

impl Transport {
    pub(crate) fn new(provider: ProviderId, http: Arc<dyn HttpClient>, gate: RateGate) -> Self {
        Self {
            provider,
            http,
            breaker: CircuitBreaker::default(),
            gate,
            timeout_ms: 10_000,
        }
    }

    pub(crate) fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub(crate) async fn get_body(&self, url: &str) -> Result<String, SourceError> {
        if !self.gate.acquire() {
            return Err(SourceError::rate_limited(format!(
                "'{}' rate budget is exhausted",
                self.provider
            )));
        }

        if !self.breaker.allow_request() {
            return Err(SourceError::unavailable(format!(
                "'{}' circuit breaker is open; skipping upstream call",
                self.provider
            )));
        }

        let request = HttpRequest::get(url)
            .with_header("accept", "application/json")
            .with_timeout_ms(self.timeout_ms);

        let response = self.http.execute(request).await.map_err(|error| {
            self.breaker.record_failure();
            SourceError::unavailable(format!(
                "'{}' transport error: {}",
                self.provider,
                error.message()
            ))
        })?;

        if !response.is_success() {
            self.breaker.record_failure();
            return Err(SourceError::unavailable(format!(
                "'{}' returned status {}",
                self.provider, response.status
            )));
        }

        self.breaker.record_success();
        Ok(response.body)
    }
}

/// Parse a decimal-string field that providers serve as `"65000.50"`.
pub(crate) fn parse_decimal(
    provider: ProviderId,
    field: &'static str,
    raw: &str,
) -> Result<f64, SourceError> {
    raw.trim().parse::<f64>().map_err(|_| {
        SourceError::invalid_response(format!(
            "'{provider}' field '{field}' is not numeric: '{raw}'"
        ))
    })
}
