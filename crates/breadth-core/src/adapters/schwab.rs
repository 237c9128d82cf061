use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::data_source::{PriceHistoryRequest, PriceSource, SourceError, SourceId};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient};
use crate::retry::RetryPolicy;
use crate::{DailyBar, Frequency, Symbol, SymbolSeries, UtcDateTime};

pub const SCHWAB_PRICE_HISTORY_URL: &str = "https://api.schwabapi.com/marketdata/v1/pricehistory";

/// Schwab market-data `pricehistory` adapter.
///
/// The access token is supplied by the operator; this adapter never
/// acquires or refreshes it.
#[derive(Clone)]
pub struct SchwabAdapter {
    http_client: Arc<dyn HttpClient>,
    auth: HttpAuth,
    base_url: String,
    timeout_ms: u64,
    retry: RetryPolicy,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl SchwabAdapter {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()), access_token)
    }

    pub fn with_http_client(http_client: Arc<dyn HttpClient>, access_token: impl Into<String>) -> Self {
        Self {
            http_client,
            auth: HttpAuth::bearer(access_token),
            base_url: String::from(SCHWAB_PRICE_HISTORY_URL),
            timeout_ms: 10_000,
            retry: RetryPolicy::default(),
            circuit_breaker: Arc::new(CircuitBreaker::default()),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    fn build_request(&self, req: &PriceHistoryRequest) -> HttpRequest {
        let (frequency_type, frequency) = frequency_params(req.frequency);
        HttpRequest::get(&self.base_url)
            .with_query("symbol", req.symbol.as_str())
            .with_query("periodType", req.lookback.period_type.as_str())
            .with_query("period", req.lookback.period)
            .with_query("frequencyType", frequency_type)
            .with_query("frequency", frequency)
            .with_header("accept", "application/json")
            .with_auth(&self.auth)
            .with_timeout_ms(self.timeout_ms)
    }

    async fn execute_with_retry(&self, req: &PriceHistoryRequest) -> Result<HttpResponse, SourceError> {
        let mut attempt = 0_u32;
        loop {
            if !self.circuit_breaker.allow_request() {
                return Err(SourceError::unavailable(
                    "schwab circuit breaker is open; skipping upstream call",
                ));
            }

            let outcome = self.http_client.execute(self.build_request(req)).await;
            let retry_after = match outcome {
                Err(error) => {
                    self.circuit_breaker.record_failure();
                    if !error.retryable() || !self.retry.has_budget(attempt) {
                        return Err(SourceError::unavailable(format!(
                            "schwab transport error for {}: {}",
                            req.symbol,
                            error.message()
                        )));
                    }
                    error.message().to_owned()
                }
                Ok(response) if response.is_success() => {
                    self.circuit_breaker.record_success();
                    return Ok(response);
                }
                Ok(response) if matches!(response.status, 401 | 403) => {
                    return Err(SourceError::unauthorized(format!(
                        "schwab rejected the access token (status {})",
                        response.status
                    )));
                }
                Ok(response) => {
                    self.circuit_breaker.record_failure();
                    if !self.retry.should_retry_status(response.status)
                        || !self.retry.has_budget(attempt)
                    {
                        return Err(status_error(&req.symbol, response.status));
                    }
                    format!("status {}", response.status)
                }
            };

            let delay = self.retry.delay_for_attempt(attempt);
            warn!(
                symbol = %req.symbol,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                reason = %retry_after,
                "retrying schwab price history request"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl PriceSource for SchwabAdapter {
    fn id(&self) -> SourceId {
        SourceId::Schwab
    }

    fn fetch<'a>(
        &'a self,
        req: PriceHistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<SymbolSeries, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let response = self.execute_with_retry(&req).await?;
            let series = parse_price_history(&req.symbol, &response.body)?;
            debug!(symbol = %req.symbol, bars = series.len(), "schwab price history received");
            Ok(series)
        })
    }
}

#[derive(Debug, Deserialize)]
struct SchwabPriceHistory {
    #[serde(default)]
    candles: Vec<SchwabCandle>,
}

#[derive(Debug, Deserialize)]
struct SchwabCandle {
    /// Epoch milliseconds.
    datetime: i64,
    close: f64,
}

/// Parses a `pricehistory` body into a validated series.
pub fn parse_price_history(symbol: &Symbol, body: &str) -> Result<SymbolSeries, SourceError> {
    let payload: SchwabPriceHistory = serde_json::from_str(body).map_err(|error| {
        SourceError::malformed_payload(format!("schwab payload for {symbol} is not valid: {error}"))
    })?;

    if payload.candles.is_empty() {
        return Err(SourceError::empty_payload(symbol));
    }

    let bars = payload
        .candles
        .into_iter()
        .map(|candle| {
            let date = UtcDateTime::from_unix_millis(candle.datetime)?;
            DailyBar::new(date, candle.close)
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| {
            SourceError::malformed_payload(format!("schwab candle for {symbol}: {error}"))
        })?;

    SymbolSeries::new(symbol.clone(), bars)
        .map_err(|error| SourceError::malformed_payload(error.to_string()))
}

const fn frequency_params(frequency: Frequency) -> (&'static str, u32) {
    match frequency {
        Frequency::Daily => ("daily", 1),
        Frequency::Weekly => ("weekly", 1),
        Frequency::Monthly => ("monthly", 1),
    }
}

fn status_error(symbol: &Symbol, status: u16) -> SourceError {
    let message = format!("schwab returned status {status} for {symbol}");
    match status {
        429 => SourceError::rate_limited(message),
        400..=499 => SourceError::invalid_request(message),
        _ => SourceError::unavailable(message),
    }
}
