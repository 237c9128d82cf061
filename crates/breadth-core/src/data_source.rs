//! Price source contract and request/response types.
//!
//! Every adapter that can deliver daily close history implements
//! [`PriceSource`]. The breadth pipeline only sees this trait, so it runs
//! the same against the live Schwab endpoint and against in-memory fixtures.
//!
//! # Example
//!
//! ```rust,ignore
//! use breadth_core::{FixturePriceSource, PriceHistoryRequest, PriceSource, Symbol};
//!
//! async fn closes(source: &FixturePriceSource) -> Result<(), breadth_core::SourceError> {
//!     let request = PriceHistoryRequest::daily(Symbol::parse("AAPL")?);
//!     let series = source.fetch(request).await?;
//!     println!("{} bars for {}", series.len(), series.symbol());
//!     Ok(())
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Frequency, Lookback, Symbol, SymbolSeries, ValidationError};

/// Known price source implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Schwab,
    Fixture,
}

impl SourceId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Schwab => "schwab",
            Self::Fixture => "fixture",
        }
    }
}

impl Display for SourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "schwab" => Ok(Self::Schwab),
            "fixture" => Ok(Self::Fixture),
            other => Err(format!("unknown price source '{other}'")),
        }
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    Unauthorized,
    InvalidRequest,
    EmptyPayload,
    MalformedPayload,
    Internal,
}

/// Structured source error. The pipeline turns every one of these into
/// missing data for the symbol it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unauthorized,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn empty_payload(symbol: &Symbol) -> Self {
        Self {
            kind: SourceErrorKind::EmptyPayload,
            message: format!("no candles returned for {symbol}"),
            retryable: false,
        }
    }

    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::MalformedPayload,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::Unauthorized => "source.unauthorized",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::EmptyPayload => "source.empty_payload",
            SourceErrorKind::MalformedPayload => "source.malformed_payload",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

impl From<ValidationError> for SourceError {
    fn from(error: ValidationError) -> Self {
        Self::invalid_request(error.to_string())
    }
}

/// Request payload for one symbol's price history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceHistoryRequest {
    pub symbol: Symbol,
    pub lookback: Lookback,
    pub frequency: Frequency,
}

impl PriceHistoryRequest {
    pub fn new(symbol: Symbol, lookback: Lookback, frequency: Frequency) -> Self {
        Self {
            symbol,
            lookback,
            frequency,
        }
    }

    /// Three years of daily bars.
    pub fn daily(symbol: Symbol) -> Self {
        Self::new(symbol, Lookback::default(), Frequency::Daily)
    }
}

/// Source adapter contract.
///
/// Implementations must be `Send + Sync`; the pipeline shares one source
/// across concurrently running fetch tasks.
pub trait PriceSource: Send + Sync {
    /// Returns the source identifier.
    fn id(&self) -> SourceId;

    /// Fetches the close history of one symbol, ascending by date.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the upstream is unreachable, rejects the
    /// request, or answers with an empty or unparsable payload.
    fn fetch<'a>(
        &'a self,
        req: PriceHistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<SymbolSeries, SourceError>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_request_defaults_to_three_years() {
        let request = PriceHistoryRequest::daily(Symbol::parse("aapl").expect("symbol"));
        assert_eq!(request.lookback, Lookback::default());
        assert_eq!(request.frequency, Frequency::Daily);
        assert_eq!(request.symbol.as_str(), "AAPL");
    }

    #[test]
    fn error_codes_are_stable() {
        let symbol = Symbol::parse("XOM").expect("symbol");
        assert_eq!(SourceError::empty_payload(&symbol).code(), "source.empty_payload");
        assert!(SourceError::rate_limited("slow down").retryable());
        assert!(!SourceError::unauthorized("expired").retryable());
    }

    #[test]
    fn parses_source_ids() {
        assert_eq!("Schwab".parse::<SourceId>(), Ok(SourceId::Schwab));
        assert!("yahoo".parse::<SourceId>().is_err());
    }
}
