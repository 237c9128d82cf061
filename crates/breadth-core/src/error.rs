use thiserror::Error;

/// Validation and contract errors exposed by `breadth-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("sector id cannot be empty")]
    EmptySectorId,
    #[error("sector id '{value}' is invalid")]
    InvalidSectorId { value: String },
    #[error("sector '{sector}' appears more than once in the universe")]
    DuplicateSector { sector: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("timestamp {value}ms is outside the supported range")]
    TimestampOutOfRange { value: i64 },
    #[error("trading date must be YYYY-MM-DD: '{value}'")]
    InvalidTradingDate { value: String },
    #[error("unknown time zone '{value}'")]
    UnknownTimeZone { value: String },

    #[error("invalid period type '{value}', expected one of day, month, year, ytd")]
    InvalidPeriodType { value: String },
    #[error("invalid frequency '{value}', expected one of daily, weekly, monthly")]
    InvalidFrequency { value: String },
    #[error("lookback period must be greater than zero")]
    ZeroLookback,
    #[error("invalid missing-data policy '{value}', expected zero or exclude")]
    InvalidMissingPolicy { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("moving-average window must be greater than zero")]
    ZeroWindow,
    #[error("max concurrency must be greater than zero")]
    ZeroConcurrency,
    #[error("threshold low ({low}) must be below high ({high})")]
    InvalidThresholds { low: f64, high: f64 },

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,
    #[error("schema_version must match vMAJOR.MINOR.PATCH: '{value}'")]
    InvalidSchemaVersion { value: String },
    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,
}

/// Failure taxonomy of the breadth pipeline.
///
/// `MissingData` and `MalformedInput` are absorbed at the symbol or sector
/// level and only show up in diagnostics; `EmptyResult` is terminal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BreadthError {
    #[error("no data for {scope}: {reason}")]
    MissingData { scope: String, reason: String },

    #[error("malformed series for {symbol}: {reason}")]
    MalformedInput { symbol: String, reason: String },

    #[error("no sector produced any breadth data")]
    EmptyResult,
}

impl BreadthError {
    pub fn missing(scope: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MissingData {
            scope: scope.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::EmptyResult)
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingData { .. } => "breadth.missing_data",
            Self::MalformedInput { .. } => "breadth.malformed_input",
            Self::EmptyResult => "breadth.empty_result",
        }
    }
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Breadth(#[from] BreadthError),

    #[error("config file '{path}' could not be read: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
