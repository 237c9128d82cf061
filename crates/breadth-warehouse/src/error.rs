use thiserror::Error;

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error while preparing the warehouse directory.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Query was rejected by the read-only guardrails.
    #[error("query rejected: {0}")]
    QueryRejected(String),

    /// Query execution exceeded its time budget.
    #[error("query timed out after {timeout_ms}ms")]
    QueryTimeout { timeout_ms: u64 },

    /// A stored row could not be turned back into a typed record.
    #[error("invalid stored data: {0}")]
    InvalidData(String),

    #[error("run id must not be empty")]
    EmptyRunId,

    #[error("run `{run_id}` already saved")]
    DuplicateRun { run_id: String },

    #[error("run `{run_id}` not found")]
    RunNotFound { run_id: String },
}

impl WarehouseError {
    /// Stable machine-readable code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::DuckDb(_) => "warehouse.duckdb",
            Self::Io(_) => "warehouse.io",
            Self::QueryRejected(_) => "warehouse.query_rejected",
            Self::QueryTimeout { .. } => "warehouse.query_timeout",
            Self::InvalidData(_) => "warehouse.invalid_data",
            Self::EmptyRunId => "warehouse.empty_run_id",
            Self::DuplicateRun { .. } => "warehouse.duplicate_run",
            Self::RunNotFound { .. } => "warehouse.run_not_found",
        }
    }
}
