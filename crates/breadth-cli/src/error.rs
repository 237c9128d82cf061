use breadth_core::{BreadthError, CoreError, ValidationError};
use breadth_warehouse::WarehouseError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] CoreError),

    #[error(transparent)]
    Breadth(#[from] BreadthError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("no Schwab access token: pass --access-token, set SCHWAB_ACCESS_TOKEN or use --fixture")]
    MissingCredential,

    #[error("command error: {0}")]
    Command(String),

    #[error("logging setup failed: {0}")]
    Logging(String),

    #[error("strict mode failed: warnings={warning_count}, errors={error_count}")]
    StrictModeViolation {
        warning_count: usize,
        error_count: usize,
    },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Config(_) | Self::Command(_) | Self::MissingCredential => 2,
            Self::Breadth(BreadthError::EmptyResult) => 4,
            Self::Breadth(_) => 3,
            Self::StrictModeViolation { .. } => 5,
            Self::Warehouse(_) => 6,
            Self::Logging(_) => 7,
            Self::Serialization(_) => 8,
            Self::Io(_) => 10,
        }
    }
}
