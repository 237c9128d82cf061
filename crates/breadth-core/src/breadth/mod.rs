//! # Breadth Engine
//!
//! Pure computation, composed leaf to root:
//!
//! | Stage | Entry point | Output |
//! |-------|-------------|--------|
//! | Signal | [`extract_signal`] | [`SignalSeries`](crate::SignalSeries) |
//! | Sector | [`aggregate_sector`] | [`SectorBreadth`] |
//! | Market | [`aggregate_market`] | [`MarketBreadth`] + [`SectorMatrix`] |
//! | Report | [`BreadthReport::new`] | [`BreadthReport`] |
//!
//! Nothing here performs I/O. Sector arithmetic runs on UTC instants; the
//! market stage is the only place dates are converted to a [`TradingZone`].

mod calendar;
mod market;
mod report;
mod sector;
mod signal;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

pub use calendar::{TradingZone, DEFAULT_TIME_ZONE};
pub use market::{
    aggregate_market, aggregate_market_detailed, MarketAggregate, MarketBreadth, MarketPoint,
    MatrixRow, SectorMatrix,
};
pub use report::{
    BreadthReport, BreadthThresholds, BreadthZone, ReportContext, ReportPoint, RunDiagnostics,
    SectorDiagnostic, SectorStatus, SymbolDiagnostic, SymbolOutcome,
};
pub use sector::{aggregate_sector, SectorBreadth, SectorScore};
pub use signal::{extract_signal, SignalExtractor, DEFAULT_MA_WINDOW};

/// How a contributor without data on a date is counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissingPolicy {
    /// Absent members count as "not above"; absent sectors add 0.
    #[default]
    #[serde(rename = "zero")]
    TreatAsZero,
    /// Absent contributors leave the denominator.
    #[serde(rename = "exclude")]
    Exclude,
}

impl MissingPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TreatAsZero => "zero",
            Self::Exclude => "exclude",
        }
    }
}

impl Display for MissingPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MissingPolicy {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "zero" | "treat_as_zero" => Ok(Self::TreatAsZero),
            "exclude" => Ok(Self::Exclude),
            other => Err(ValidationError::InvalidMissingPolicy {
                value: other.to_owned(),
            }),
        }
    }
}
