//! # Domain Models
//!
//! Canonical value types for breadth computation.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DailyBar`] | One close for one trading day |
//! | [`SymbolSeries`] | Strictly ascending daily bars of one symbol |
//! | [`SignalSeries`] | Above-moving-average flags of one symbol |
//! | [`SectorRoster`] | Static symbol list of one sector |
//! | [`Universe`] | All configured rosters |
//! | [`Symbol`] / [`SectorId`] | Validated identifiers |
//! | [`UtcDateTime`] | UTC instant as delivered by price sources |
//! | [`TradingDate`] | Calendar date after time-zone normalization |
//! | [`Lookback`] / [`Frequency`] | Price-history request shape |
//!
//! All types validate their invariants at construction and are never
//! mutated afterwards.

mod models;
mod period;
mod symbol;
mod timestamp;
mod universe;

pub use models::{DailyBar, SignalPoint, SignalSeries, SymbolSeries};
pub use period::{Frequency, Lookback, PeriodType};
pub use symbol::{SectorId, Symbol};
pub use timestamp::{TradingDate, UtcDateTime};
pub use universe::{SectorRoster, Universe};
