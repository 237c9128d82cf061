use serde::{Deserialize, Serialize};

use crate::{BreadthError, Symbol, UtcDateTime, ValidationError};

/// One trading day of one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: UtcDateTime,
    pub close: f64,
}

impl DailyBar {
    pub fn new(date: UtcDateTime, close: f64) -> Result<Self, ValidationError> {
        if !close.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "close" });
        }
        if close < 0.0 {
            return Err(ValidationError::NegativeValue { field: "close" });
        }
        Ok(Self { date, close })
    }
}

/// Daily bars of one symbol, strictly ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolSeries {
    symbol: Symbol,
    bars: Vec<DailyBar>,
}

impl SymbolSeries {
    /// Builds a series, rejecting duplicate or out-of-order dates.
    ///
    /// Unsorted input is not repaired: a source that returns it is broken
    /// for that symbol and the caller treats the symbol as missing.
    pub fn new(symbol: Symbol, bars: Vec<DailyBar>) -> Result<Self, BreadthError> {
        if let Some(index) = bars
            .windows(2)
            .position(|pair| pair[1].date <= pair[0].date)
        {
            let (previous, current) = (bars[index].date, bars[index + 1].date);
            let reason = if previous == current {
                format!("duplicate bar at {current}")
            } else {
                format!("bar at {current} follows {previous}")
            };
            return Err(BreadthError::malformed(symbol.as_str(), reason));
        }

        Ok(Self { symbol, bars })
    }

    pub fn empty(symbol: Symbol) -> Self {
        Self {
            symbol,
            bars: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn bars(&self) -> &[DailyBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Whether a symbol closed above its moving average on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalPoint {
    pub date: UtcDateTime,
    pub above_ma: bool,
}

/// Per-symbol signal series, ascending by date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalSeries {
    symbol: Symbol,
    points: Vec<SignalPoint>,
}

impl SignalSeries {
    pub(crate) fn from_sorted(symbol: Symbol, points: Vec<SignalPoint>) -> Self {
        Self { symbol, points }
    }

    pub fn empty(symbol: Symbol) -> Self {
        Self::from_sorted(symbol, Vec::new())
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn points(&self) -> &[SignalPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Signal at `date`, `None` when the symbol has no observation there.
    pub fn above_at(&self, date: UtcDateTime) -> Option<bool> {
        self.points
            .binary_search_by(|point| point.date.cmp(&date))
            .ok()
            .map(|index| self.points[index].above_ma)
    }
}
