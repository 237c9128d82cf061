use tracing::debug;

use crate::{SignalPoint, SignalSeries, SymbolSeries, ValidationError};

/// Moving-average window used by the breadth indicator.
pub const DEFAULT_MA_WINDOW: usize = 20;

/// Turns a symbol's close series into "close above trailing mean" flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalExtractor {
    window: usize,
}

impl Default for SignalExtractor {
    fn default() -> Self {
        Self {
            window: DEFAULT_MA_WINDOW,
        }
    }
}

impl SignalExtractor {
    pub fn new(window: usize) -> Result<Self, ValidationError> {
        if window == 0 {
            return Err(ValidationError::ZeroWindow);
        }
        Ok(Self { window })
    }

    pub const fn window(self) -> usize {
        self.window
    }

    /// Emits one signal per bar that has a full window behind it.
    ///
    /// The window counts observations, not calendar days. The first
    /// `window - 1` bars are dropped; shorter series yield an empty result.
    pub fn extract(self, series: &SymbolSeries) -> SignalSeries {
        let bars = series.bars();
        if bars.len() < self.window {
            debug!(
                symbol = %series.symbol(),
                bars = bars.len(),
                window = self.window,
                "series shorter than moving-average window"
            );
            return SignalSeries::empty(series.symbol().clone());
        }

        let points = bars
            .windows(self.window)
            .map(|window| {
                let current = window[window.len() - 1];
                // close > mean  <=>  sum(close - c_i) > 0; a flat window sums to exactly 0.
                let deviation: f64 = window.iter().map(|bar| current.close - bar.close).sum();
                SignalPoint {
                    date: current.date,
                    above_ma: deviation > 0.0,
                }
            })
            .collect();

        SignalSeries::from_sorted(series.symbol().clone(), points)
    }
}

/// Extracts MA20 signals with the default window.
pub fn extract_signal(series: &SymbolSeries) -> SignalSeries {
    SignalExtractor::default().extract(series)
}
