use serde::{Deserialize, Serialize};

use crate::breadth::{MarketBreadth, MissingPolicy, SectorMatrix};
use crate::{SectorId, Symbol, TradingDate, UtcDateTime, ValidationError};

/// Reference lines drawn on the market breadth chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreadthThresholds {
    pub high: f64,
    pub low: f64,
}

impl Default for BreadthThresholds {
    fn default() -> Self {
        Self {
            high: 900.0,
            low: 200.0,
        }
    }
}

impl BreadthThresholds {
    pub fn new(high: f64, low: f64) -> Result<Self, ValidationError> {
        let thresholds = Self { high, low };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.high.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "high" });
        }
        if !self.low.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "low" });
        }
        if self.low >= self.high {
            return Err(ValidationError::InvalidThresholds {
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }

    pub fn classify(&self, score: f64) -> BreadthZone {
        if score >= self.high {
            BreadthZone::ExtremeHigh
        } else if score <= self.low {
            BreadthZone::ExtremeLow
        } else {
            BreadthZone::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreadthZone {
    ExtremeHigh,
    Neutral,
    ExtremeLow,
}

impl BreadthZone {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExtremeHigh => "extreme_high",
            Self::Neutral => "neutral",
            Self::ExtremeLow => "extreme_low",
        }
    }
}

/// Market breadth point annotated with its threshold zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportPoint {
    pub date: TradingDate,
    pub score: f64,
    pub zone: BreadthZone,
}

/// What happened to one symbol during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SymbolOutcome {
    Ok { bars: usize, signals: usize },
    /// Fewer bars than the moving-average window.
    InsufficientHistory { bars: usize },
    Missing { code: String, reason: String },
    Malformed { reason: String },
}

impl SymbolOutcome {
    pub const fn has_signal(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolDiagnostic {
    pub symbol: Symbol,
    #[serde(flatten)]
    pub outcome: SymbolOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SectorStatus {
    Complete,
    /// Some members produced no signal.
    Partial { missing: Vec<Symbol> },
    Missing { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorDiagnostic {
    pub sector: SectorId,
    pub roster_size: usize,
    #[serde(flatten)]
    pub status: SectorStatus,
}

/// Degraded contributors of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub symbols: Vec<SymbolDiagnostic>,
    pub sectors: Vec<SectorDiagnostic>,
    pub date_collisions: usize,
}

impl RunDiagnostics {
    pub fn symbols_requested(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbols_with_signal(&self) -> usize {
        self.symbols
            .iter()
            .filter(|entry| entry.outcome.has_signal())
            .count()
    }

    pub fn degraded_symbols(&self) -> impl Iterator<Item = &SymbolDiagnostic> {
        self.symbols
            .iter()
            .filter(|entry| !entry.outcome.has_signal())
    }

    pub fn missing_sectors(&self) -> impl Iterator<Item = &SectorDiagnostic> {
        self.sectors
            .iter()
            .filter(|entry| matches!(entry.status, SectorStatus::Missing { .. }))
    }

    /// Human-readable summary lines, one per degraded contributor class.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let degraded = self.degraded_symbols().count();
        if degraded > 0 {
            let names: Vec<&str> = self
                .degraded_symbols()
                .map(|entry| entry.symbol.as_str())
                .collect();
            warnings.push(format!(
                "{degraded} of {} symbols produced no signal: {}",
                self.symbols_requested(),
                names.join(", ")
            ));
        }

        for sector in self.missing_sectors() {
            if let SectorStatus::Missing { reason } = &sector.status {
                warnings.push(format!("sector {} has no breadth data: {reason}", sector.sector));
            }
        }

        if self.date_collisions > 0 {
            warnings.push(format!(
                "{} instants collapsed onto an existing trading date",
                self.date_collisions
            ));
        }

        warnings
    }
}

/// Chart- and persistence-ready result of one breadth run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreadthReport {
    pub generated_at: UtcDateTime,
    pub time_zone: String,
    pub policy: MissingPolicy,
    pub ma_window: usize,
    pub thresholds: BreadthThresholds,
    pub start: Option<TradingDate>,
    pub end: Option<TradingDate>,
    pub points: Vec<ReportPoint>,
    pub matrix: SectorMatrix,
    pub diagnostics: RunDiagnostics,
}

impl BreadthReport {
    pub fn new(
        market: &MarketBreadth,
        matrix: SectorMatrix,
        thresholds: BreadthThresholds,
        context: ReportContext,
        diagnostics: RunDiagnostics,
    ) -> Self {
        let points = market
            .points()
            .iter()
            .map(|point| ReportPoint {
                date: point.date,
                score: point.score,
                zone: thresholds.classify(point.score),
            })
            .collect();

        Self {
            generated_at: context.generated_at,
            time_zone: context.time_zone,
            policy: context.policy,
            ma_window: context.ma_window,
            thresholds,
            start: market.first().map(|point| point.date),
            end: market.last().map(|point| point.date),
            points,
            matrix,
            diagnostics,
        }
    }

    pub fn latest(&self) -> Option<&ReportPoint> {
        self.points.last()
    }

    pub fn score_at(&self, date: TradingDate) -> Option<f64> {
        self.points
            .binary_search_by(|point| point.date.cmp(&date))
            .ok()
            .map(|index| self.points[index].score)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Run parameters recorded alongside the series.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportContext {
    pub generated_at: UtcDateTime,
    pub time_zone: String,
    pub policy: MissingPolicy,
    pub ma_window: usize,
}
