use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::breadth::{MissingPolicy, SectorBreadth, TradingZone};
use crate::{BreadthError, SectorId, TradingDate, UtcDateTime};

/// Aggregate breadth on one calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketPoint {
    pub date: TradingDate,
    /// Sum of sector scores; ranges over `[0, 100 * sectors]`.
    pub score: f64,
}

/// Market breadth series, ascending by calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketBreadth {
    points: Vec<MarketPoint>,
}

impl MarketBreadth {
    pub fn points(&self) -> &[MarketPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn score_at(&self, date: TradingDate) -> Option<f64> {
        self.points
            .binary_search_by(|point| point.date.cmp(&date))
            .ok()
            .map(|index| self.points[index].score)
    }

    pub fn first(&self) -> Option<&MarketPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&MarketPoint> {
        self.points.last()
    }
}

/// One heatmap row: a date and one score per sector column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixRow {
    pub date: TradingDate,
    pub scores: Vec<f64>,
}

/// Dense date x sector table of sector scores. Absent cells hold `0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorMatrix {
    sectors: Vec<SectorId>,
    rows: Vec<MatrixRow>,
}

impl SectorMatrix {
    pub fn sectors(&self) -> &[SectorId] {
        &self.sectors
    }

    pub fn rows(&self) -> &[MatrixRow] {
        &self.rows
    }

    pub fn dates(&self) -> impl Iterator<Item = TradingDate> + '_ {
        self.rows.iter().map(|row| row.date)
    }

    pub fn value(&self, date: TradingDate, sector: &SectorId) -> Option<f64> {
        let column = self.sectors.iter().position(|candidate| candidate == sector)?;
        let row = self
            .rows
            .binary_search_by(|row| row.date.cmp(&date))
            .ok()?;
        self.rows[row].scores.get(column).copied()
    }
}

/// Market aggregation result plus the number of instants that collapsed
/// onto an already-populated calendar date.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketAggregate {
    pub market: MarketBreadth,
    pub matrix: SectorMatrix,
    pub date_collisions: usize,
}

/// Sums sector scores per day and builds the sector matrix.
pub fn aggregate_market(
    sectors: &[SectorBreadth],
    policy: MissingPolicy,
    zone: &TradingZone,
) -> Result<(MarketBreadth, SectorMatrix), BreadthError> {
    aggregate_market_detailed(sectors, policy, zone).map(|aggregate| (aggregate.market, aggregate.matrix))
}

/// Like [`aggregate_market`], also reporting date collisions.
///
/// Arithmetic runs on UTC instants. Each instant is then mapped once to a
/// calendar date in `zone`; when two instants map to the same date the later
/// one is kept.
pub fn aggregate_market_detailed(
    sectors: &[SectorBreadth],
    policy: MissingPolicy,
    zone: &TradingZone,
) -> Result<MarketAggregate, BreadthError> {
    let instants: BTreeSet<UtcDateTime> = sectors
        .iter()
        .flat_map(|sector| sector.scores().iter().map(|point| point.date))
        .collect();
    if instants.is_empty() {
        return Err(BreadthError::EmptyResult);
    }

    let total_sectors = sectors.len();
    let mut by_date: BTreeMap<TradingDate, (UtcDateTime, f64, Vec<f64>)> = BTreeMap::new();
    let mut date_collisions = 0;

    for instant in instants {
        let cells: Vec<Option<f64>> = sectors
            .iter()
            .map(|sector| sector.score_at(instant))
            .collect();
        let present = cells.iter().flatten().count();
        let sum: f64 = cells.iter().flatten().sum();
        let score = match policy {
            MissingPolicy::TreatAsZero => sum,
            MissingPolicy::Exclude => sum * total_sectors as f64 / present as f64,
        };
        let row = cells.into_iter().map(|cell| cell.unwrap_or(0.0)).collect();

        let date = zone.trading_date(instant);
        if let Some((previous, _, _)) = by_date.insert(date, (instant, score, row)) {
            date_collisions += 1;
            warn!(
                %date,
                kept = %instant,
                dropped = %previous,
                zone = zone.name(),
                "two instants map to the same trading date; keeping the later one"
            );
        }
    }

    let mut points = Vec::with_capacity(by_date.len());
    let mut rows = Vec::with_capacity(by_date.len());
    for (date, (_, score, scores)) in by_date {
        points.push(MarketPoint { date, score });
        rows.push(MatrixRow { date, scores });
    }

    Ok(MarketAggregate {
        market: MarketBreadth { points },
        matrix: SectorMatrix {
            sectors: sectors.iter().map(|sector| sector.sector().clone()).collect(),
            rows,
        },
        date_collisions,
    })
}
