use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::breadth::MissingPolicy;
use crate::{BreadthError, SectorId, SectorRoster, SignalSeries, Symbol, UtcDateTime};

/// Sector score at one UTC instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SectorScore {
    pub date: UtcDateTime,
    /// Percentage of counted members above their moving average, `[0, 100]`.
    pub score: f64,
    /// Members with a signal at this date.
    pub reporting: usize,
}

/// Per-day breadth of one sector, ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorBreadth {
    sector: SectorId,
    roster_size: usize,
    scores: Vec<SectorScore>,
}

impl SectorBreadth {
    /// Rebuilds a sector series from stored scores.
    ///
    /// Dates must strictly increase and every score must lie in `[0, 100]`.
    pub fn from_scores(
        sector: SectorId,
        roster_size: usize,
        scores: Vec<(UtcDateTime, f64)>,
    ) -> Result<Self, BreadthError> {
        if scores.windows(2).any(|pair| pair[1].0 <= pair[0].0) {
            return Err(BreadthError::malformed(
                sector.as_str(),
                "sector scores must be strictly ascending by date",
            ));
        }
        if let Some((date, score)) = scores
            .iter()
            .find(|(_, score)| !(0.0..=100.0).contains(score))
        {
            return Err(BreadthError::malformed(
                sector.as_str(),
                format!("score {score} at {date} is outside [0, 100]"),
            ));
        }

        Ok(Self {
            sector,
            roster_size,
            scores: scores
                .into_iter()
                .map(|(date, score)| SectorScore {
                    date,
                    score,
                    reporting: roster_size,
                })
                .collect(),
        })
    }

    pub fn sector(&self) -> &SectorId {
        &self.sector
    }

    pub fn roster_size(&self) -> usize {
        self.roster_size
    }

    pub fn scores(&self) -> &[SectorScore] {
        &self.scores
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn score_at(&self, date: UtcDateTime) -> Option<f64> {
        self.scores
            .binary_search_by(|point| point.date.cmp(&date))
            .ok()
            .map(|index| self.scores[index].score)
    }
}

/// Folds the signals of one roster into a per-day percentage.
///
/// The date axis is the union of all member dates. Signals of symbols that
/// are not in the roster are ignored.
pub fn aggregate_sector(
    roster: &SectorRoster,
    signals: &HashMap<Symbol, SignalSeries>,
    policy: MissingPolicy,
) -> Result<SectorBreadth, BreadthError> {
    let scope = format!("sector {}", roster.sector);
    if roster.is_empty() {
        return Err(BreadthError::missing(scope, "roster is empty"));
    }

    // date -> (members above, members reporting)
    let mut tally: BTreeMap<UtcDateTime, (usize, usize)> = BTreeMap::new();
    for symbol in &roster.symbols {
        let Some(series) = signals.get(symbol) else {
            continue;
        };
        for point in series.points() {
            let entry = tally.entry(point.date).or_insert((0, 0));
            entry.0 += usize::from(point.above_ma);
            entry.1 += 1;
        }
    }

    if tally.is_empty() {
        return Err(BreadthError::missing(
            scope,
            "no member produced a signal",
        ));
    }

    let roster_size = roster.len();
    let scores = tally
        .into_iter()
        .map(|(date, (above, reporting))| {
            let denominator = match policy {
                MissingPolicy::TreatAsZero => roster_size,
                MissingPolicy::Exclude => reporting,
            };
            SectorScore {
                date,
                score: 100.0 * above as f64 / denominator as f64,
                reporting,
            }
        })
        .collect();

    Ok(SectorBreadth {
        sector: roster.sector.clone(),
        roster_size,
        scores,
    })
}
