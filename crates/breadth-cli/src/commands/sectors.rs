use breadth_core::{BreadthConfig, SectorId, Symbol};
use serde::Serialize;

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct SectorEntry<'a> {
    sector: &'a SectorId,
    roster_size: usize,
    symbols: &'a [Symbol],
}

#[derive(Debug, Serialize)]
struct SectorsResponseData<'a> {
    sector_count: usize,
    distinct_symbols: usize,
    /// Upper bound of the market score for this universe.
    max_market_score: f64,
    sectors: Vec<SectorEntry<'a>>,
}

pub fn run(config: &BreadthConfig) -> Result<CommandResult, CliError> {
    let universe = &config.universe;
    let sectors = universe
        .rosters()
        .iter()
        .map(|roster| SectorEntry {
            sector: &roster.sector,
            roster_size: roster.len(),
            symbols: &roster.symbols,
        })
        .collect();

    let data = SectorsResponseData {
        sector_count: universe.sector_count(),
        distinct_symbols: universe.distinct_symbols().len(),
        max_market_score: 100.0 * universe.sector_count() as f64,
        sectors,
    };

    Ok(CommandResult::ok(serde_json::to_value(&data)?, None))
}
