use breadth_core::BreadthConfig;
use breadth_warehouse::{MarketBreadthRow, RunRecord, SectorBreadthRow, WarehouseError};
use serde::Serialize;

use crate::cli::HistoryArgs;
use crate::error::CliError;

use super::{open_warehouse, CommandResult};

#[derive(Debug, Serialize)]
struct HistoryResponseData {
    runs: Vec<RunRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected: Option<RunRecord>,
    market: Vec<MarketBreadthRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sectors: Option<Vec<SectorBreadthRow>>,
}

pub fn run(args: &HistoryArgs, config: &BreadthConfig) -> Result<CommandResult, CliError> {
    let warehouse = open_warehouse(&config.home_dir())?;
    let runs = warehouse.list_runs(args.limit)?;

    let selected = match &args.run_id {
        Some(run_id) => Some(warehouse.run(run_id)?.ok_or_else(|| {
            WarehouseError::RunNotFound {
                run_id: run_id.clone(),
            }
        })?),
        None => warehouse.latest_run()?,
    };

    let Some(run) = selected else {
        let data = HistoryResponseData {
            runs,
            selected: None,
            market: Vec::new(),
            sectors: None,
        };
        return Ok(CommandResult::ok(serde_json::to_value(&data)?, None)
            .with_warning("no breadth runs saved yet; use `breadth run` first"));
    };

    let market = warehouse.load_market_breadth(&run.run_id)?;
    let sectors = if args.with_sectors {
        Some(warehouse.load_sector_breadth(&run.run_id)?)
    } else {
        None
    };
    let source = run.source.as_deref().and_then(|raw| raw.parse().ok());

    let data = HistoryResponseData {
        runs,
        selected: Some(run),
        market,
        sectors,
    };
    Ok(CommandResult::ok(serde_json::to_value(&data)?, source))
}
