use std::fs;
use std::path::Path;
use std::sync::Arc;

use breadth_core::{
    BreadthConfig, BreadthPipeline, BreadthReport, EnvelopeError, FixturePriceSource, PriceSource,
    ReportPoint, SchwabAdapter, SectorId, SourceId, TradingZone,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;

use super::{open_warehouse, CommandResult};

#[derive(Debug, Serialize)]
struct RunResponseData<'a> {
    run_id: &'a str,
    persisted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest: Option<&'a ReportPoint>,
    report: &'a BreadthReport,
}

pub async fn run(
    args: &RunArgs,
    mut config: BreadthConfig,
    run_id: &str,
) -> Result<CommandResult, CliError> {
    apply_overrides(&mut config, args)?;
    config.validate()?;

    let (source, source_id) = build_source(args, &config)?;
    info!(
        source = %source_id,
        sectors = config.universe.sector_count(),
        policy = %config.policy,
        time_zone = config.time_zone.name(),
        "starting breadth run"
    );

    let pipeline = BreadthPipeline::new(source, &config)?;
    let report = pipeline.run().await?;
    let warnings = report.diagnostics.warnings();

    let output = match &args.output {
        Some(path) => {
            write_report(path, &report)?;
            Some(path.display().to_string())
        }
        None => None,
    };

    let mut errors = Vec::new();
    let persisted = if args.no_persist {
        false
    } else {
        match persist(&config, run_id, source_id, &report) {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, "breadth snapshot was not saved");
                let code = match &error {
                    CliError::Warehouse(inner) => inner.code(),
                    _ => "warehouse.save_failed",
                };
                errors.push(EnvelopeError::new(code, format!("snapshot not saved: {error}"))?);
                false
            }
        }
    };

    let data = RunResponseData {
        run_id,
        persisted,
        output,
        latest: report.latest(),
        report: &report,
    };

    Ok(CommandResult::ok(serde_json::to_value(&data)?, Some(source_id))
        .with_warnings(warnings)
        .with_errors(errors))
}

/// Flags win over the config file and the environment.
fn apply_overrides(config: &mut BreadthConfig, args: &RunArgs) -> Result<(), CliError> {
    if !args.sectors.is_empty() {
        let sectors = args
            .sectors
            .iter()
            .map(|raw| SectorId::parse(raw))
            .collect::<Result<Vec<_>, _>>()?;
        config.universe = config.universe.select(&sectors)?;
    }
    if let Some(policy) = args.policy {
        config.policy = policy.into();
    }
    if let Some(zone) = &args.timezone {
        config.time_zone = TradingZone::parse(zone)?;
    }
    if let Some(max_concurrency) = args.max_concurrency {
        config.fetch.max_concurrency = max_concurrency;
    }
    if let Some(ma_window) = args.ma_window {
        config.ma_window = ma_window;
    }
    if let Some(token) = args
        .access_token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
    {
        config.access_token = Some(token.to_owned());
    }
    Ok(())
}

fn build_source(
    args: &RunArgs,
    config: &BreadthConfig,
) -> Result<(Arc<dyn PriceSource>, SourceId), CliError> {
    if let Some(path) = &args.fixture {
        let fixture = FixturePriceSource::from_file(path)?;
        return Ok((Arc::new(fixture), SourceId::Fixture));
    }

    let token = config
        .access_token
        .clone()
        .ok_or(CliError::MissingCredential)?;
    let adapter = SchwabAdapter::new(token)
        .with_retry(config.fetch.retry.clone())
        .with_timeout_ms(config.fetch.request_timeout_ms);
    Ok((Arc::new(adapter), SourceId::Schwab))
}

fn persist(
    config: &BreadthConfig,
    run_id: &str,
    source_id: SourceId,
    report: &BreadthReport,
) -> Result<(), CliError> {
    let warehouse = open_warehouse(&config.home_dir())?;
    warehouse.save_snapshot(run_id, Some(source_id.as_str()), report)?;
    Ok(())
}

fn write_report(path: &Path, report: &BreadthReport) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, report.to_json_pretty()?)?;
    info!(path = %path.display(), "wrote breadth report");
    Ok(())
}
