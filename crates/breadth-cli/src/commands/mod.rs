mod history;
mod run;
mod sectors;
mod sql;

use std::path::Path;
use std::time::Instant;

use breadth_core::{BreadthConfig, Envelope, EnvelopeError, EnvelopeMeta, SourceId};
use breadth_warehouse::{Warehouse, WarehouseConfig};
use serde_json::Value;
use uuid::Uuid;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub source: Option<SourceId>,
}

impl CommandResult {
    pub fn ok(data: Value, source: Option<SourceId>) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            source,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let started = Instant::now();
    let request_id = Uuid::new_v4().to_string();
    let config = BreadthConfig::load(cli.config.as_deref())?;

    let command_result = match &cli.command {
        Command::Run(args) => run::run(args, config, &request_id).await?,
        Command::Sectors => sectors::run(&config)?,
        Command::History(args) => history::run(args, &config)?,
        Command::Sql(args) => sql::run(args, &config)?,
    };

    let CommandResult {
        data,
        warnings,
        errors,
        source,
    } = command_result;

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let mut meta = EnvelopeMeta::new(request_id, source, latency_ms)?;
    for warning in warnings {
        meta.push_warning(warning);
    }

    Envelope::with_errors(meta, data, errors).map_err(CliError::from)
}

fn open_warehouse(home: &Path) -> Result<Warehouse, CliError> {
    Ok(Warehouse::open(WarehouseConfig::for_home(home))?)
}
