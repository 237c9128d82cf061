//! # Breadth Warehouse
//!
//! DuckDB store for breadth run snapshots.
//!
//! Every run is saved once, under its run id, in a single transaction:
//! one `breadth_runs` row, the market series and the dense sector matrix.
//! Snapshots are never updated in place; a later run is a new snapshot.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use breadth_warehouse::{QueryGuardrails, Warehouse};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open_default()?;
//!
//!     if let Some(run) = warehouse.latest_run()? {
//!         let market = warehouse.load_market_breadth(&run.run_id)?;
//!         println!("{} points in run {}", market.len(), run.run_id);
//!     }
//!
//!     let result = warehouse.execute_query(
//!         "SELECT * FROM vw_market_extremes ORDER BY date DESC",
//!         QueryGuardrails::default(),
//!     )?;
//!     println!("{} extreme readings", result.row_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `breadth_runs` | One row per saved run: parameters and symbol counts |
//! | `market_breadth` | Market score and zone per run and date |
//! | `sector_breadth` | Sector score per run, date and sector |
//! | `schema_migrations` | Applied migration versions |
//!
//! ## Views
//!
//! | View | Description |
//! |------|-------------|
//! | `vw_latest_run` | Most recently saved run |
//! | `vw_latest_market_breadth` | Market series of the latest run |
//! | `vw_latest_sector_breadth` | Sector matrix of the latest run, long form |
//! | `vw_market_extremes` | Non-neutral market readings across runs |

pub mod duckdb;
pub mod error;
pub mod migrations;
pub mod views;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use ::duckdb::types::Value as DuckValue;
use ::duckdb::{Connection, ToSql};
use breadth_core::{
    BreadthReport, BreadthThresholds, BreadthZone, MissingPolicy, SectorId, TradingDate,
    UtcDateTime,
};
use serde::Serialize;
use serde_json::{Number, Value};
use tracing::{debug, info};

pub use duckdb::{DuckDbConnectionManager, PooledConnection};
pub use error::WarehouseError;

const ENV_HOME: &str = "BREADTH_HOME";
const DB_FILE: &str = "warehouse.duckdb";

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for breadth data.
    pub home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept in the pool.
    pub max_pool_size: usize,
}

impl WarehouseConfig {
    pub fn for_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let db_path = home.join(DB_FILE);
        Self {
            home,
            db_path,
            max_pool_size: 4,
        }
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self::for_home(resolve_breadth_home())
    }
}

/// Guardrails for ad-hoc queries.
#[derive(Debug, Clone, Copy)]
pub struct QueryGuardrails {
    /// Maximum number of rows to return.
    pub max_rows: usize,
    /// Query timeout in milliseconds.
    pub query_timeout_ms: u64,
}

impl Default for QueryGuardrails {
    fn default() -> Self {
        Self {
            max_rows: 10_000,
            query_timeout_ms: 5_000,
        }
    }
}

impl QueryGuardrails {
    fn timeout(self) -> Duration {
        Duration::from_millis(self.query_timeout_ms.max(1))
    }

    fn validate(self) -> Result<(), WarehouseError> {
        if self.max_rows == 0 {
            return Err(WarehouseError::QueryRejected(String::from(
                "--max-rows must be greater than zero",
            )));
        }
        if self.query_timeout_ms == 0 {
            return Err(WarehouseError::QueryRejected(String::from(
                "--query-timeout-ms must be greater than zero",
            )));
        }
        Ok(())
    }
}

/// Column metadata for query results.
#[derive(Debug, Clone, Serialize)]
pub struct SqlColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub r#type: String,
}

/// Result of a guarded SQL query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<SqlColumn>,
    /// Row data as JSON values; blobs are hex encoded.
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
    /// Whether rows were dropped because of `max_rows`.
    pub truncated: bool,
}

/// Stored parameters and counts of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub run_id: String,
    pub generated_at: UtcDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub time_zone: String,
    pub policy: MissingPolicy,
    pub ma_window: usize,
    pub thresholds: BreadthThresholds,
    pub start: Option<TradingDate>,
    pub end: Option<TradingDate>,
    pub sector_count: usize,
    pub symbols_requested: usize,
    pub symbols_with_signal: usize,
    pub date_collisions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketBreadthRow {
    pub date: TradingDate,
    pub score: f64,
    pub zone: BreadthZone,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorBreadthRow {
    pub date: TradingDate,
    pub sector: SectorId,
    pub score: f64,
}

/// What [`Warehouse::save_snapshot`] wrote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotSummary {
    pub run: RunRecord,
    pub market_rows: usize,
    pub sector_rows: usize,
}

/// Breadth snapshot store.
#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Open the warehouse under `$BREADTH_HOME` (default `~/.breadth`).
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open (creating if needed) the database and bring the schema up to date.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::open(config.db_path.clone(), config.max_pool_size)?;
        let warehouse = Self { config, manager };
        warehouse.initialize()?;
        debug!(path = %warehouse.db_path().display(), "warehouse opened");
        Ok(warehouse)
    }

    /// Apply pending migrations and (re)create views.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        views::create_views(&connection)?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    pub fn home(&self) -> &Path {
        &self.config.home
    }

    /// Persist `report` under `run_id`.
    ///
    /// All rows are written in one transaction with parameterized
    /// statements; a failure leaves no partial snapshot behind. A run id can
    /// be saved only once.
    pub fn save_snapshot(
        &self,
        run_id: &str,
        source: Option<&str>,
        report: &BreadthReport,
    ) -> Result<SnapshotSummary, WarehouseError> {
        let run_id = run_id.trim();
        if run_id.is_empty() {
            return Err(WarehouseError::EmptyRunId);
        }

        let connection = self.manager.acquire()?;
        if run_exists(&connection, run_id)? {
            return Err(WarehouseError::DuplicateRun {
                run_id: run_id.to_owned(),
            });
        }

        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(usize, usize), WarehouseError> {
            insert_run(&connection, run_id, source, report)?;

            let mut market_insert = connection.prepare(
                "INSERT INTO market_breadth (run_id, date, score, zone) \
                 VALUES (?, CAST(? AS DATE), ?, ?)",
            )?;
            for point in &report.points {
                let date = point.date.to_string();
                let params: [&dyn ToSql; 4] =
                    [&run_id, &date, &point.score, &point.zone.as_str()];
                market_insert.execute(params.as_slice())?;
            }

            let mut sector_insert = connection.prepare(
                "INSERT INTO sector_breadth (run_id, date, sector, sector_ordinal, score) \
                 VALUES (?, CAST(? AS DATE), ?, ?, ?)",
            )?;
            let sectors = report.matrix.sectors();
            let mut sector_rows = 0;
            for row in report.matrix.rows() {
                let date = row.date.to_string();
                for (ordinal, (sector, score)) in sectors.iter().zip(&row.scores).enumerate() {
                    let ordinal = to_i64(ordinal);
                    let params: [&dyn ToSql; 5] =
                        [&run_id, &date, &sector.as_str(), &ordinal, score];
                    sector_insert.execute(params.as_slice())?;
                    sector_rows += 1;
                }
            }

            Ok((report.points.len(), sector_rows))
        })();

        let (market_rows, sector_rows) = finalize_transaction(&connection, result)?;
        let run = load_run(&connection, run_id)?.ok_or_else(|| WarehouseError::RunNotFound {
            run_id: run_id.to_owned(),
        })?;

        info!(
            run_id,
            market_rows,
            sector_rows,
            "saved breadth snapshot"
        );
        Ok(SnapshotSummary {
            run,
            market_rows,
            sector_rows,
        })
    }

    /// Most recently saved run, if any.
    pub fn latest_run(&self) -> Result<Option<RunRecord>, WarehouseError> {
        let mut runs = self.list_runs(1)?;
        Ok(runs.pop())
    }

    /// Up to `limit` runs, newest first.
    pub fn list_runs(&self, limit: usize) -> Result<Vec<RunRecord>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let sql = format!("{RUN_COLUMNS} ORDER BY seq DESC LIMIT ?");
        let mut statement = connection.prepare(&sql)?;
        let rows = statement.query_map([to_i64(limit)], RawRun::from_row)?;

        let mut runs = Vec::new();
        for row in rows {
            runs.push(row?.into_record()?);
        }
        Ok(runs)
    }

    pub fn run(&self, run_id: &str) -> Result<Option<RunRecord>, WarehouseError> {
        let connection = self.manager.acquire()?;
        load_run(&connection, run_id)
    }

    /// Market series of `run_id`, ascending by date.
    pub fn load_market_breadth(
        &self,
        run_id: &str,
    ) -> Result<Vec<MarketBreadthRow>, WarehouseError> {
        let connection = self.manager.acquire()?;
        ensure_run(&connection, run_id)?;

        let mut statement = connection.prepare(
            "SELECT CAST(date AS VARCHAR), score, zone FROM market_breadth \
             WHERE run_id = ? ORDER BY date",
        )?;
        let rows = statement.query_map([run_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut points = Vec::new();
        for row in rows {
            let (date, score, zone) = row?;
            points.push(MarketBreadthRow {
                date: parse_date(&date)?,
                score,
                zone: parse_zone(&zone)?,
            });
        }
        Ok(points)
    }

    /// Sector matrix of `run_id` in long form, by date then column order.
    pub fn load_sector_breadth(
        &self,
        run_id: &str,
    ) -> Result<Vec<SectorBreadthRow>, WarehouseError> {
        let connection = self.manager.acquire()?;
        ensure_run(&connection, run_id)?;

        let mut statement = connection.prepare(
            "SELECT CAST(date AS VARCHAR), sector, score FROM sector_breadth \
             WHERE run_id = ? ORDER BY date, sector_ordinal",
        )?;
        let rows = statement.query_map([run_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })?;

        let mut cells = Vec::new();
        for row in rows {
            let (date, sector, score) = row?;
            cells.push(SectorBreadthRow {
                date: parse_date(&date)?,
                sector: SectorId::parse(&sector)
                    .map_err(|error| WarehouseError::InvalidData(error.to_string()))?,
                score,
            });
        }
        Ok(cells)
    }

    /// Run a single read-only statement (SELECT, WITH, EXPLAIN, SHOW,
    /// DESCRIBE) under `guardrails`.
    pub fn execute_query(
        &self,
        sql: &str,
        guardrails: QueryGuardrails,
    ) -> Result<QueryResult, WarehouseError> {
        guardrails.validate()?;
        let sql = normalize_sql(sql)?;
        enforce_read_only_query(sql)?;

        let connection = self.manager.acquire()?;
        execute_select_query(&connection, sql, guardrails, Instant::now())
    }
}

const RUN_COLUMNS: &str = "SELECT run_id, generated_at, source, time_zone, policy, ma_window, \
     threshold_high, threshold_low, CAST(start_date AS VARCHAR), CAST(end_date AS VARCHAR), \
     sector_count, symbols_requested, symbols_with_signal, date_collisions FROM breadth_runs";

/// Untyped `breadth_runs` row as read from `DuckDB`.
struct RawRun {
    run_id: String,
    generated_at: String,
    source: Option<String>,
    time_zone: String,
    policy: String,
    ma_window: i64,
    threshold_high: f64,
    threshold_low: f64,
    start_date: Option<String>,
    end_date: Option<String>,
    sector_count: i64,
    symbols_requested: i64,
    symbols_with_signal: i64,
    date_collisions: i64,
}

impl RawRun {
    fn from_row(row: &::duckdb::Row<'_>) -> Result<Self, ::duckdb::Error> {
        Ok(Self {
            run_id: row.get(0)?,
            generated_at: row.get(1)?,
            source: row.get(2)?,
            time_zone: row.get(3)?,
            policy: row.get(4)?,
            ma_window: row.get(5)?,
            threshold_high: row.get(6)?,
            threshold_low: row.get(7)?,
            start_date: row.get(8)?,
            end_date: row.get(9)?,
            sector_count: row.get(10)?,
            symbols_requested: row.get(11)?,
            symbols_with_signal: row.get(12)?,
            date_collisions: row.get(13)?,
        })
    }

    fn into_record(self) -> Result<RunRecord, WarehouseError> {
        let invalid = |error: breadth_core::ValidationError| {
            WarehouseError::InvalidData(error.to_string())
        };

        Ok(RunRecord {
            generated_at: UtcDateTime::parse(&self.generated_at).map_err(invalid)?,
            source: self.source,
            time_zone: self.time_zone,
            policy: self.policy.parse().map_err(invalid)?,
            ma_window: to_usize(self.ma_window, "ma_window")?,
            thresholds: BreadthThresholds {
                high: self.threshold_high,
                low: self.threshold_low,
            },
            start: self.start_date.as_deref().map(parse_date).transpose()?,
            end: self.end_date.as_deref().map(parse_date).transpose()?,
            sector_count: to_usize(self.sector_count, "sector_count")?,
            symbols_requested: to_usize(self.symbols_requested, "symbols_requested")?,
            symbols_with_signal: to_usize(self.symbols_with_signal, "symbols_with_signal")?,
            date_collisions: to_usize(self.date_collisions, "date_collisions")?,
            run_id: self.run_id,
        })
    }
}

fn insert_run(
    connection: &Connection,
    run_id: &str,
    source: Option<&str>,
    report: &BreadthReport,
) -> Result<(), WarehouseError> {
    let generated_at = report.generated_at.format_rfc3339();
    let start = report.start.map(|date| date.to_string());
    let end = report.end.map(|date| date.to_string());
    let ma_window = to_i64(report.ma_window);
    let sector_count = to_i64(report.matrix.sectors().len());
    let symbols_requested = to_i64(report.diagnostics.symbols_requested());
    let symbols_with_signal = to_i64(report.diagnostics.symbols_with_signal());
    let date_collisions = to_i64(report.diagnostics.date_collisions);

    let params: [&dyn ToSql; 14] = [
        &run_id,
        &generated_at,
        &source,
        &report.time_zone,
        &report.policy.as_str(),
        &ma_window,
        &report.thresholds.high,
        &report.thresholds.low,
        &start,
        &end,
        &sector_count,
        &symbols_requested,
        &symbols_with_signal,
        &date_collisions,
    ];
    connection.execute(
        "INSERT INTO breadth_runs \
         (run_id, generated_at, source, time_zone, policy, ma_window, threshold_high, \
          threshold_low, start_date, end_date, sector_count, symbols_requested, \
          symbols_with_signal, date_collisions) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, CAST(? AS DATE), CAST(? AS DATE), ?, ?, ?, ?)",
        params.as_slice(),
    )?;
    Ok(())
}

fn load_run(connection: &Connection, run_id: &str) -> Result<Option<RunRecord>, WarehouseError> {
    let sql = format!("{RUN_COLUMNS} WHERE run_id = ?");
    let mut statement = connection.prepare(&sql)?;
    let mut rows = statement.query_map([run_id], RawRun::from_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?.into_record()?)),
        None => Ok(None),
    }
}

fn run_exists(connection: &Connection, run_id: &str) -> Result<bool, WarehouseError> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(*) FROM breadth_runs WHERE run_id = ?",
        [run_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn ensure_run(connection: &Connection, run_id: &str) -> Result<(), WarehouseError> {
    if run_exists(connection, run_id)? {
        Ok(())
    } else {
        Err(WarehouseError::RunNotFound {
            run_id: run_id.to_owned(),
        })
    }
}

/// Finalize a transaction, committing on success or rolling back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn execute_select_query(
    connection: &Connection,
    sql: &str,
    guardrails: QueryGuardrails,
    started: Instant,
) -> Result<QueryResult, WarehouseError> {
    let mut statement = connection.prepare(sql)?;
    // Column metadata is only populated after the first execution.
    let _ = statement.query([] as [&dyn ToSql; 0])?;

    let column_count = statement.column_count();
    let mut columns = Vec::with_capacity(column_count);
    for index in 0..column_count {
        let name = statement
            .column_name(index)
            .map_or_else(|_| format!("column_{index}"), ToString::to_string);
        columns.push(SqlColumn {
            name,
            r#type: statement.column_type(index).to_string(),
        });
    }

    let mut rows_cursor = statement.query([] as [&dyn ToSql; 0])?;
    let mut rows = Vec::new();
    let mut truncated = false;

    while let Some(row) = rows_cursor.next()? {
        ensure_timeout(started, guardrails.timeout())?;

        if rows.len() >= guardrails.max_rows {
            truncated = true;
            break;
        }

        rows.push(read_row(row, column_count)?);
    }

    ensure_timeout(started, guardrails.timeout())?;

    Ok(QueryResult {
        columns,
        row_count: rows.len(),
        rows,
        truncated,
    })
}

fn read_row(row: &::duckdb::Row<'_>, column_count: usize) -> Result<Vec<Value>, ::duckdb::Error> {
    let mut output = Vec::with_capacity(column_count);
    for index in 0..column_count {
        let value: DuckValue = row.get(index)?;
        output.push(to_json_value(value));
    }
    Ok(output)
}

fn to_json_value(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(value) => Value::Bool(value),
        DuckValue::TinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::SmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::Int(value) => Value::Number(Number::from(value)),
        DuckValue::BigInt(value) => Value::Number(Number::from(value)),
        DuckValue::UTinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::USmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::UInt(value) => Value::Number(Number::from(value)),
        DuckValue::UBigInt(value) => Value::Number(Number::from(value)),
        DuckValue::Float(value) => number_from_f64(f64::from(value)),
        DuckValue::Double(value) => number_from_f64(value),
        DuckValue::Text(value) => Value::String(value),
        DuckValue::Blob(value) => Value::String(hex::encode(value)),
        other => Value::String(format!("{other:?}")),
    }
}

/// NaN and infinities have no JSON form.
fn number_from_f64(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn normalize_sql(sql: &str) -> Result<&str, WarehouseError> {
    let normalized = sql.trim();
    if normalized.is_empty() {
        return Err(WarehouseError::QueryRejected(String::from(
            "query must not be empty",
        )));
    }
    Ok(normalized.trim_end_matches(';').trim())
}

fn enforce_read_only_query(sql: &str) -> Result<(), WarehouseError> {
    if !is_select_like(sql) {
        return Err(WarehouseError::QueryRejected(String::from(
            "only SELECT/CTE queries are accepted",
        )));
    }
    if has_multiple_statements(sql) {
        return Err(WarehouseError::QueryRejected(String::from(
            "multiple SQL statements are not allowed",
        )));
    }
    Ok(())
}

fn is_select_like(sql: &str) -> bool {
    let first_keyword = sql
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    matches!(
        first_keyword.as_str(),
        "SELECT" | "WITH" | "EXPLAIN" | "SHOW" | "DESCRIBE"
    )
}

fn has_multiple_statements(sql: &str) -> bool {
    sql.split(';')
        .filter(|part| !part.trim().is_empty())
        .count()
        > 1
}

fn ensure_timeout(started: Instant, timeout: Duration) -> Result<(), WarehouseError> {
    if started.elapsed() > timeout {
        return Err(WarehouseError::QueryTimeout {
            timeout_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
        });
    }
    Ok(())
}

fn parse_date(value: &str) -> Result<TradingDate, WarehouseError> {
    TradingDate::parse(value).map_err(|error| WarehouseError::InvalidData(error.to_string()))
}

fn parse_zone(value: &str) -> Result<BreadthZone, WarehouseError> {
    [
        BreadthZone::ExtremeHigh,
        BreadthZone::Neutral,
        BreadthZone::ExtremeLow,
    ]
    .into_iter()
    .find(|zone| zone.as_str() == value)
    .ok_or_else(|| WarehouseError::InvalidData(format!("unknown zone `{value}`")))
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_usize(value: i64, column: &str) -> Result<usize, WarehouseError> {
    usize::try_from(value)
        .map_err(|_| WarehouseError::InvalidData(format!("negative {column}: {value}")))
}

/// `$BREADTH_HOME`, else `$HOME/.breadth`, else `./.breadth`.
fn resolve_breadth_home() -> PathBuf {
    if let Some(path) = env::var_os(ENV_HOME) {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".breadth");
    }

    PathBuf::from(".breadth")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_temp(temp: &tempfile::TempDir) -> Warehouse {
        Warehouse::open(WarehouseConfig::for_home(temp.path().join("breadth-home")))
            .expect("warehouse open")
    }

    #[test]
    fn initializes_tables_and_views() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp(&temp);

        let query = warehouse
            .execute_query(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_name IN ('breadth_runs', 'market_breadth', 'sector_breadth', 'vw_latest_run') \
                 ORDER BY table_name",
                QueryGuardrails::default(),
            )
            .expect("query");
        assert_eq!(query.row_count, 4);
        assert!(warehouse.db_path().ends_with("warehouse.duckdb"));
    }

    #[test]
    fn migrations_are_recorded_once() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp(&temp);
        warehouse.initialize().expect("second initialize");

        let connection = warehouse.manager.acquire().expect("connection");
        let versions = migrations::applied_versions(&connection).expect("versions");
        assert_eq!(versions, vec!["0001_breadth_tables", "0002_indexes"]);
    }

    #[test]
    fn rejects_write_statements() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp(&temp);

        let error = warehouse
            .execute_query("DELETE FROM breadth_runs", QueryGuardrails::default())
            .expect_err("should reject");
        assert!(matches!(error, WarehouseError::QueryRejected(_)));
    }

    #[test]
    fn rejects_stacked_statements() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp(&temp);

        let error = warehouse
            .execute_query(
                "SELECT 1; DROP TABLE breadth_runs",
                QueryGuardrails::default(),
            )
            .expect_err("should reject");
        assert!(matches!(error, WarehouseError::QueryRejected(_)));
    }

    #[test]
    fn truncates_at_max_rows() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp(&temp);

        let result = warehouse
            .execute_query(
                "SELECT * FROM range(10)",
                QueryGuardrails {
                    max_rows: 3,
                    query_timeout_ms: 5_000,
                },
            )
            .expect("query");
        assert_eq!(result.row_count, 3);
        assert!(result.truncated);
    }

    #[test]
    fn rejects_zero_guardrails() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp(&temp);

        let error = warehouse
            .execute_query(
                "SELECT 1",
                QueryGuardrails {
                    max_rows: 0,
                    query_timeout_ms: 5_000,
                },
            )
            .expect_err("should reject");
        assert!(matches!(error, WarehouseError::QueryRejected(_)));
    }

    #[test]
    fn json_conversion_handles_blobs_and_non_finite() {
        assert_eq!(
            to_json_value(DuckValue::Blob(vec![0xde, 0xad])),
            Value::String(String::from("dead"))
        );
        assert_eq!(to_json_value(DuckValue::Double(f64::NAN)), Value::Null);
    }

    #[test]
    fn unknown_run_is_reported() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp(&temp);

        let error = warehouse
            .load_market_breadth("missing-run")
            .expect_err("should fail");
        assert!(matches!(error, WarehouseError::RunNotFound { .. }));
        assert!(warehouse.latest_run().expect("latest").is_none());
    }

    #[test]
    fn zone_names_round_trip() {
        for zone in [
            BreadthZone::ExtremeHigh,
            BreadthZone::Neutral,
            BreadthZone::ExtremeLow,
        ] {
            assert_eq!(parse_zone(zone.as_str()).expect("zone"), zone);
        }
        assert!(parse_zone("hot").is_err());
    }
}
