//! Database views for analytical queries.

use ::duckdb::Connection;

/// Create database views over the breadth tables.
///
/// - `vw_latest_run`: the most recently saved run
/// - `vw_latest_market_breadth`: market series of the latest run
/// - `vw_latest_sector_breadth`: sector scores of the latest run
/// - `vw_market_extremes`: every non-neutral market point across runs
///
/// # Errors
/// Returns an error if the view creation SQL fails to execute.
pub fn create_views(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r"
CREATE OR REPLACE VIEW vw_latest_run AS
SELECT *
FROM breadth_runs
ORDER BY seq DESC
LIMIT 1;

CREATE OR REPLACE VIEW vw_latest_market_breadth AS
SELECT m.date, m.score, m.zone
FROM market_breadth m
JOIN vw_latest_run r ON r.run_id = m.run_id
ORDER BY m.date;

CREATE OR REPLACE VIEW vw_latest_sector_breadth AS
SELECT s.date, s.sector, s.score
FROM sector_breadth s
JOIN vw_latest_run r ON r.run_id = s.run_id
ORDER BY s.date, s.sector_ordinal;

CREATE OR REPLACE VIEW vw_market_extremes AS
SELECT run_id, date, score, zone
FROM market_breadth
WHERE zone <> 'neutral';
",
    )?;

    Ok(())
}
