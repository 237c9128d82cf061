use ::duckdb::Connection;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_breadth_tables",
        sql: r#"
CREATE SEQUENCE IF NOT EXISTS breadth_run_seq START 1;

CREATE TABLE IF NOT EXISTS breadth_runs (
    run_id TEXT PRIMARY KEY,
    seq BIGINT NOT NULL DEFAULT nextval('breadth_run_seq'),
    generated_at TEXT NOT NULL,
    source TEXT,
    time_zone TEXT NOT NULL,
    policy TEXT NOT NULL,
    ma_window INTEGER NOT NULL,
    threshold_high DOUBLE NOT NULL,
    threshold_low DOUBLE NOT NULL,
    start_date DATE,
    end_date DATE,
    sector_count INTEGER NOT NULL,
    symbols_requested INTEGER NOT NULL,
    symbols_with_signal INTEGER NOT NULL,
    date_collisions INTEGER NOT NULL,
    saved_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS market_breadth (
    run_id TEXT NOT NULL,
    date DATE NOT NULL,
    score DOUBLE NOT NULL,
    zone TEXT NOT NULL,
    PRIMARY KEY(run_id, date)
);

CREATE TABLE IF NOT EXISTS sector_breadth (
    run_id TEXT NOT NULL,
    date DATE NOT NULL,
    sector TEXT NOT NULL,
    sector_ordinal INTEGER NOT NULL,
    score DOUBLE NOT NULL,
    PRIMARY KEY(run_id, date, sector)
);
"#,
    },
    Migration {
        version: "0002_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_breadth_runs_seq ON breadth_runs(seq);
CREATE INDEX IF NOT EXISTS idx_market_breadth_date ON market_breadth(date);
CREATE INDEX IF NOT EXISTS idx_sector_breadth_sector_date ON sector_breadth(sector, date);
"#,
    },
];

pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            [migration.version],
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                [migration.version],
            )?;
        }
    }

    Ok(())
}

pub fn applied_versions(connection: &Connection) -> Result<Vec<String>, ::duckdb::Error> {
    let mut statement =
        connection.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
    let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
    rows.collect()
}
