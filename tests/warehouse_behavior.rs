//! Behavior tests for breadth snapshot persistence
//!
//! A run is saved once and read back for charting, history and ad-hoc SQL.

use breadth_core::breadth::ReportContext;
use breadth_core::{
    aggregate_market, BreadthReport, BreadthThresholds, BreadthZone, MissingPolicy,
    RunDiagnostics, SectorBreadth, SectorId, TradingDate, TradingZone, UtcDateTime,
};
use breadth_warehouse::{QueryGuardrails, Warehouse, WarehouseConfig, WarehouseError};
use serde_json::json;
use tempfile::{tempdir, TempDir};

fn open_warehouse(temp: &TempDir) -> Warehouse {
    Warehouse::open(WarehouseConfig::for_home(temp.path().join("home"))).expect("warehouse")
}

fn instant(value: &str) -> UtcDateTime {
    UtcDateTime::parse(value).expect("instant")
}

fn sector(id: &str, scores: &[(&str, f64)]) -> SectorBreadth {
    SectorBreadth::from_scores(
        SectorId::parse(id).expect("sector"),
        10,
        scores.iter().map(|(at, score)| (instant(at), *score)).collect(),
    )
    .expect("sector scores")
}

/// Two sectors over three sessions; XLE skips the last one.
fn sample_report() -> BreadthReport {
    let sectors = vec![
        sector(
            "XLK",
            &[
                ("2024-01-02T21:00:00Z", 90.0),
                ("2024-01-03T21:00:00Z", 100.0),
                ("2024-01-04T21:00:00Z", 10.0),
            ],
        ),
        sector(
            "XLE",
            &[("2024-01-02T21:00:00Z", 80.0), ("2024-01-03T21:00:00Z", 50.0)],
        ),
    ];
    let zone = TradingZone::default();
    let (market, matrix) =
        aggregate_market(&sectors, MissingPolicy::TreatAsZero, &zone).expect("market");

    BreadthReport::new(
        &market,
        matrix,
        BreadthThresholds::new(150.0, 20.0).expect("thresholds"),
        ReportContext {
            generated_at: instant("2024-01-05T00:00:00Z"),
            time_zone: zone.name().to_owned(),
            policy: MissingPolicy::TreatAsZero,
            ma_window: 20,
        },
        RunDiagnostics::default(),
    )
}

fn date(value: &str) -> TradingDate {
    TradingDate::parse(value).expect("date")
}

// =============================================================================
// Saving and loading snapshots
// =============================================================================

#[test]
fn saved_run_reads_back_as_a_chart_ready_series() {
    // Given: A fresh warehouse and a finished report
    let temp = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&temp);
    let report = sample_report();

    // When: The report is saved
    let summary = warehouse
        .save_snapshot("run-1", Some("fixture"), &report)
        .expect("saved");

    // Then: Market rows and the dense sector matrix are written
    assert_eq!(summary.market_rows, 3);
    assert_eq!(summary.sector_rows, 6);
    assert_eq!(summary.run.source.as_deref(), Some("fixture"));
    assert_eq!(summary.run.sector_count, 2);
    assert_eq!(summary.run.start, Some(date("2024-01-02")));
    assert_eq!(summary.run.end, Some(date("2024-01-04")));
    assert_eq!(summary.run.thresholds, report.thresholds);

    // And: The market series keeps scores and zones in date order
    let market = warehouse.load_market_breadth("run-1").expect("market");
    let readings: Vec<(String, f64, BreadthZone)> = market
        .iter()
        .map(|row| (row.date.to_string(), row.score, row.zone))
        .collect();
    assert_eq!(
        readings,
        vec![
            (String::from("2024-01-02"), 170.0, BreadthZone::ExtremeHigh),
            (String::from("2024-01-03"), 150.0, BreadthZone::ExtremeHigh),
            (String::from("2024-01-04"), 10.0, BreadthZone::ExtremeLow),
        ]
    );

    // And: The sector matrix keeps column order and the zero-filled cell
    let cells = warehouse.load_sector_breadth("run-1").expect("sectors");
    assert_eq!(cells.len(), 6);
    assert_eq!(cells[0].sector.as_str(), "XLK");
    assert_eq!(cells[1].sector.as_str(), "XLE");
    let last = &cells[5];
    assert_eq!(last.date, date("2024-01-04"));
    assert_eq!(last.sector.as_str(), "XLE");
    assert_eq!(last.score, 0.0);
}

#[test]
fn history_lists_newest_run_first() {
    // Given: Three saved runs
    let temp = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&temp);
    let report = sample_report();
    for run_id in ["first", "second", "third"] {
        warehouse
            .save_snapshot(run_id, None, &report)
            .expect("saved");
    }

    // When: History is listed with a limit
    let runs = warehouse.list_runs(2).expect("runs");

    // Then: The newest two come back, newest first
    let ids: Vec<&str> = runs.iter().map(|run| run.run_id.as_str()).collect();
    assert_eq!(ids, vec!["third", "second"]);
    assert_eq!(
        warehouse.latest_run().expect("latest").map(|run| run.run_id),
        Some(String::from("third"))
    );
    assert!(warehouse.run("first").expect("lookup").is_some());
}

#[test]
fn run_id_can_only_be_saved_once() {
    // Given: A saved run
    let temp = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&temp);
    let report = sample_report();
    warehouse
        .save_snapshot("run-1", None, &report)
        .expect("first save");

    // When: The same id is saved again
    let error = warehouse
        .save_snapshot(" run-1 ", None, &report)
        .expect_err("duplicate");

    // Then: The save is rejected and the original rows are untouched
    assert!(matches!(error, WarehouseError::DuplicateRun { .. }));
    assert_eq!(error.code(), "warehouse.duplicate_run");
    assert_eq!(warehouse.list_runs(10).expect("runs").len(), 1);
    assert_eq!(warehouse.load_market_breadth("run-1").expect("market").len(), 3);
}

#[test]
fn blank_run_id_is_rejected() {
    let temp = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&temp);

    let error = warehouse
        .save_snapshot("   ", None, &sample_report())
        .expect_err("blank id");

    assert!(matches!(error, WarehouseError::EmptyRunId));
}

#[test]
fn hostile_run_id_is_stored_as_data() {
    // Given: A run id that looks like SQL
    let temp = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&temp);
    let run_id = "x'); DROP TABLE breadth_runs; --";

    // When: It is saved and read back
    warehouse
        .save_snapshot(run_id, None, &sample_report())
        .expect("saved");

    // Then: The tables survive and the id round-trips
    let run = warehouse.run(run_id).expect("lookup").expect("present");
    assert_eq!(run.run_id, run_id);
    assert_eq!(warehouse.list_runs(10).expect("runs").len(), 1);
}

#[test]
fn snapshots_persist_across_reopen() {
    // Given: A run saved through one handle
    let temp = tempdir().expect("tempdir");
    {
        let warehouse = open_warehouse(&temp);
        warehouse
            .save_snapshot("durable", None, &sample_report())
            .expect("saved");
    }

    // When: The warehouse is reopened
    let warehouse = open_warehouse(&temp);

    // Then: The run is still there
    let latest = warehouse.latest_run().expect("latest").expect("present");
    assert_eq!(latest.run_id, "durable");
    assert_eq!(latest.generated_at, instant("2024-01-05T00:00:00Z"));
    assert_eq!(latest.policy, MissingPolicy::TreatAsZero);
}

// =============================================================================
// Ad-hoc SQL
// =============================================================================

#[test]
fn views_expose_the_latest_run_and_extremes() {
    // Given: Two saved runs
    let temp = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&temp);
    let report = sample_report();
    warehouse.save_snapshot("older", None, &report).expect("saved");
    warehouse.save_snapshot("newer", None, &report).expect("saved");

    // When: The latest-run views are queried
    let latest = warehouse
        .execute_query("SELECT run_id FROM vw_latest_run", QueryGuardrails::default())
        .expect("latest run");
    let market = warehouse
        .execute_query(
            "SELECT score FROM vw_latest_market_breadth",
            QueryGuardrails::default(),
        )
        .expect("latest market");

    // Then: Only the newest run is visible
    assert_eq!(latest.rows, vec![vec![json!("newer")]]);
    assert_eq!(market.row_count, 3);

    // And: Extremes span every run
    let extremes = warehouse
        .execute_query(
            "SELECT count(*) AS n FROM vw_market_extremes",
            QueryGuardrails::default(),
        )
        .expect("extremes");
    assert_eq!(extremes.columns[0].name, "n");
    assert_eq!(extremes.rows, vec![vec![json!(6)]]);
}

#[test]
fn ad_hoc_sql_cannot_modify_snapshots() {
    // Given: A saved run
    let temp = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&temp);
    warehouse
        .save_snapshot("run-1", None, &sample_report())
        .expect("saved");

    // When: Write statements are attempted
    for sql in [
        "UPDATE market_breadth SET score = 0",
        "DROP TABLE sector_breadth",
        "WITH x AS (SELECT 1) SELECT * FROM x; DELETE FROM breadth_runs",
    ] {
        let error = warehouse
            .execute_query(sql, QueryGuardrails::default())
            .expect_err("must be rejected");
        assert_eq!(error.code(), "warehouse.query_rejected");
    }

    // Then: Data is untouched
    assert_eq!(warehouse.load_market_breadth("run-1").expect("market").len(), 3);
}
