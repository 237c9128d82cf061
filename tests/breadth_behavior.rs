//! Behavior tests for the breadth engine
//!
//! These tests describe what an analyst observes when daily closes flow
//! through signal extraction, sector aggregation and market aggregation.

use std::collections::HashMap;
use std::sync::Arc;

use breadth_core::breadth::SectorStatus;
use breadth_core::{
    aggregate_market, aggregate_sector, extract_signal, BreadthConfig, BreadthPipeline,
    BreadthThresholds, BreadthZone, DailyBar, FixturePriceSource, MissingPolicy, SectorBreadth,
    SectorId, SectorRoster, SignalSeries, Symbol, SymbolSeries, TradingDate, TradingZone,
    Universe, UtcDateTime,
};

const DAY_MS: i64 = 86_400_000;
/// 2024-01-01T22:00:00Z, after the US close.
const START_MS: i64 = 1_704_146_400_000;

fn symbol(value: &str) -> Symbol {
    Symbol::parse(value).expect("valid symbol")
}

fn day(offset: i64) -> UtcDateTime {
    UtcDateTime::from_unix_millis(START_MS + offset * DAY_MS).expect("valid instant")
}

fn series(name: &str, closes: &[f64]) -> SymbolSeries {
    let bars = closes
        .iter()
        .enumerate()
        .map(|(offset, close)| DailyBar::new(day(offset as i64), *close).expect("valid bar"))
        .collect();
    SymbolSeries::new(symbol(name), bars).expect("ordered series")
}

fn rising(count: usize) -> Vec<f64> {
    (0..count).map(|index| 50.0 + index as f64).collect()
}

fn falling(count: usize) -> Vec<f64> {
    (0..count).map(|index| 50.0 - index as f64 * 0.5).collect()
}

fn signals(entries: &[(&str, Vec<f64>)]) -> HashMap<Symbol, SignalSeries> {
    entries
        .iter()
        .map(|(name, closes)| (symbol(name), extract_signal(&series(name, closes))))
        .collect()
}

// =============================================================================
// Signal extraction
// =============================================================================

#[test]
fn young_listing_produces_no_signal_until_twenty_closes_exist() {
    // Given: A symbol with only 19 daily closes
    let short = series("IPO", &rising(19));

    // When: The signal is extracted
    let signal = extract_signal(&short);

    // Then: No day carries a signal yet
    assert!(signal.is_empty());

    // And: One more close produces the first signal
    let signal = extract_signal(&series("IPO", &rising(20)));
    assert_eq!(signal.len(), 1);
}

#[test]
fn flat_prices_are_never_above_their_average() {
    // Given: A symbol that closed at the same price for 30 days
    let flat = series("FLAT", &[42.0; 30]);

    // When: The signal is extracted
    let signal = extract_signal(&flat);

    // Then: Equality with the mean counts as "not above"
    assert_eq!(signal.len(), 11);
    assert!(signal.points().iter().all(|point| !point.above_ma));
}

// =============================================================================
// Sector aggregation
// =============================================================================

#[test]
fn two_of_three_members_above_scores_two_thirds_without_rounding() {
    // Given: A three-member sector where two members trend up and one trends down
    let roster = SectorRoster::parse("XLK", &["X", "Y", "Z"]).expect("roster");
    let signals = signals(&[
        ("X", rising(20)),
        ("Y", rising(20)),
        ("Z", falling(20)),
    ]);

    // When: The sector is aggregated
    let sector = aggregate_sector(&roster, &signals, MissingPolicy::TreatAsZero).expect("sector");

    // Then: The score keeps full precision
    assert_eq!(sector.scores().len(), 1);
    assert_eq!(sector.scores()[0].score, 200.0 / 3.0);
}

#[test]
fn missing_member_counts_as_not_above_unless_excluded() {
    // Given: A two-member sector where only one member has data and it is above
    let roster = SectorRoster::parse("XLE", &["XOM", "CVX"]).expect("roster");
    let signals = signals(&[("XOM", rising(20))]);

    // When: The sector is aggregated under both policies
    let zero = aggregate_sector(&roster, &signals, MissingPolicy::TreatAsZero).expect("zero");
    let exclude = aggregate_sector(&roster, &signals, MissingPolicy::Exclude).expect("exclude");

    // Then: The default halves the score; exclusion shrinks the denominator
    assert_eq!(zero.scores()[0].score, 50.0);
    assert_eq!(exclude.scores()[0].score, 100.0);
}

#[test]
fn sector_scores_stay_within_bounds() {
    // Given: Sectors where nobody, and everybody, is above
    let roster = SectorRoster::parse("XLU", &["NEE", "SO"]).expect("roster");
    let none_above = signals(&[("NEE", falling(25)), ("SO", falling(25))]);
    let all_above = signals(&[("NEE", rising(25)), ("SO", rising(25))]);

    // When: Both are aggregated
    let low = aggregate_sector(&roster, &none_above, MissingPolicy::TreatAsZero).expect("low");
    let high = aggregate_sector(&roster, &all_above, MissingPolicy::TreatAsZero).expect("high");

    // Then: The extremes are exactly 0 and 100
    assert!(low.scores().iter().all(|point| point.score == 0.0));
    assert!(high.scores().iter().all(|point| point.score == 100.0));
}

// =============================================================================
// Market aggregation
// =============================================================================

#[test]
fn market_sums_sectors_over_the_union_of_dates() {
    // Given: Sector 1 scored 50 then 75; sector 2 only reported on the first day
    let first = SectorBreadth::from_scores(
        SectorId::parse("S1").expect("sector"),
        4,
        vec![(day(1), 50.0), (day(2), 75.0)],
    )
    .expect("sector 1");
    let second = SectorBreadth::from_scores(
        SectorId::parse("S2").expect("sector"),
        4,
        vec![(day(1), 30.0)],
    )
    .expect("sector 2");

    // When: The market is aggregated with the default policy
    let (market, matrix) = aggregate_market(
        &[first, second],
        MissingPolicy::TreatAsZero,
        &TradingZone::default(),
    )
    .expect("market");

    // Then: The second day adds zero for the absent sector
    let scores: Vec<f64> = market.points().iter().map(|point| point.score).collect();
    assert_eq!(scores, vec![80.0, 75.0]);

    // And: The heatmap is dense with a zero cell
    let d2 = TradingDate::parse("2024-01-03").expect("date");
    assert_eq!(matrix.value(d2, &SectorId::parse("S2").expect("sector")), Some(0.0));
}

#[test]
fn late_utc_close_maps_to_the_same_chicago_session() {
    // Given: A score stamped 2024-01-02T23:30:00Z
    let instant = UtcDateTime::parse("2024-01-02T23:30:00Z").expect("instant");
    let sector = SectorBreadth::from_scores(
        SectorId::parse("XLK").expect("sector"),
        1,
        vec![(instant, 100.0)],
    )
    .expect("sector");

    // When: The market axis is normalized to America/Chicago
    let (market, _) = aggregate_market(
        &[sector],
        MissingPolicy::TreatAsZero,
        &TradingZone::parse("America/Chicago").expect("zone"),
    )
    .expect("market");

    // Then: The date is the Chicago calendar date
    assert_eq!(market.points()[0].date.to_string(), "2024-01-02");
}

#[test]
fn market_aggregation_is_idempotent() {
    // Given: A fixed set of sector series
    let sectors = vec![
        SectorBreadth::from_scores(
            SectorId::parse("XLF").expect("sector"),
            3,
            vec![(day(0), 100.0 / 3.0), (day(1), 200.0 / 3.0)],
        )
        .expect("sector"),
        SectorBreadth::from_scores(
            SectorId::parse("XLP").expect("sector"),
            7,
            vec![(day(1), 100.0 / 7.0)],
        )
        .expect("sector"),
    ];

    // When: The market is aggregated twice
    let zone = TradingZone::default();
    let first = aggregate_market(&sectors, MissingPolicy::Exclude, &zone).expect("first");
    let second = aggregate_market(&sectors, MissingPolicy::Exclude, &zone).expect("second");

    // Then: Both results are bit-identical
    assert_eq!(first, second);
    for (left, right) in first.0.points().iter().zip(second.0.points()) {
        assert_eq!(left.score.to_bits(), right.score.to_bits());
    }
}

// =============================================================================
// End-to-end run
// =============================================================================

fn fixture_json(symbols: &[(&str, Vec<f64>)]) -> String {
    let entries: Vec<String> = symbols
        .iter()
        .map(|(name, closes)| {
            let bars: Vec<String> = closes
                .iter()
                .enumerate()
                .map(|(offset, close)| {
                    format!(
                        r#"{{"datetime":"{}","close":{close}}}"#,
                        day(offset as i64).format_rfc3339()
                    )
                })
                .collect();
            format!(r#""{name}":[{}]"#, bars.join(","))
        })
        .collect();
    format!("{{{}}}", entries.join(","))
}

#[tokio::test]
async fn analyst_gets_a_chart_ready_report_from_a_fixture() {
    // Given: Two sectors of price history, one sector fully bullish
    let json = fixture_json(&[
        ("AAPL", rising(30)),
        ("MSFT", rising(30)),
        ("XOM", falling(30)),
        ("CVX", rising(30)),
    ]);
    let source = FixturePriceSource::from_json_str(&json).expect("fixture");
    let config = BreadthConfig {
        universe: Universe::new(vec![
            SectorRoster::parse("XLK", &["AAPL", "MSFT"]).expect("roster"),
            SectorRoster::parse("XLE", &["XOM", "CVX"]).expect("roster"),
        ])
        .expect("universe"),
        thresholds: BreadthThresholds::new(150.0, 20.0).expect("thresholds"),
        ..BreadthConfig::default()
    };

    // When: The pipeline runs
    let report = BreadthPipeline::new(Arc::new(source), &config)
        .expect("pipeline")
        .run()
        .await
        .expect("report");

    // Then: Every day sums 100 (XLK) and 50 (XLE)
    assert_eq!(report.points.len(), 11);
    assert!(report.points.iter().all(|point| point.score == 150.0));

    // And: The high threshold is inclusive
    assert!(report
        .points
        .iter()
        .all(|point| point.zone == BreadthZone::ExtremeHigh));

    // And: The report carries its date range and the matrix columns
    assert_eq!(report.start, report.points.first().map(|point| point.date));
    assert_eq!(report.end, report.points.last().map(|point| point.date));
    assert_eq!(report.matrix.sectors().len(), 2);
    assert_eq!(report.time_zone, "America/Chicago");

    // And: Nothing was degraded
    assert!(report.diagnostics.warnings().is_empty());
    let json = report.to_json_pretty().expect("serializable");
    assert!(json.contains("\"extreme_high\""));
}

#[tokio::test]
async fn sector_without_any_data_is_reported_but_does_not_fail_the_run() {
    // Given: A universe where one sector's members are unknown to the source
    let json = fixture_json(&[("AAPL", rising(21))]);
    let source = FixturePriceSource::from_json_str(&json).expect("fixture");
    let config = BreadthConfig {
        universe: Universe::new(vec![
            SectorRoster::parse("XLK", &["AAPL"]).expect("roster"),
            SectorRoster::parse("XLRE", &["PLD", "AMT"]).expect("roster"),
        ])
        .expect("universe"),
        ..BreadthConfig::default()
    };

    // When: The pipeline runs
    let report = BreadthPipeline::new(Arc::new(source), &config)
        .expect("pipeline")
        .run()
        .await
        .expect("report");

    // Then: The market only carries the surviving sector
    assert!(report.points.iter().all(|point| point.score == 100.0));

    // And: The missing sector is visible in the diagnostics
    let missing: Vec<&str> = report
        .diagnostics
        .missing_sectors()
        .map(|entry| entry.sector.as_str())
        .collect();
    assert_eq!(missing, vec!["XLRE"]);
    assert!(report
        .diagnostics
        .sectors
        .iter()
        .any(|entry| matches!(entry.status, SectorStatus::Missing { .. })));
    assert!(!report.diagnostics.warnings().is_empty());
}
