//! End-to-end breadth run: fetch, extract, aggregate, report.
//!
//! Every distinct symbol of the universe is fetched once, concurrently,
//! through a shared [`FetchThrottle`]. A symbol that fails in any way
//! degrades to "no signal" and is recorded in [`RunDiagnostics`]; only a
//! run where no sector yields data fails, with [`BreadthError::EmptyResult`].

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::breadth::{
    aggregate_market_detailed, aggregate_sector, BreadthReport, BreadthThresholds,
    MarketAggregate, MissingPolicy, ReportContext, RunDiagnostics, SectorBreadth,
    SectorDiagnostic, SectorStatus, SignalExtractor, SymbolDiagnostic, SymbolOutcome, TradingZone,
};
use crate::data_source::{PriceHistoryRequest, PriceSource, SourceErrorKind};
use crate::{
    BreadthConfig, BreadthError, FetchThrottle, Frequency, Lookback, SignalSeries, Symbol,
    Universe, UtcDateTime, ValidationError,
};

/// Drives one breadth computation against an injected price source.
pub struct BreadthPipeline {
    source: Arc<dyn PriceSource>,
    universe: Universe,
    extractor: SignalExtractor,
    policy: MissingPolicy,
    zone: TradingZone,
    thresholds: BreadthThresholds,
    lookback: Lookback,
    frequency: Frequency,
    throttle: FetchThrottle,
}

impl BreadthPipeline {
    pub fn new(source: Arc<dyn PriceSource>, config: &BreadthConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self {
            source,
            universe: config.universe.clone(),
            extractor: config.signal_extractor()?,
            policy: config.policy,
            zone: config.time_zone,
            thresholds: config.thresholds,
            lookback: config.lookback,
            frequency: config.frequency,
            throttle: FetchThrottle::from_policy(&config.fetch),
        })
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Runs the full pipeline and builds the report.
    pub async fn run(&self) -> Result<BreadthReport, BreadthError> {
        let started = std::time::Instant::now();
        let (signals, symbols) = self.collect_signals().await;

        let outcome = aggregate_universe(&self.universe, &signals, self.policy, &self.zone);
        let (aggregate, sectors) = match outcome {
            Ok(value) => value,
            Err(error) => {
                warn!(
                    symbols = symbols.len(),
                    code = error.code(),
                    "breadth run produced no data"
                );
                return Err(error);
            }
        };

        let diagnostics = RunDiagnostics {
            symbols,
            sectors,
            date_collisions: aggregate.date_collisions,
        };

        info!(
            sectors = self.universe.sector_count(),
            symbols = diagnostics.symbols_requested(),
            with_signal = diagnostics.symbols_with_signal(),
            dates = aggregate.market.len(),
            zone = self.zone.name(),
            policy = %self.policy,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "breadth run complete"
        );

        Ok(BreadthReport::new(
            &aggregate.market,
            aggregate.matrix,
            self.thresholds,
            ReportContext {
                generated_at: UtcDateTime::now(),
                time_zone: self.zone.name().to_owned(),
                policy: self.policy,
                ma_window: self.extractor.window(),
            },
            diagnostics,
        ))
    }

    /// Fetches every distinct symbol once and extracts its signal.
    ///
    /// Returns the usable signals plus one diagnostic per symbol, in
    /// universe order.
    pub async fn collect_signals(&self) -> (HashMap<Symbol, SignalSeries>, Vec<SymbolDiagnostic>) {
        let symbols = self.universe.distinct_symbols();
        let mut tasks = JoinSet::new();

        for (index, symbol) in symbols.iter().cloned().enumerate() {
            let source = Arc::clone(&self.source);
            let throttle = self.throttle.clone();
            let extractor = self.extractor;
            let request = PriceHistoryRequest::new(symbol, self.lookback, self.frequency);

            tasks.spawn(async move {
                let (signal, outcome) = fetch_signal(source.as_ref(), &throttle, extractor, request).await;
                (index, signal, outcome)
            });
        }

        let mut outcomes: Vec<Option<SymbolOutcome>> = vec![None; symbols.len()];
        let mut signals = HashMap::with_capacity(symbols.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, signal, outcome)) => {
                    if let Some(signal) = signal {
                        signals.insert(symbols[index].clone(), signal);
                    }
                    outcomes[index] = Some(outcome);
                }
                Err(error) => warn!(error = %error, "symbol fetch task did not complete"),
            }
        }

        let diagnostics = symbols
            .into_iter()
            .zip(outcomes)
            .map(|(symbol, outcome)| SymbolDiagnostic {
                symbol,
                outcome: outcome.unwrap_or_else(|| SymbolOutcome::Missing {
                    code: String::from("pipeline.task_failed"),
                    reason: String::from("fetch task was aborted"),
                }),
            })
            .collect();

        (signals, diagnostics)
    }
}

async fn fetch_signal(
    source: &dyn PriceSource,
    throttle: &FetchThrottle,
    extractor: SignalExtractor,
    request: PriceHistoryRequest,
) -> (Option<SignalSeries>, SymbolOutcome) {
    let symbol = request.symbol.clone();

    let fetched = match throttle.acquire().await {
        Ok(_permit) => source.fetch(request).await,
        Err(error) => Err(error),
    };

    let series = match fetched {
        Ok(series) => series,
        Err(error) => {
            warn!(
                symbol = %symbol,
                code = error.code(),
                error = error.message(),
                "price history unavailable; symbol contributes no signal"
            );
            let outcome = if error.kind() == SourceErrorKind::MalformedPayload {
                SymbolOutcome::Malformed {
                    reason: error.message().to_owned(),
                }
            } else {
                SymbolOutcome::Missing {
                    code: error.code().to_owned(),
                    reason: error.message().to_owned(),
                }
            };
            return (None, outcome);
        }
    };

    if series.is_empty() {
        let error = BreadthError::missing(symbol.as_str(), "source returned an empty series");
        warn!(symbol = %symbol, code = error.code(), "{error}");
        return (
            None,
            SymbolOutcome::Missing {
                code: error.code().to_owned(),
                reason: error.to_string(),
            },
        );
    }

    let signal = extractor.extract(&series);
    if signal.is_empty() {
        warn!(
            symbol = %symbol,
            bars = series.len(),
            window = extractor.window(),
            "history shorter than moving-average window"
        );
        return (None, SymbolOutcome::InsufficientHistory { bars: series.len() });
    }

    debug!(symbol = %symbol, bars = series.len(), signals = signal.len(), "signal extracted");
    let outcome = SymbolOutcome::Ok {
        bars: series.len(),
        signals: signal.len(),
    };
    (Some(signal), outcome)
}

/// Sector and market stages over already extracted signals.
///
/// A sector without data keeps an empty column, so the matrix always has
/// one column per configured sector and `Exclude` scales against the
/// configured sector count.
pub fn aggregate_universe(
    universe: &Universe,
    signals: &HashMap<Symbol, SignalSeries>,
    policy: MissingPolicy,
    zone: &TradingZone,
) -> Result<(MarketAggregate, Vec<SectorDiagnostic>), BreadthError> {
    let mut breadths = Vec::with_capacity(universe.sector_count());
    let mut diagnostics = Vec::with_capacity(universe.sector_count());

    for roster in universe.rosters() {
        let (breadth, status) = match aggregate_sector(roster, signals, policy) {
            Ok(breadth) => {
                let missing: Vec<Symbol> = roster
                    .symbols
                    .iter()
                    .filter(|symbol| !signals.contains_key(*symbol))
                    .cloned()
                    .collect();
                let status = if missing.is_empty() {
                    SectorStatus::Complete
                } else {
                    SectorStatus::Partial { missing }
                };
                (breadth, status)
            }
            Err(error) => {
                warn!(sector = %roster.sector, code = error.code(), "{error}");
                let empty = SectorBreadth::from_scores(roster.sector.clone(), roster.len(), Vec::new())?;
                (
                    empty,
                    SectorStatus::Missing {
                        reason: error.to_string(),
                    },
                )
            }
        };

        diagnostics.push(SectorDiagnostic {
            sector: roster.sector.clone(),
            roster_size: roster.len(),
            status,
        });
        breadths.push(breadth);
    }

    let aggregate = aggregate_market_detailed(&breadths, policy, zone)?;
    Ok((aggregate, diagnostics))
}
