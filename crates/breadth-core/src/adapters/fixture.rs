use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use serde::Deserialize;

use crate::data_source::{PriceHistoryRequest, PriceSource, SourceError, SourceId};
use crate::{CoreError, DailyBar, Symbol, SymbolSeries, UtcDateTime};

#[derive(Debug, Clone, Copy, Deserialize)]
struct FixtureBar {
    datetime: UtcDateTime,
    close: f64,
}

/// In-memory price source for offline runs and tests.
///
/// Bars are validated at fetch time, so a fixture with bad data behaves
/// like an upstream that returns a malformed payload for that symbol.
#[derive(Debug, Clone, Default)]
pub struct FixturePriceSource {
    bars: HashMap<Symbol, Vec<(UtcDateTime, f64)>>,
    failures: HashMap<Symbol, SourceError>,
}

impl FixturePriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `{"SYMBOL": [{"datetime": "<RFC3339 UTC>", "close": <f64>}, ...]}`.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let raw: HashMap<Symbol, Vec<FixtureBar>> = serde_json::from_str(json)?;
        let bars = raw
            .into_iter()
            .map(|(symbol, bars)| {
                let bars = bars.into_iter().map(|bar| (bar.datetime, bar.close)).collect();
                (symbol, bars)
            })
            .collect();
        Ok(Self {
            bars,
            failures: HashMap::new(),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn with_series(mut self, symbol: Symbol, bars: Vec<(UtcDateTime, f64)>) -> Self {
        self.bars.insert(symbol, bars);
        self
    }

    /// Daily closes starting at `start`, one calendar day apart.
    pub fn with_daily_closes(self, symbol: Symbol, start: UtcDateTime, closes: &[f64]) -> Self {
        let start = start.into_inner();
        let bars = closes
            .iter()
            .enumerate()
            .filter_map(|(offset, close)| {
                let date = start + time::Duration::days(offset as i64);
                UtcDateTime::from_offset_datetime(date)
                    .ok()
                    .map(|date| (date, *close))
            })
            .collect();
        self.with_series(symbol, bars)
    }

    /// Makes every fetch of `symbol` fail with `error`.
    pub fn with_failure(mut self, symbol: Symbol, error: SourceError) -> Self {
        self.failures.insert(symbol, error);
        self
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.bars.keys()
    }

    fn load(&self, symbol: &Symbol) -> Result<SymbolSeries, SourceError> {
        if let Some(error) = self.failures.get(symbol) {
            return Err(error.clone());
        }

        let raw = match self.bars.get(symbol) {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Err(SourceError::empty_payload(symbol)),
        };

        let bars = raw
            .iter()
            .map(|(date, close)| DailyBar::new(*date, *close))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| {
                SourceError::malformed_payload(format!("fixture bar for {symbol}: {error}"))
            })?;

        SymbolSeries::new(symbol.clone(), bars)
            .map_err(|error| SourceError::malformed_payload(error.to_string()))
    }
}

impl PriceSource for FixturePriceSource {
    fn id(&self) -> SourceId {
        SourceId::Fixture
    }

    fn fetch<'a>(
        &'a self,
        req: PriceHistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<SymbolSeries, SourceError>> + Send + 'a>> {
        Box::pin(async move { self.load(&req.symbol) })
    }
}
