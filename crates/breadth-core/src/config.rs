//! Run configuration.
//!
//! Layering, lowest to highest precedence: built-in defaults, an optional
//! JSON file, environment variables, then whatever the caller (usually the
//! CLI) sets on the returned value.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `BREADTH_HOME` | [`BreadthConfig::home`] |
//! | `BREADTH_TIMEZONE` | [`BreadthConfig::time_zone`] |
//! | `SCHWAB_ACCESS_TOKEN` | [`BreadthConfig::access_token`] |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::breadth::{BreadthThresholds, MissingPolicy, SignalExtractor, TradingZone, DEFAULT_MA_WINDOW};
use crate::{CoreError, FetchPolicy, Frequency, Lookback, Universe, ValidationError};

pub const ENV_HOME: &str = "BREADTH_HOME";
pub const ENV_TIMEZONE: &str = "BREADTH_TIMEZONE";
pub const ENV_ACCESS_TOKEN: &str = "SCHWAB_ACCESS_TOKEN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreadthConfig {
    pub universe: Universe,
    pub lookback: Lookback,
    pub frequency: Frequency,
    pub ma_window: usize,
    pub policy: MissingPolicy,
    pub time_zone: TradingZone,
    pub thresholds: BreadthThresholds,
    pub fetch: FetchPolicy,
    /// Directory holding the warehouse; see [`BreadthConfig::home_dir`].
    pub home: Option<PathBuf>,
    /// Never written back out.
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
}

impl Default for BreadthConfig {
    fn default() -> Self {
        Self {
            universe: Universe::default(),
            lookback: Lookback::default(),
            frequency: Frequency::Daily,
            ma_window: DEFAULT_MA_WINDOW,
            policy: MissingPolicy::default(),
            time_zone: TradingZone::default(),
            thresholds: BreadthThresholds::default(),
            fetch: FetchPolicy::default(),
            home: None,
            access_token: None,
        }
    }
}

impl BreadthConfig {
    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "loaded breadth config file");
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Overrides fields from environment variables supplied by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(home) = non_empty(ENV_HOME) {
            self.home = Some(PathBuf::from(home));
        }
        if let Some(zone) = non_empty(ENV_TIMEZONE) {
            self.time_zone = TradingZone::parse(&zone)?;
        }
        if let Some(token) = non_empty(ENV_ACCESS_TOKEN) {
            self.access_token = Some(token.trim().to_owned());
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        SignalExtractor::new(self.ma_window)?;
        if self.lookback.period == 0 {
            return Err(ValidationError::ZeroLookback);
        }
        self.fetch.validate()?;
        self.thresholds.validate()
    }

    pub fn signal_extractor(&self) -> Result<SignalExtractor, ValidationError> {
        SignalExtractor::new(self.ma_window)
    }

    /// `home`, else `$HOME/.breadth`, else `./.breadth`.
    pub fn home_dir(&self) -> PathBuf {
        if let Some(home) = &self.home {
            return home.clone();
        }
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".breadth")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_reference_run() {
        let config = BreadthConfig::default();
        assert_eq!(config.ma_window, 20);
        assert_eq!(config.time_zone.name(), "America/Chicago");
        assert_eq!(config.thresholds.high, 900.0);
        assert_eq!(config.thresholds.low, 200.0);
        assert_eq!(config.universe.sector_count(), 11);
        assert_eq!(config.policy, MissingPolicy::TreatAsZero);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = BreadthConfig::from_json_str(
            r#"{
                "policy": "exclude",
                "time_zone": "America/New_York",
                "universe": [{"sector": "XLK", "symbols": ["AAPL", "MSFT"]}],
                "fetch": {"max_concurrency": 2}
            }"#,
        )
        .expect("valid config");

        assert_eq!(config.policy, MissingPolicy::Exclude);
        assert_eq!(config.time_zone.name(), "America/New_York");
        assert_eq!(config.universe.sector_count(), 1);
        assert_eq!(config.fetch.max_concurrency, 2);
        assert_eq!(config.fetch.quota_limit, FetchPolicy::default().quota_limit);
        assert_eq!(config.ma_window, 20);
    }

    #[test]
    fn unknown_zone_in_file_is_rejected() {
        let result = BreadthConfig::from_json_str(r#"{"time_zone": "Nowhere/City"}"#);
        assert!(matches!(result, Err(CoreError::Serialization(_))));
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = BreadthConfig::default();
        config
            .apply_env(env(&[
                (ENV_HOME, "/tmp/breadth-home"),
                (ENV_TIMEZONE, "Europe/London"),
                (ENV_ACCESS_TOKEN, " token-1 "),
            ]))
            .expect("valid env");

        assert_eq!(config.home_dir(), PathBuf::from("/tmp/breadth-home"));
        assert_eq!(config.time_zone.name(), "Europe/London");
        assert_eq!(config.access_token.as_deref(), Some("token-1"));
    }

    #[test]
    fn invalid_env_zone_is_an_error() {
        let mut config = BreadthConfig::default();
        let err = config
            .apply_env(env(&[(ENV_TIMEZONE, "Atlantis/Capital")]))
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::UnknownTimeZone { .. }));
    }

    #[test]
    fn validation_rejects_zero_window_and_inverted_thresholds() {
        let config = BreadthConfig {
            ma_window: 0,
            ..BreadthConfig::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::ZeroWindow));

        let config = BreadthConfig {
            thresholds: BreadthThresholds {
                high: 100.0,
                low: 100.0,
            },
            ..BreadthConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidThresholds { .. })
        ));
    }

    #[test]
    fn access_token_is_never_serialized() {
        let config = BreadthConfig {
            access_token: Some(String::from("secret")),
            ..BreadthConfig::default()
        };
        let json = serde_json::to_string(&config).expect("serialize");
        assert!(!json.contains("secret"));
    }
}
