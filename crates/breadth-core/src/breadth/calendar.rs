use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{Offset, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use time::UtcOffset;

use crate::{TradingDate, UtcDateTime, ValidationError};

pub const DEFAULT_TIME_ZONE: &str = "America/Chicago";

/// IANA time zone that defines the calendar date of a trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TradingZone(Tz);

impl TradingZone {
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        name.trim()
            .parse::<Tz>()
            .map(Self)
            .map_err(|_| ValidationError::UnknownTimeZone {
                value: name.to_owned(),
            })
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Calendar date of `instant` in this zone, DST included.
    pub fn trading_date(&self, instant: UtcDateTime) -> TradingDate {
        let instant = instant.into_inner();
        let offset = chrono::DateTime::from_timestamp(instant.unix_timestamp(), 0)
            .map(|utc| {
                self.0
                    .offset_from_utc_datetime(&utc.naive_utc())
                    .fix()
                    .local_minus_utc()
            })
            .and_then(|seconds| UtcOffset::from_whole_seconds(seconds).ok())
            .unwrap_or(UtcOffset::UTC);
        TradingDate::new(instant.to_offset(offset).date())
    }
}

impl Default for TradingZone {
    fn default() -> Self {
        Self(chrono_tz::America::Chicago)
    }
}

impl Display for TradingZone {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TradingZone {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for TradingZone {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TradingZone> for String {
    fn from(value: TradingZone) -> Self {
        value.name().to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date_of(zone: &TradingZone, instant: &str) -> String {
        zone.trading_date(UtcDateTime::parse(instant).expect("ts"))
            .to_string()
    }

    #[test]
    fn late_utc_evening_stays_on_same_chicago_day() {
        let zone = TradingZone::default();
        assert_eq!(date_of(&zone, "2024-01-02T23:30:00Z"), "2024-01-02");
    }

    #[test]
    fn early_utc_morning_belongs_to_previous_chicago_day() {
        let zone = TradingZone::default();
        // CST is UTC-6 in January.
        assert_eq!(date_of(&zone, "2024-01-03T05:59:59Z"), "2024-01-02");
        assert_eq!(date_of(&zone, "2024-01-03T06:00:00Z"), "2024-01-03");
    }

    #[test]
    fn follows_daylight_saving_offset() {
        let zone = TradingZone::default();
        // CDT is UTC-5 in July.
        assert_eq!(date_of(&zone, "2024-07-02T04:59:00Z"), "2024-07-01");
        assert_eq!(date_of(&zone, "2024-07-02T05:00:00Z"), "2024-07-02");
    }

    #[test]
    fn rejects_unknown_zone() {
        let err = TradingZone::parse("Mars/Olympus").expect_err("must fail");
        assert!(matches!(err, ValidationError::UnknownTimeZone { .. }));
        assert_eq!(
            TradingZone::parse("Asia/Tokyo").expect("zone").name(),
            "Asia/Tokyo"
        );
    }
}
