use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Unit of a price-history lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Day,
    Month,
    Year,
    Ytd,
}

impl PeriodType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
            Self::Ytd => "ytd",
        }
    }
}

impl Display for PeriodType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            "ytd" => Ok(Self::Ytd),
            other => Err(ValidationError::InvalidPeriodType {
                value: other.to_owned(),
            }),
        }
    }
}

/// How far back a price-history request reaches, e.g. 3 years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Lookback {
    pub period_type: PeriodType,
    pub period: u32,
}

impl Lookback {
    pub fn new(period_type: PeriodType, period: u32) -> Result<Self, ValidationError> {
        if period == 0 {
            return Err(ValidationError::ZeroLookback);
        }
        Ok(Self {
            period_type,
            period,
        })
    }

    pub const fn years(period: u32) -> Self {
        Self {
            period_type: PeriodType::Year,
            period,
        }
    }
}

impl Default for Lookback {
    fn default() -> Self {
        Self::years(3)
    }
}

impl Display for Lookback {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.period, self.period_type)
    }
}

/// Bar frequency requested from the price source. Breadth runs on daily bars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl Display for Frequency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" | "1d" => Ok(Self::Daily),
            "weekly" | "1w" => Ok(Self::Weekly),
            "monthly" | "1mo" => Ok(Self::Monthly),
            other => Err(ValidationError::InvalidFrequency {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_lookback_is_three_years() {
        let lookback = Lookback::default();
        assert_eq!(lookback.period_type, PeriodType::Year);
        assert_eq!(lookback.period, 3);
        assert_eq!(lookback.to_string(), "3year");
    }

    #[test]
    fn rejects_zero_lookback() {
        let err = Lookback::new(PeriodType::Month, 0).expect_err("must fail");
        assert_eq!(err, ValidationError::ZeroLookback);
    }

    #[test]
    fn parses_frequency_aliases() {
        assert_eq!(Frequency::from_str("1d").expect("alias"), Frequency::Daily);
        assert!(matches!(
            Frequency::from_str("hourly"),
            Err(ValidationError::InvalidFrequency { .. })
        ));
    }
}
