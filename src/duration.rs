//! ISO-8601 durations (`P1D`, `PT12H`, `P1Y2M3DT4H5M6.5S`, ...)

use chrono::{DateTime, Months, TimeDelta, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::BotError;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^P(?:(?<years>\d+)Y)?(?:(?<months>\d+)M)?(?:(?<weeks>\d+)W)?(?:(?<days>\d+)D)?(?:T(?:(?<hours>\d+)H)?(?:(?<minutes>\d+)M)?(?:(?<seconds>\d+(?:[.,]\d+)?)S)?)?$",
    )
    .expect("duration pattern is valid")
});

/// A parsed ISO-8601 duration.
///
/// Years and months are calendar units, everything else is an exact span.
#[derive(Debug, Clone, PartialEq)]
pub struct IsoDuration {
    raw: String,
    years: u32,
    months: u32,
    weeks: u32,
    days: u32,
    hours: u32,
    minutes: u32,
    seconds: f64,
}

impl IsoDuration {
    /// The instant reached by adding this duration to `start`.
    /// Returns `None` when the result is out of chrono's range.
    pub fn end(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let total_months = self.years.checked_mul(12)?.checked_add(self.months)?;
        let total_days = i64::from(self.weeks) * 7 + i64::from(self.days);
        let millis = (self.seconds * 1000.0).round() as i64;

        start
            .checked_add_months(Months::new(total_months))?
            .checked_add_signed(TimeDelta::try_days(total_days)?)?
            .checked_add_signed(TimeDelta::try_hours(i64::from(self.hours))?)?
            .checked_add_signed(TimeDelta::try_minutes(i64::from(self.minutes))?)?
            .checked_add_signed(TimeDelta::try_milliseconds(millis)?)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for IsoDuration {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BotError::InvalidDuration(s.to_string());
        let trimmed = s.trim();

        // "P" and "P...T" carry no components
        if trimmed.len() < 2 || trimmed.ends_with('T') {
            return Err(invalid());
        }
        let caps = DURATION_RE.captures(trimmed).ok_or_else(invalid)?;

        let int = |name: &str| -> Result<u32, BotError> {
            caps.name(name)
                .map(|m| m.as_str().parse::<u32>().map_err(|_| invalid()))
                .transpose()
                .map(|v| v.unwrap_or(0))
        };
        let seconds = caps
            .name("seconds")
            .map(|m| m.as_str().replace(',', ".").parse::<f64>().map_err(|_| invalid()))
            .transpose()?
            .unwrap_or(0.0);

        Ok(Self {
            raw: trimmed.to_string(),
            years: int("years")?,
            months: int("months")?,
            weeks: int("weeks")?,
            days: int("days")?,
            hours: int("hours")?,
            minutes: int("minutes")?,
            seconds,
        })
    }
}

/// One day, `P1D`.
impl Default for IsoDuration {
    fn default() -> Self {
        Self {
            raw: "P1D".to_string(),
            years: 0,
            months: 0,
            weeks: 0,
            days: 1,
            hours: 0,
            minutes: 0,
            seconds: 0.0,
        }
    }
}

impl fmt::Display for IsoDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for IsoDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
