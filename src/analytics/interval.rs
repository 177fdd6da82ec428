//! Date-histogram interval units, counting modes, and zone parsing.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::GatewayError;

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;
const WEEK_MS: i64 = 7 * DAY_MS;

/// Supported bucket widths.
///
/// Fixed widths align to epoch zero on the zone's wall clock, so a one-hour
/// bucket in a `+05:30` zone starts on local hour boundaries. `Month` is
/// calendar-aligned to the first local instant of each month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    /// One minute.
    Minute,
    /// One hour.
    Hour,
    /// One day.
    Day,
    /// Seven days, aligned to epoch zero (a Thursday).
    Week,
    /// One calendar month.
    Month,
}

impl Interval {
    /// Every supported interval, narrowest first.
    pub const ALL: [Self; 5] = [Self::Minute, Self::Hour, Self::Day, Self::Week, Self::Month];

    /// Width in milliseconds for fixed intervals; `None` for `Month`.
    #[must_use]
    pub const fn fixed_width_ms(&self) -> Option<i64> {
        match self {
            Self::Minute => Some(MINUTE_MS),
            Self::Hour => Some(HOUR_MS),
            Self::Day => Some(DAY_MS),
            Self::Week => Some(WEEK_MS),
            Self::Month => None,
        }
    }

    /// Short wire form (`1m`, `1h`, `1d`, `1w`, `1M`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "1m",
            Self::Hour => "1h",
            Self::Day => "1d",
            Self::Week => "1w",
            Self::Month => "1M",
        }
    }

    /// Bucket ordinal of a local wall-clock time. Consecutive buckets have
    /// consecutive ordinals.
    pub(crate) fn ordinal(&self, local: NaiveDateTime) -> i64 {
        match self.fixed_width_ms() {
            Some(width) => local.and_utc().timestamp_millis().div_euclid(width),
            None => i64::from(local.year()) * 12 + i64::from(local.month0()),
        }
    }

    /// Local wall-clock start of the bucket with the given ordinal.
    pub(crate) fn local_start(&self, ordinal: i64) -> Option<NaiveDateTime> {
        match self.fixed_width_ms() {
            Some(width) => {
                DateTime::<Utc>::from_timestamp_millis(ordinal.checked_mul(width)?)
                    .map(|dt| dt.naive_utc())
            }
            None => {
                let year = i32::try_from(ordinal.div_euclid(12)).ok()?;
                let month0 = u32::try_from(ordinal.rem_euclid(12)).ok()?;
                NaiveDate::from_ymd_opt(year, month0 + 1, 1)?.and_hms_opt(0, 0, 0)
            }
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1m" | "minute" => Ok(Self::Minute),
            "1h" | "hour" => Ok(Self::Hour),
            "1d" | "day" => Ok(Self::Day),
            "1w" | "week" => Ok(Self::Week),
            "1M" | "month" => Ok(Self::Month),
            other => Err(GatewayError::InvalidInterval(other.to_string())),
        }
    }
}

/// How an event contributes to time buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CountMode {
    /// One count in the bucket containing `start_time`.
    #[default]
    StartTime,
    /// One count in every bucket `[start_time, end_time]` overlaps.
    Overlap,
}

impl FromStr for CountMode {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "start_time" => Ok(Self::StartTime),
            "overlap" => Ok(Self::Overlap),
            other => Err(GatewayError::invalid_parameter(
                "mode",
                format!("`{other}` is not one of start_time, overlap"),
            )),
        }
    }
}

/// Parses an IANA zone name such as `Asia/Taipei`.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidTimezone`] for unknown names.
pub fn parse_timezone(name: &str) -> Result<Tz, GatewayError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| GatewayError::InvalidTimezone(name.to_string()))
}

/// Local wall-clock reading of an epoch-millisecond instant.
pub(crate) fn local_time(tz: &Tz, ms: i64) -> Result<NaiveDateTime, GatewayError> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|utc| utc.with_timezone(tz).naive_local())
        .ok_or_else(|| GatewayError::Internal(format!("timestamp {ms} out of range")))
}

/// First real instant at or after a local wall-clock time. Wall-clock
/// times skipped by a DST jump resolve to the instant after the jump.
pub(crate) fn resolve_local(tz: &Tz, local: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&local).earliest().or_else(|| {
        tz.from_local_datetime(&(local + TimeDelta::hours(1)))
            .earliest()
    })
}
