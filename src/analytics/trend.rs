//! Six-month trend over month-bucketed counts.

use chrono::{DateTime, Duration, SecondsFormat};
use chrono_tz::Tz;
use serde::Serialize;
use utoipa::ToSchema;

use super::date_histogram::{DateHistogram, TimeBucket};
use super::interval::{Interval, local_time, resolve_local};
use crate::domain::Event;
use crate::error::GatewayError;

/// Number of calendar months in the trend window.
pub const TREND_MONTHS: i64 = 6;

/// One month of the trend series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TrendMonth {
    /// ISO-8601 first instant of the month.
    pub key: String,
    /// `YYYY-MM` display label.
    pub month: String,
    /// Events starting in the month.
    pub value: u64,
}

impl From<&TimeBucket> for TrendMonth {
    fn from(bucket: &TimeBucket) -> Self {
        Self {
            key: bucket.start.to_rfc3339_opts(SecondsFormat::Secs, false),
            month: bucket.start.format("%Y-%m").to_string(),
            value: bucket.value,
        }
    }
}

/// Inclusive calendar dates bounding the trend window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TimePeriod {
    /// First day of the first month (`YYYY-MM-DD`).
    pub start: String,
    /// Last day of the reference month (`YYYY-MM-DD`).
    pub end: String,
}

/// Six-month trend statistics.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TrendSummary {
    /// Exactly six months, oldest first.
    pub monthly: Vec<TrendMonth>,
    /// Sum over the six months.
    pub total_events: u64,
    /// `total_events / 6`.
    pub average_events: f64,
    /// Busiest month; earliest wins ties.
    pub max_month: TrendMonth,
    /// Quietest month; earliest wins ties.
    pub min_month: TrendMonth,
    /// Window bounds.
    pub time_period: TimePeriod,
}

impl TrendSummary {
    /// One-paragraph description of the trend for chat replies and reports.
    #[must_use]
    pub fn describe(&self, subject: &str) -> String {
        let subject = if subject.is_empty() {
            String::new()
        } else {
            format!("{subject} ")
        };
        let mut text = format!(
            "From {} to {} there were {} {subject}events.",
            self.time_period.start, self.time_period.end, self.total_events
        );
        if self.total_events > 0 {
            text.push_str(&format!(
                " Busiest month: {} ({}); quietest month: {} ({}). Average {:.1} per month.",
                self.max_month.month,
                self.max_month.value,
                self.min_month.month,
                self.min_month.value,
                self.average_events
            ));
        }
        text
    }
}

/// The six-month window ending with the reference month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendWindow {
    /// First instant of the oldest month.
    pub start: DateTime<Tz>,
    /// First instant after the reference month.
    pub end_exclusive: DateTime<Tz>,
}

impl TrendWindow {
    /// Computes the window for `reference_ms` in `timezone`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if the reference lies outside the
    /// representable calendar.
    pub fn ending_at(reference_ms: i64, timezone: Tz) -> Result<Self, GatewayError> {
        let reference_month = Interval::Month.ordinal(local_time(&timezone, reference_ms)?);
        let month_start = |ordinal: i64| {
            Interval::Month
                .local_start(ordinal)
                .and_then(|local| resolve_local(&timezone, local))
                .ok_or_else(|| GatewayError::Internal(format!("month {ordinal} out of range")))
        };
        Ok(Self {
            start: month_start(reference_month - (TREND_MONTHS - 1))?,
            end_exclusive: month_start(reference_month + 1)?,
        })
    }

    /// First instant in epoch milliseconds.
    #[must_use]
    pub fn from_ms(&self) -> i64 {
        self.start.timestamp_millis()
    }

    /// Last instant (inclusive) in epoch milliseconds.
    #[must_use]
    pub fn to_ms(&self) -> i64 {
        self.end_exclusive.timestamp_millis() - 1
    }

    fn period(&self) -> TimePeriod {
        let last_day = self.end_exclusive - Duration::milliseconds(1);
        TimePeriod {
            start: self.start.format("%Y-%m-%d").to_string(),
            end: last_day.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Month-bucketed trend for the six calendar months ending with the month
/// of `reference_ms`, in `timezone`.
///
/// Always yields six months; months without events count zero. Events
/// starting outside the window are ignored.
///
/// # Errors
///
/// Returns [`GatewayError::Internal`] if the window cannot be represented.
pub fn monthly_trend(
    events: &[Event],
    reference_ms: i64,
    timezone: Tz,
) -> Result<TrendSummary, GatewayError> {
    let window = TrendWindow::ending_at(reference_ms, timezone)?;
    let series = DateHistogram::new(Interval::Month, timezone, TREND_MONTHS)
        .bounds(window.from_ms(), window.to_ms())
        .series(events)?;

    let monthly: Vec<TrendMonth> = series.iter().map(TrendMonth::from).collect();

    let mut months = monthly.iter();
    let Some(first) = months.next() else {
        return Err(GatewayError::Internal("trend window is empty".to_string()));
    };
    let (mut max_month, mut min_month) = (first, first);
    for month in months {
        if month.value > max_month.value {
            max_month = month;
        }
        if month.value < min_month.value {
            min_month = month;
        }
    }

    let total_events: u64 = monthly.iter().map(|m| m.value).sum();
    #[allow(clippy::cast_precision_loss)]
    let average_events = total_events as f64 / TREND_MONTHS as f64;

    Ok(TrendSummary {
        max_month: max_month.clone(),
        min_month: min_month.clone(),
        monthly,
        total_events,
        average_events,
        time_period: window.period(),
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    const TAIPEI: Tz = chrono_tz::Asia::Taipei;

    fn ms(y: i32, m: u32, d: u32) -> i64 {
        let Some(naive) = NaiveDate::from_ymd_opt(y, m, d).and_then(|d| d.and_hms_opt(12, 0, 0))
        else {
            panic!("bad date");
        };
        let Some(dt) = TAIPEI.from_local_datetime(&naive).earliest() else {
            panic!("no instant");
        };
        dt.timestamp_millis()
    }

    fn event(start: i64) -> Event {
        Event {
            id: start.to_string(),
            start_time: start,
            ..Event::default()
        }
    }

    fn trend(events: &[Event], reference: i64) -> TrendSummary {
        let Ok(summary) = monthly_trend(events, reference, TAIPEI) else {
            panic!("trend failed");
        };
        summary
    }

    #[test]
    fn empty_input_still_has_six_months() {
        let summary = trend(&[], ms(2024, 6, 15));
        assert_eq!(summary.monthly.len(), 6);
        assert_eq!(summary.total_events, 0);
        assert!(summary.average_events.abs() < f64::EPSILON);
        let labels: Vec<&str> = summary.monthly.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(
            labels,
            vec!["2024-01", "2024-02", "2024-03", "2024-04", "2024-05", "2024-06"]
        );
        assert_eq!(
            summary.time_period,
            TimePeriod {
                start: "2024-01-01".to_string(),
                end: "2024-06-30".to_string(),
            }
        );
        assert_eq!(summary.max_month.month, "2024-01");
        assert_eq!(summary.min_month.month, "2024-01");
    }

    #[test]
    fn window_crosses_year_boundary() {
        let summary = trend(&[], ms(2024, 2, 1));
        assert_eq!(
            summary.monthly.first().map(|m| m.month.as_str()),
            Some("2023-09")
        );
        assert_eq!(
            summary.monthly.first().map(|m| m.key.as_str()),
            Some("2023-09-01T00:00:00+08:00")
        );
    }

    #[test]
    fn statistics_and_tie_breaking() {
        let events = vec![
            event(ms(2024, 2, 3)),
            event(ms(2024, 2, 20)),
            event(ms(2024, 4, 1)),
            event(ms(2024, 4, 2)),
            event(ms(2024, 6, 30)),
            // outside the window on both sides
            event(ms(2023, 12, 31)),
            event(ms(2024, 7, 1)),
        ];
        let summary = trend(&events, ms(2024, 6, 10));
        let values: Vec<u64> = summary.monthly.iter().map(|m| m.value).collect();
        assert_eq!(values, vec![0, 2, 0, 2, 0, 1]);
        assert_eq!(summary.total_events, 5);
        assert!((summary.average_events - 5.0 / 6.0).abs() < 1e-9);
        assert_eq!(summary.max_month.month, "2024-02");
        assert_eq!(summary.min_month.month, "2024-01");
    }

    #[test]
    fn describe_mentions_extremes() {
        let events = vec![event(ms(2024, 3, 3))];
        let text = trend(&events, ms(2024, 6, 10)).describe("music");
        assert!(text.contains("1 music events"));
        assert!(text.contains("Busiest month: 2024-03 (1)"));
    }
}
