//! Time-bucketed histogram producing a contiguous, gap-filled series.

use chrono::{DateTime, SecondsFormat};
use chrono_tz::Tz;

use super::interval::{CountMode, Interval, local_time, resolve_local};
use crate::domain::{Bucket, Event};
use crate::error::GatewayError;

/// Largest bucket cap a caller may request.
pub const MAX_DATE_HISTOGRAM_BUCKETS: i64 = 10_000;

/// One bucket of a date histogram with its zoned start instant.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeBucket {
    /// First instant of the bucket in the histogram's zone.
    pub start: DateTime<Tz>,
    /// Events counted into the bucket.
    pub value: u64,
}

impl TimeBucket {
    /// Converts to a wire [`Bucket`] keyed by the ISO-8601 start.
    #[must_use]
    pub fn to_bucket(&self) -> Bucket {
        Bucket::new(
            self.start.to_rfc3339_opts(SecondsFormat::Secs, false),
            self.value,
        )
    }
}

/// Date-histogram configuration.
///
/// ```
/// use event_chat_gateway::analytics::{DateHistogram, Interval};
///
/// let tz = "Asia/Taipei".parse().unwrap_or(chrono_tz::UTC);
/// let buckets = DateHistogram::new(Interval::Day, tz, 100).compute(&[]);
/// assert_eq!(buckets.map(|b| b.len()).ok(), Some(0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateHistogram {
    interval: Interval,
    timezone: Tz,
    max_buckets: i64,
    mode: CountMode,
    bounds: Option<(i64, i64)>,
}

impl DateHistogram {
    /// Creates a start-time keyed histogram without bounds.
    #[must_use]
    pub const fn new(interval: Interval, timezone: Tz, max_buckets: i64) -> Self {
        Self {
            interval,
            timezone,
            max_buckets,
            mode: CountMode::StartTime,
            bounds: None,
        }
    }

    /// Sets the counting mode.
    #[must_use]
    pub const fn mode(mut self, mode: CountMode) -> Self {
        self.mode = mode;
        self
    }

    /// Pins the emitted range to the buckets covering the closed range
    /// `[from, to]` (epoch ms). Events outside it are ignored.
    #[must_use]
    pub const fn bounds(mut self, from: i64, to: i64) -> Self {
        self.bounds = Some((from, to));
        self
    }

    /// Computes the wire buckets, ascending by start.
    ///
    /// # Errors
    ///
    /// See [`DateHistogram::series`].
    pub fn compute(&self, events: &[Event]) -> Result<Vec<Bucket>, GatewayError> {
        Ok(self.series(events)?.iter().map(TimeBucket::to_bucket).collect())
    }

    /// Computes the zoned series, ascending by start, with zero-valued
    /// buckets filling every gap between the first and last bucket.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidLimit`] if `max_buckets` is not in
    ///   `1..=MAX_DATE_HISTOGRAM_BUCKETS`.
    /// - [`GatewayError::InvalidRange`] if the bounds are inverted.
    /// - [`GatewayError::TooManyBuckets`] if the range needs more than
    ///   `max_buckets` buckets.
    pub fn series(&self, events: &[Event]) -> Result<Vec<TimeBucket>, GatewayError> {
        if !(1..=MAX_DATE_HISTOGRAM_BUCKETS).contains(&self.max_buckets) {
            return Err(GatewayError::InvalidLimit {
                field: "num".to_string(),
                value: self.max_buckets,
            });
        }

        let spans = self.contributions(events)?;

        let range = match self.bounds {
            Some((from, to)) => {
                if from > to {
                    return Err(GatewayError::InvalidRange { from, to });
                }
                // A DST fall-back can put the later instant on the earlier
                // wall-clock reading.
                let (a, b) = (self.ordinal_of(from)?, self.ordinal_of(to)?);
                Some((a.min(b), a.max(b)))
            }
            None => None,
        };
        let range = spans.iter().fold(range, |acc, &(lo, hi)| match acc {
            Some((min, max)) => Some((min.min(lo), max.max(hi))),
            None => Some((lo, hi)),
        });
        let Some((first, last)) = range else {
            return Ok(Vec::new());
        };

        let required = last.abs_diff(first).saturating_add(1);
        let max = self.max_buckets.unsigned_abs();
        if required > max {
            return Err(GatewayError::TooManyBuckets { required, max });
        }

        let mut counts = vec![0_u64; usize::try_from(required).unwrap_or(usize::MAX)];
        for (lo, hi) in spans {
            for ordinal in lo.max(first)..=hi.min(last) {
                let slot = usize::try_from(ordinal - first)
                    .ok()
                    .and_then(|i| counts.get_mut(i));
                if let Some(count) = slot {
                    *count += 1;
                }
            }
        }

        let series = (first..=last)
            .zip(counts)
            .map(|(ordinal, value)| {
                let start = self
                    .interval
                    .local_start(ordinal)
                    .and_then(|local| resolve_local(&self.timezone, local))
                    .ok_or_else(|| {
                        GatewayError::Internal(format!(
                            "bucket {ordinal} has no start in {}",
                            self.timezone
                        ))
                    })?;
                Ok(TimeBucket { start, value })
            })
            .collect::<Result<Vec<_>, GatewayError>>()?;

        tracing::debug!(
            interval = %self.interval,
            timezone = %self.timezone,
            mode = ?self.mode,
            events = events.len(),
            buckets = series.len(),
            "date histogram computed"
        );
        Ok(series)
    }

    fn ordinal_of(&self, ms: i64) -> Result<i64, GatewayError> {
        Ok(self.interval.ordinal(local_time(&self.timezone, ms)?))
    }

    /// Inclusive ordinal span each counted event contributes to.
    fn contributions(&self, events: &[Event]) -> Result<Vec<(i64, i64)>, GatewayError> {
        let mut spans = Vec::with_capacity(events.len());
        for event in events {
            let span = match self.mode {
                CountMode::StartTime => {
                    if let Some((from, to)) = self.bounds {
                        if event.start_time < from || event.start_time > to {
                            continue;
                        }
                    }
                    let ordinal = self.ordinal_of(event.start_time)?;
                    (ordinal, ordinal)
                }
                CountMode::Overlap => {
                    let (mut start_ms, mut end_ms) = (event.start_time, event.effective_end());
                    if let Some((from, to)) = self.bounds {
                        if !event.overlaps(Some(from), Some(to)) {
                            continue;
                        }
                        start_ms = start_ms.max(from);
                        end_ms = end_ms.min(to);
                    }
                    let start = self.ordinal_of(start_ms)?;
                    let end = self.ordinal_of(end_ms)?;
                    (start.min(end), start.max(end))
                }
            };
            spans.push(span);
        }
        Ok(spans)
    }
}

/// Start-time keyed date histogram with no bounds.
///
/// # Errors
///
/// See [`DateHistogram::series`].
pub fn date_histogram(
    events: &[Event],
    interval: Interval,
    timezone: Tz,
    max_buckets: i64,
) -> Result<Vec<Bucket>, GatewayError> {
    DateHistogram::new(interval, timezone, max_buckets).compute(events)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn at(tz: Tz, y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
        let Some(naive) = NaiveDate::from_ymd_opt(y, m, d).and_then(|d| d.and_hms_opt(h, min, 0))
        else {
            panic!("bad date");
        };
        let Some(dt) = tz.from_local_datetime(&naive).earliest() else {
            panic!("no instant");
        };
        dt.timestamp_millis()
    }

    fn event(id: &str, start: i64, end: Option<i64>) -> Event {
        Event {
            id: id.to_string(),
            start_time: start,
            end_time: end,
            ..Event::default()
        }
    }

    fn values(buckets: &[Bucket]) -> Vec<u64> {
        buckets.iter().map(|b| b.value).collect()
    }

    #[test]
    fn daily_gaps_are_zero_filled() {
        let tz = chrono_tz::Asia::Taipei;
        let events = vec![
            event("a", at(tz, 2024, 3, 1, 10, 0), None),
            event("b", at(tz, 2024, 3, 4, 22, 30), None),
        ];
        let Ok(buckets) = date_histogram(&events, Interval::Day, tz, 100) else {
            panic!("date histogram failed");
        };
        assert_eq!(values(&buckets), vec![1, 0, 0, 1]);
        assert_eq!(
            buckets.first().map(|b| b.key.as_str()),
            Some("2024-03-01T00:00:00+08:00")
        );
    }

    #[test]
    fn keys_are_strictly_increasing_and_contiguous() {
        let tz = chrono_tz::UTC;
        let events: Vec<Event> = [0_i64, 5, 17, 3]
            .iter()
            .map(|h| event("e", h * 3_600_000, None))
            .collect();
        let hist = DateHistogram::new(Interval::Hour, tz, 100);
        let Ok(series) = hist.series(&events) else {
            panic!("series failed");
        };
        assert_eq!(series.len(), 18);
        for pair in series.windows(2) {
            let [a, b] = pair else {
                panic!("window of two");
            };
            assert_eq!((b.start - a.start).num_hours(), 1);
        }
        assert_eq!(series.iter().map(|b| b.value).sum::<u64>(), 4);
    }

    #[test]
    fn hourly_buckets_follow_half_hour_offsets() {
        let tz = chrono_tz::Asia::Kolkata;
        let events = vec![event("a", at(tz, 2024, 5, 1, 10, 45), None)];
        let Ok(buckets) = date_histogram(&events, Interval::Hour, tz, 10) else {
            panic!("date histogram failed");
        };
        assert_eq!(buckets, vec![Bucket::new("2024-05-01T10:00:00+05:30", 1)]);
    }

    #[test]
    fn months_align_to_local_calendar() {
        let tz = chrono_tz::Asia::Taipei;
        // 2024-01-31T20:00Z is already February in Taipei.
        let Some(utc) = chrono::Utc.with_ymd_and_hms(2024, 1, 31, 20, 0, 0).single() else {
            panic!("bad instant");
        };
        let events = vec![event("a", utc.timestamp_millis(), None)];
        let Ok(buckets) = date_histogram(&events, Interval::Month, tz, 10) else {
            panic!("date histogram failed");
        };
        assert_eq!(buckets, vec![Bucket::new("2024-02-01T00:00:00+08:00", 1)]);
    }

    #[test]
    fn overlap_mode_counts_every_spanned_bucket() {
        let tz = chrono_tz::UTC;
        let long = event("a", at(tz, 2024, 1, 1, 12, 0), Some(at(tz, 2024, 1, 3, 1, 0)));
        let short = event("b", at(tz, 2024, 1, 2, 8, 0), None);
        let events = vec![long, short];

        let Ok(start_only) = date_histogram(&events, Interval::Day, tz, 10) else {
            panic!("date histogram failed");
        };
        assert_eq!(values(&start_only), vec![1, 1]);

        let Ok(overlap) = DateHistogram::new(Interval::Day, tz, 10)
            .mode(CountMode::Overlap)
            .compute(&events)
        else {
            panic!("date histogram failed");
        };
        assert_eq!(values(&overlap), vec![1, 2, 1]);
    }

    #[test]
    fn too_many_buckets_is_an_error() {
        let tz = chrono_tz::UTC;
        let events = vec![event("a", 0, None), event("b", 86_400_000, None)];
        let result = date_histogram(&events, Interval::Minute, tz, 100);
        assert_eq!(
            result,
            Err(GatewayError::TooManyBuckets {
                required: 1441,
                max: 100
            })
        );
    }

    #[test]
    fn bounds_fill_empty_range_and_drop_outsiders() {
        let tz = chrono_tz::UTC;
        let from = at(tz, 2024, 1, 1, 0, 0);
        let to = at(tz, 2024, 1, 5, 23, 59);
        let events = vec![
            event("in", at(tz, 2024, 1, 3, 9, 0), None),
            event("out", at(tz, 2024, 2, 1, 0, 0), None),
        ];
        let Ok(buckets) = DateHistogram::new(Interval::Day, tz, 10)
            .bounds(from, to)
            .compute(&events)
        else {
            panic!("date histogram failed");
        };
        assert_eq!(values(&buckets), vec![0, 0, 1, 0, 0]);

        let Ok(empty) = DateHistogram::new(Interval::Day, tz, 10)
            .bounds(from, to)
            .compute(&[])
        else {
            panic!("date histogram failed");
        };
        assert_eq!(values(&empty), vec![0; 5]);
    }

    #[test]
    fn empty_input_without_bounds_is_empty() {
        let Ok(buckets) = date_histogram(&[], Interval::Week, chrono_tz::UTC, 10) else {
            panic!("date histogram failed");
        };
        assert!(buckets.is_empty());
    }

    #[test]
    fn weeks_align_to_epoch_zero() {
        let tz = chrono_tz::UTC;
        // 1970-01-01 was a Thursday; every week bucket starts on a Thursday.
        let events = vec![event("a", at(tz, 2024, 6, 10, 12, 0), None)];
        let Ok(buckets) = date_histogram(&events, Interval::Week, tz, 10) else {
            panic!("date histogram failed");
        };
        assert_eq!(buckets, vec![Bucket::new("2024-06-06T00:00:00+00:00", 1)]);
    }

    #[test]
    fn non_positive_limit_fails() {
        let result = date_histogram(&[], Interval::Day, chrono_tz::UTC, -1);
        assert!(matches!(result, Err(GatewayError::InvalidLimit { value: -1, .. })));
    }

    #[test]
    fn cap_above_ceiling_fails_before_allocating() {
        let cap = 1_000_000_000_000;
        let result = DateHistogram::new(Interval::Minute, chrono_tz::UTC, cap)
            .bounds(0, 8_000_000_000_000_000)
            .compute(&[]);
        assert!(matches!(result, Err(GatewayError::InvalidLimit { value, .. }) if value == cap));

        let at_ceiling =
            DateHistogram::new(Interval::Minute, chrono_tz::UTC, MAX_DATE_HISTOGRAM_BUCKETS)
                .bounds(0, 8_000_000_000_000_000)
                .compute(&[]);
        assert!(matches!(at_ceiling, Err(GatewayError::TooManyBuckets { .. })));
    }

    #[test]
    fn bounds_across_dst_fall_back_are_not_empty() {
        let tz = chrono_tz::America::New_York;
        let utc = |h: u32, min: u32| {
            let Some(dt) = chrono::Utc.with_ymd_and_hms(2024, 11, 3, h, min, 0).single() else {
                panic!("bad instant");
            };
            dt.timestamp_millis()
        };
        // 01:50 EDT, then 01:00 and 01:10 EST after the clocks go back.
        let (from, inside, to) = (utc(5, 50), utc(6, 0), utc(6, 10));
        let Ok(series) = DateHistogram::new(Interval::Minute, tz, 100)
            .bounds(from, to)
            .series(&[event("a", inside, None)])
        else {
            panic!("series failed");
        };
        assert_eq!(series.len(), 51);
        assert_eq!(series.iter().map(|b| b.value).sum::<u64>(), 1);
    }

    #[test]
    fn overlap_mode_with_bounds_clips_to_the_range() {
        let tz = chrono_tz::UTC;
        let from = at(tz, 2024, 1, 2, 0, 0);
        let to = at(tz, 2024, 1, 4, 23, 59);
        let events = vec![
            // Runs in from before the range.
            event("a", at(tz, 2023, 12, 30, 9, 0), Some(at(tz, 2024, 1, 3, 9, 0))),
            event("b", at(tz, 2024, 1, 4, 9, 0), None),
            event("c", at(tz, 2023, 12, 1, 9, 0), Some(at(tz, 2023, 12, 2, 9, 0))),
        ];
        let Ok(buckets) = DateHistogram::new(Interval::Day, tz, 10)
            .mode(CountMode::Overlap)
            .bounds(from, to)
            .compute(&events)
        else {
            panic!("date histogram failed");
        };
        assert_eq!(values(&buckets), vec![1, 1, 1]);
        assert_eq!(
            buckets.first().map(|b| b.key.as_str()),
            Some("2024-01-02T00:00:00+00:00")
        );
    }

    #[test]
    fn day_and_month_buckets_follow_dst_offsets() {
        let tz = chrono_tz::America::New_York;
        let events = vec![
            event("a", at(tz, 2024, 3, 9, 12, 0), None),
            event("b", at(tz, 2024, 3, 11, 12, 0), None),
        ];
        let Ok(days) = date_histogram(&events, Interval::Day, tz, 10) else {
            panic!("date histogram failed");
        };
        let keys: Vec<&str> = days.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "2024-03-09T00:00:00-05:00",
                "2024-03-10T00:00:00-05:00",
                "2024-03-11T00:00:00-04:00",
            ]
        );
        assert_eq!(values(&days), vec![1, 0, 1]);

        let spring = vec![
            event("c", at(tz, 2024, 3, 15, 12, 0), None),
            event("d", at(tz, 2024, 4, 2, 12, 0), None),
        ];
        let Ok(months) = date_histogram(&spring, Interval::Month, tz, 10) else {
            panic!("date histogram failed");
        };
        assert_eq!(
            months,
            vec![
                Bucket::new("2024-03-01T00:00:00-05:00", 1),
                Bucket::new("2024-04-01T00:00:00-04:00", 1),
            ]
        );
    }
}
