//! Analytics service: fetches a filtered event set and runs the pure
//! aggregators over it.
//!
//! Every operation validates its options before touching the event source,
//! so a malformed request never costs an upstream call.

use std::sync::Arc;

use chrono_tz::Tz;
use serde::Serialize;
use utoipa::ToSchema;

use crate::analytics::trend::TREND_MONTHS;
use crate::analytics::{
    CountMode, DateHistogram, GroupField, Interval, Report, SortKey, TrendSummary, TrendWindow,
    compose_report, histogram, monthly_trend,
};
use crate::chart::ChartRenderer;
use crate::domain::bucket::total;
use crate::domain::{Bucket, Event, QueryFilter, RawFilterParams, SearchOrder, normalize};
use crate::error::GatewayError;
use crate::upstream::EventSource;

/// Default number of groups returned by a histogram.
pub const DEFAULT_HISTOGRAM_BUCKETS: i64 = 10;

/// Default bucket cap for date histograms.
pub const DEFAULT_DATE_HISTOGRAM_BUCKETS: i64 = 500;

/// Validated options for a grouped histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistogramOptions {
    /// Grouping field.
    pub group: GroupField,
    /// Ordering key.
    pub sort: SortKey,
    /// `true` for ascending.
    pub ascending: bool,
    /// Maximum number of groups returned.
    pub max_buckets: i64,
}

impl Default for HistogramOptions {
    fn default() -> Self {
        Self {
            group: GroupField::Category,
            sort: SortKey::Value,
            ascending: false,
            max_buckets: DEFAULT_HISTOGRAM_BUCKETS,
        }
    }
}

/// Validated options for a date histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateHistogramOptions {
    /// Bucket width.
    pub interval: Interval,
    /// Zone for bucket alignment.
    pub timezone: Tz,
    /// Bucket cap; exceeding it is an error.
    pub max_buckets: i64,
    /// Counting mode.
    pub mode: CountMode,
}

/// Six-month trend with its rendered chart.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthlyAnalysis {
    /// Trend statistics.
    #[serde(flatten)]
    pub trend: TrendSummary,
    /// Line chart as a data URI.
    pub chart: String,
}

/// City distribution with its rendered chart.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GeographicAnalysis {
    /// Cities by event count, busiest first.
    pub buckets: Vec<Bucket>,
    /// Events counted across the returned cities.
    pub total_events: u64,
    /// Bar chart as a data URI.
    pub chart: String,
}

/// Composed report with both charts.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReportAnalysis {
    /// Text and numeric payload.
    #[serde(flatten)]
    pub report: Report,
    /// Trend line chart as a data URI.
    pub monthly_chart: String,
    /// City bar chart as a data URI.
    pub geographic_chart: String,
}

/// Orchestrates analytics over events from an [`EventSource`].
#[derive(Debug, Clone)]
pub struct AnalyticsService {
    source: Arc<dyn EventSource>,
    charts: Arc<dyn ChartRenderer>,
    timezone: Tz,
    fetch_limit: u64,
}

impl AnalyticsService {
    /// Creates a new `AnalyticsService`.
    ///
    /// `timezone` anchors trend windows; `fetch_limit` caps how many events
    /// one analysis pulls from the source.
    #[must_use]
    pub fn new(
        source: Arc<dyn EventSource>,
        charts: Arc<dyn ChartRenderer>,
        timezone: Tz,
        fetch_limit: u64,
    ) -> Self {
        Self {
            source,
            charts,
            timezone,
            fetch_limit,
        }
    }

    /// Zone used for trend windows and default date-histogram alignment.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Grouped histogram over events matching `raw`.
    ///
    /// # Errors
    ///
    /// Normalization errors, [`GatewayError::InvalidLimit`], or the
    /// source's fetch error.
    pub async fn histogram(
        &self,
        raw: &RawFilterParams,
        options: HistogramOptions,
    ) -> Result<Vec<Bucket>, GatewayError> {
        let filter = normalize(raw)?;
        check_limit(options.max_buckets)?;
        let events = self.fetch_all(&filter).await?;
        histogram(
            &events,
            options.group,
            options.sort,
            options.ascending,
            options.max_buckets,
        )
    }

    /// Date histogram over events matching `raw`.
    ///
    /// When `raw` carries both `from` and `to`, the buckets span exactly that
    /// range; otherwise they span the fetched events.
    ///
    /// # Errors
    ///
    /// Normalization errors, [`GatewayError::InvalidLimit`],
    /// [`GatewayError::TooManyBuckets`], or the source's fetch error.
    pub async fn date_histogram(
        &self,
        raw: &RawFilterParams,
        options: DateHistogramOptions,
    ) -> Result<Vec<Bucket>, GatewayError> {
        let filter = normalize(raw)?;
        check_limit(options.max_buckets)?;
        let mut aggregator =
            DateHistogram::new(options.interval, options.timezone, options.max_buckets)
                .mode(options.mode);
        if let (Some(from), Some(to)) = (filter.from(), filter.to()) {
            aggregator = aggregator.bounds(from, to);
        }
        // Rejects an oversized cap or range before fetching.
        aggregator.compute(&[])?;
        let events = self.fetch_all(&filter).await?;
        aggregator.compute(&events)
    }

    /// Six-month trend ending with the month of `reference_ms`.
    ///
    /// The time range of `raw` is replaced by the trend window; other
    /// fields still narrow the events counted.
    ///
    /// # Errors
    ///
    /// Normalization errors, or [`GatewayError::InsufficientData`] when the
    /// fetch fails.
    pub async fn monthly(
        &self,
        raw: &RawFilterParams,
        reference_ms: i64,
    ) -> Result<MonthlyAnalysis, GatewayError> {
        let events = self.fetch_trend_window(raw, reference_ms).await?;
        let trend = monthly_trend(&events, reference_ms, self.timezone)?;
        let chart = self.trend_chart(&trend);
        Ok(MonthlyAnalysis { trend, chart })
    }

    /// City distribution over events matching `raw`.
    ///
    /// # Errors
    ///
    /// Normalization errors, [`GatewayError::InvalidLimit`], or the
    /// source's fetch error.
    pub async fn geographic(
        &self,
        raw: &RawFilterParams,
        max_buckets: i64,
    ) -> Result<GeographicAnalysis, GatewayError> {
        let buckets = self
            .histogram(
                raw,
                HistogramOptions {
                    group: GroupField::City,
                    max_buckets,
                    ..HistogramOptions::default()
                },
            )
            .await?;
        let chart = self.charts.bar_chart("Events by city", &buckets);
        Ok(GeographicAnalysis {
            total_events: total(&buckets),
            buckets,
            chart,
        })
    }

    /// Trend plus city report over the six-month window ending with the
    /// month of `reference_ms`.
    ///
    /// # Errors
    ///
    /// Normalization errors, or [`GatewayError::InsufficientData`] when the
    /// fetch fails.
    pub async fn report(
        &self,
        raw: &RawFilterParams,
        reference_ms: i64,
    ) -> Result<ReportAnalysis, GatewayError> {
        let events = self.fetch_trend_window(raw, reference_ms).await?;
        let report = compose_report(&events, reference_ms, self.timezone)?;
        let monthly_chart = self.trend_chart(&report.monthly);
        let geographic_chart = self.charts.bar_chart("Events by city", &report.geographic);
        Ok(ReportAnalysis {
            report,
            monthly_chart,
            geographic_chart,
        })
    }

    fn trend_chart(&self, trend: &TrendSummary) -> String {
        let series: Vec<Bucket> = trend
            .monthly
            .iter()
            .map(|m| Bucket::new(m.month.clone(), m.value))
            .collect();
        self.charts
            .line_chart(&format!("Events per month ({TREND_MONTHS} months)"), &series)
    }

    async fn fetch_trend_window(
        &self,
        raw: &RawFilterParams,
        reference_ms: i64,
    ) -> Result<Vec<Event>, GatewayError> {
        let window = TrendWindow::ending_at(reference_ms, self.timezone)?;
        let filter = normalize(raw)?.with_time_range(window.from_ms(), window.to_ms())?;
        self.fetch_all(&filter).await.map_err(|e| {
            tracing::warn!(error = %e, "trend fetch failed");
            GatewayError::InsufficientData(e.to_string())
        })
    }

    async fn fetch_all(&self, filter: &QueryFilter) -> Result<Vec<Event>, GatewayError> {
        let batch = self
            .source
            .fetch(filter, &SearchOrder::default(), 0, self.fetch_limit)
            .await?;
        if batch.total > batch.events.len() as u64 {
            tracing::warn!(
                total = batch.total,
                fetched = batch.events.len(),
                limit = self.fetch_limit,
                "analytics input truncated at fetch limit"
            );
        }
        Ok(batch.events)
    }
}

fn check_limit(max_buckets: i64) -> Result<(), GatewayError> {
    if max_buckets <= 0 {
        return Err(GatewayError::InvalidLimit {
            field: "num".to_string(),
            value: max_buckets,
        });
    }
    Ok(())
}
