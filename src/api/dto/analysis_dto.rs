//! Analytics query DTOs.
//!
//! Filter fields (`query`, `city`, `from`, ...) are read separately as
//! [`crate::domain::RawFilterParams`] from the same query string.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common_dto::{non_blank, parse_opt_bool, parse_opt_i64};
use crate::analytics::{CountMode, Interval, SortKey, parse_timezone};
use crate::error::GatewayError;
use crate::service::analytics_service::{
    DEFAULT_DATE_HISTOGRAM_BUCKETS, DEFAULT_HISTOGRAM_BUCKETS, DateHistogramOptions,
    HistogramOptions,
};

/// Query parameters for `GET /activity/histogram`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistogramQuery {
    /// `category` (default) or `city`.
    pub group: Option<String>,
    /// `value` (default) or `key`.
    pub sort: Option<String>,
    /// Ascending order; defaults to `false`.
    pub asc: Option<String>,
    /// Maximum number of groups; defaults to 10.
    pub num: Option<String>,
}

impl HistogramQuery {
    /// Validates into service options.
    ///
    /// # Errors
    ///
    /// [`GatewayError::UnsupportedGroupField`] or
    /// [`GatewayError::InvalidParameter`].
    pub fn options(&self) -> Result<HistogramOptions, GatewayError> {
        let defaults = HistogramOptions::default();
        Ok(HistogramOptions {
            group: match non_blank(self.group.as_deref()) {
                Some(g) => g.parse()?,
                None => defaults.group,
            },
            sort: match non_blank(self.sort.as_deref()) {
                Some(s) => s.parse::<SortKey>()?,
                None => defaults.sort,
            },
            ascending: parse_opt_bool("asc", self.asc.as_deref())?.unwrap_or(defaults.ascending),
            max_buckets: parse_opt_i64("num", self.num.as_deref())?
                .unwrap_or(DEFAULT_HISTOGRAM_BUCKETS),
        })
    }
}

/// Query parameters for `GET /activity/date-histogram`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateHistogramQuery {
    /// `1m`, `1h`, `1d` (default), `1w`, `1M` or the long names.
    pub interval: Option<String>,
    /// IANA zone; defaults to the configured report zone.
    pub timezone: Option<String>,
    /// Bucket cap; defaults to 500 and may not exceed 10000.
    pub num: Option<String>,
    /// `start_time` (default) or `overlap`.
    pub mode: Option<String>,
}

impl DateHistogramQuery {
    /// Validates into service options.
    ///
    /// # Errors
    ///
    /// [`GatewayError::InvalidInterval`], [`GatewayError::InvalidTimezone`]
    /// or [`GatewayError::InvalidParameter`].
    pub fn options(&self, default_timezone: Tz) -> Result<DateHistogramOptions, GatewayError> {
        Ok(DateHistogramOptions {
            interval: match non_blank(self.interval.as_deref()) {
                Some(i) => i.parse()?,
                None => Interval::Day,
            },
            timezone: match non_blank(self.timezone.as_deref()) {
                Some(tz) => parse_timezone(tz)?,
                None => default_timezone,
            },
            max_buckets: parse_opt_i64("num", self.num.as_deref())?
                .unwrap_or(DEFAULT_DATE_HISTOGRAM_BUCKETS),
            mode: match non_blank(self.mode.as_deref()) {
                Some(m) => m.parse()?,
                None => CountMode::default(),
            },
        })
    }
}

/// Query parameters for the monthly and report endpoints.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TrendQuery {
    /// Reference instant in epoch milliseconds; defaults to now.
    pub reference: Option<String>,
}

impl TrendQuery {
    /// Reference instant, or `now_ms` when absent.
    ///
    /// # Errors
    ///
    /// [`GatewayError::InvalidParameter`] for a malformed value.
    pub fn reference_or(&self, now_ms: i64) -> Result<i64, GatewayError> {
        Ok(parse_opt_i64("reference", self.reference.as_deref())?.unwrap_or(now_ms))
    }
}

/// Query parameters for `GET /analysis/geographic`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GeographicQuery {
    /// Maximum number of cities; defaults to 10.
    pub num: Option<String>,
}

impl GeographicQuery {
    /// City cap.
    ///
    /// # Errors
    ///
    /// [`GatewayError::InvalidParameter`] for a malformed value.
    pub fn max_buckets(&self) -> Result<i64, GatewayError> {
        Ok(parse_opt_i64("num", self.num.as_deref())?.unwrap_or(DEFAULT_HISTOGRAM_BUCKETS))
    }
}

/// One entry of `GET /config/intervals`.
#[derive(Debug, Serialize, ToSchema)]
pub struct IntervalInfo {
    /// Short spelling, e.g. `1d`.
    pub interval: &'static str,
    /// Whether buckets are calendar-aligned rather than fixed-width.
    pub calendar: bool,
    /// Fixed bucket width in milliseconds, if any.
    pub width_ms: Option<i64>,
}

impl From<Interval> for IntervalInfo {
    fn from(interval: Interval) -> Self {
        Self {
            interval: interval.as_str(),
            calendar: interval.fixed_width_ms().is_none(),
            width_ms: interval.fixed_width_ms(),
        }
    }
}
