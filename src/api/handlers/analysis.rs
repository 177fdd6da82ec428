//! Analytics handlers: histograms, trend, city distribution, and report.
//!
//! Every endpoint reads the shared filter parameters alongside its own
//! options from the same query string. The filter's paging and sort fields
//! are ignored here, so `sort`, `asc` and `num` only reach the options.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{DateHistogramQuery, GeographicQuery, HistogramQuery, TrendQuery};
use crate::app_state::AppState;
use crate::domain::{Bucket, RawFilterParams};
use crate::error::{ErrorResponse, GatewayError};
use crate::service::{GeographicAnalysis, MonthlyAnalysis, ReportAnalysis};

/// `GET /activity/histogram`: event counts grouped by category or city.
///
/// # Errors
///
/// Returns [`GatewayError`] on invalid options or upstream failure.
#[utoipa::path(
    get,
    path = "/api/v1/activity/histogram",
    tag = "Analytics",
    summary = "Group histogram",
    description = "Counts matching events per category or per city. Events without the field are counted under `unknown`. `sort`, `asc` and `num` here order and truncate the groups, not the events.",
    params(HistogramQuery),
    responses(
        (status = 200, description = "Groups in the requested order", body = Vec<Bucket>),
        (status = 400, description = "Invalid option or filter", body = ErrorResponse),
        (status = 503, description = "Inventory unavailable", body = ErrorResponse),
    )
)]
pub async fn histogram(
    State(state): State<AppState>,
    Query(filter): Query<RawFilterParams>,
    Query(query): Query<HistogramQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let options = query.options()?;
    let buckets = state
        .analytics_service
        .histogram(&filter, options)
        .await?;
    Ok((StatusCode::OK, Json(buckets)))
}

/// `GET /activity/date-histogram`: event counts per calendar bucket.
///
/// # Errors
///
/// Returns [`GatewayError`] on invalid options, too many buckets, or
/// upstream failure.
#[utoipa::path(
    get,
    path = "/api/v1/activity/date-histogram",
    tag = "Analytics",
    summary = "Date histogram",
    description = "Counts matching events per interval bucket aligned in the given timezone. The series is gap-free; with both `from` and `to` it spans exactly that range.",
    params(DateHistogramQuery),
    responses(
        (status = 200, description = "Buckets keyed by ISO-8601 local start", body = Vec<Bucket>),
        (status = 400, description = "Invalid interval, timezone or bucket cap", body = ErrorResponse),
        (status = 503, description = "Inventory unavailable", body = ErrorResponse),
    )
)]
pub async fn date_histogram(
    State(state): State<AppState>,
    Query(filter): Query<RawFilterParams>,
    Query(query): Query<DateHistogramQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let options = query.options(state.analytics_service.timezone())?;
    let buckets = state
        .analytics_service
        .date_histogram(&filter, options)
        .await?;
    Ok((StatusCode::OK, Json(buckets)))
}

/// `GET /analysis/monthly`: six-month trend with a line chart.
///
/// # Errors
///
/// Returns [`GatewayError`] on invalid parameters or when the window
/// cannot be fetched.
#[utoipa::path(
    get,
    path = "/api/v1/analysis/monthly",
    tag = "Analytics",
    summary = "Monthly trend",
    description = "Counts matching events for the six calendar months ending with the reference month. Any `from`/`to` in the filter is replaced by that window.",
    params(TrendQuery),
    responses(
        (status = 200, description = "Trend summary and chart", body = MonthlyAnalysis),
        (status = 400, description = "Invalid parameter", body = ErrorResponse),
        (status = 503, description = "Insufficient data", body = ErrorResponse),
    )
)]
pub async fn monthly(
    State(state): State<AppState>,
    Query(filter): Query<RawFilterParams>,
    Query(query): Query<TrendQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let reference = query.reference_or(Utc::now().timestamp_millis())?;
    let analysis = state
        .analytics_service
        .monthly(&filter, reference)
        .await?;
    Ok((StatusCode::OK, Json(analysis)))
}

/// `GET /analysis/geographic`: event counts per city with a bar chart.
///
/// # Errors
///
/// Returns [`GatewayError`] on invalid parameters or upstream failure.
#[utoipa::path(
    get,
    path = "/api/v1/analysis/geographic",
    tag = "Analytics",
    summary = "City distribution",
    description = "Counts matching events per city, busiest first, truncated to `num` cities.",
    params(GeographicQuery),
    responses(
        (status = 200, description = "City buckets and chart", body = GeographicAnalysis),
        (status = 400, description = "Invalid parameter", body = ErrorResponse),
        (status = 503, description = "Inventory unavailable", body = ErrorResponse),
    )
)]
pub async fn geographic(
    State(state): State<AppState>,
    Query(filter): Query<RawFilterParams>,
    Query(query): Query<GeographicQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let max_buckets = query.max_buckets()?;
    let analysis = state
        .analytics_service
        .geographic(&filter, max_buckets)
        .await?;
    Ok((StatusCode::OK, Json(analysis)))
}

/// `GET /analysis/report`: trend and city report with both charts.
///
/// # Errors
///
/// Returns [`GatewayError`] on invalid parameters or when the window
/// cannot be fetched.
#[utoipa::path(
    get,
    path = "/api/v1/analysis/report",
    tag = "Analytics",
    summary = "Activity report",
    description = "Composes the six-month trend and the top cities over the same window into a text summary with numeric series and charts.",
    params(TrendQuery),
    responses(
        (status = 200, description = "Composed report", body = ReportAnalysis),
        (status = 400, description = "Invalid parameter", body = ErrorResponse),
        (status = 503, description = "Insufficient data", body = ErrorResponse),
    )
)]
pub async fn report(
    State(state): State<AppState>,
    Query(filter): Query<RawFilterParams>,
    Query(query): Query<TrendQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let reference = query.reference_or(Utc::now().timestamp_millis())?;
    let analysis = state
        .analytics_service
        .report(&filter, reference)
        .await?;
    Ok((StatusCode::OK, Json(analysis)))
}

/// Analytics routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/activity/histogram", get(histogram))
        .route("/activity/date-histogram", get(date_histogram))
        .route("/analysis/monthly", get(monthly))
        .route("/analysis/geographic", get(geographic))
        .route("/analysis/report", get(report))
}
