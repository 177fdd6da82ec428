//! System endpoints: health check and interval catalog.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::analytics::Interval;
use crate::api::dto::IntervalInfo;
use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health`: service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `GET /config/intervals`: list supported date-histogram intervals.
#[utoipa::path(
    get,
    path = "/config/intervals",
    tag = "System",
    summary = "List supported intervals",
    description = "Returns every interval `GET /api/v1/activity/date-histogram` accepts, shortest first.",
    responses(
        (status = 200, description = "Interval catalog", body = Vec<IntervalInfo>),
    )
)]
pub async fn intervals_handler() -> impl IntoResponse {
    let intervals: Vec<IntervalInfo> = Interval::ALL.into_iter().map(IntervalInfo::from).collect();
    (StatusCode::OK, Json(intervals))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/intervals", get(intervals_handler))
}
