//! Event search handlers: query-string search and JSON-body recommendation.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::SearchResponse;
use crate::app_state::AppState;
use crate::domain::RawFilterParams;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /events`: search events with a normalized filter and pagination.
///
/// # Errors
///
/// Returns [`GatewayError`] on invalid parameters or upstream failure.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Events",
    summary = "Search events",
    description = "Normalizes the flat filter parameters, fetches the requested page from the inventory and re-derives pagination from the upstream total. Without an explicit sort, keyword searches order by relevance and others by start time.",
    params(RawFilterParams),
    responses(
        (status = 200, description = "One page of matching events", body = SearchResponse),
        (status = 400, description = "Invalid filter or paging parameter", body = ErrorResponse),
        (status = 503, description = "Inventory unavailable", body = ErrorResponse),
    )
)]
pub async fn search_events(
    State(state): State<AppState>,
    Query(raw): Query<RawFilterParams>,
) -> Result<impl IntoResponse, GatewayError> {
    let outcome = state.event_service.search(&raw).await?;
    Ok((StatusCode::OK, Json(SearchResponse::from(outcome))))
}

/// `POST /recommend`: the same search with parameters in a JSON body.
///
/// # Errors
///
/// Returns [`GatewayError`] on invalid parameters or upstream failure.
#[utoipa::path(
    post,
    path = "/api/v1/recommend",
    tag = "Events",
    summary = "Recommend events",
    description = "Same as `GET /events`, but reads the parameters from a JSON object. Numbers and booleans are accepted wherever a string is expected.",
    request_body = RawFilterParams,
    responses(
        (status = 200, description = "One page of matching events", body = SearchResponse),
        (status = 400, description = "Invalid filter or paging parameter", body = ErrorResponse),
        (status = 503, description = "Inventory unavailable", body = ErrorResponse),
    )
)]
pub async fn recommend_events(
    State(state): State<AppState>,
    Json(raw): Json<RawFilterParams>,
) -> Result<impl IntoResponse, GatewayError> {
    let outcome = state.event_service.search(&raw).await?;
    Ok((StatusCode::OK, Json(SearchResponse::from(outcome))))
}

/// Event search routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(search_events))
        .route("/recommend", post(recommend_events))
}
