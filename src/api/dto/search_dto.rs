//! Search and recommendation DTOs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Event, Page, RawFilterParams};
use crate::service::SearchOutcome;

/// Response body for `GET /events` and `POST /recommend`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    /// Events on the requested page.
    pub events: Vec<Event>,
    /// Page metadata computed from the upstream total.
    pub pagination: Page,
    /// Canonical form of the parameters that produced this page.
    pub search_params: RawFilterParams,
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        let mut search_params = outcome.query.to_raw();
        search_params.page = Some(outcome.pagination.current_page.to_string());
        search_params.num = Some(outcome.pagination.events_per_page.to_string());
        Self {
            events: outcome.events,
            pagination: outcome.pagination,
            search_params,
        }
    }
}
