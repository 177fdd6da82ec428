//! Event search: normalize, fetch one page, re-derive pagination.

use std::sync::Arc;

use crate::domain::{Event, Page, RawFilterParams, SearchQuery, normalize_search, paginate};
use crate::error::GatewayError;
use crate::upstream::EventSource;

/// One page of search results with locally computed page metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Events on the page, at most `pagination.current_page_count`.
    pub events: Vec<Event>,
    /// Page window over the upstream total.
    pub pagination: Page,
    /// The normalized request that produced the page.
    pub query: SearchQuery,
}

/// Orchestrates paginated event search against an [`EventSource`].
#[derive(Debug, Clone)]
pub struct EventService {
    source: Arc<dyn EventSource>,
    default_per_page: i64,
}

impl EventService {
    /// Creates a new `EventService`.
    #[must_use]
    pub fn new(source: Arc<dyn EventSource>, default_per_page: i64) -> Self {
        Self {
            source,
            default_per_page,
        }
    }

    /// Normalizes `raw` and returns the requested page.
    ///
    /// # Errors
    ///
    /// Any normalization error, [`GatewayError::InvalidPageSize`], or the
    /// source's fetch error. Nothing is fetched when validation fails.
    pub async fn search(&self, raw: &RawFilterParams) -> Result<SearchOutcome, GatewayError> {
        let query = normalize_search(raw)?;
        self.search_normalized(query).await
    }

    /// Returns the requested page for an already normalized query.
    ///
    /// # Errors
    ///
    /// [`GatewayError::InvalidPageSize`] or the source's fetch error.
    pub async fn search_normalized(
        &self,
        query: SearchQuery,
    ) -> Result<SearchOutcome, GatewayError> {
        let page = query.page.unwrap_or(1);
        let per_page = query.per_page.unwrap_or(self.default_per_page);

        // Validates the page size and fixes the offset before any I/O.
        let window = paginate(0, page, per_page)?;
        let batch = self
            .source
            .fetch(
                &query.filter,
                &query.order,
                window.offset(),
                window.events_per_page,
            )
            .await?;

        let pagination = paginate(batch.total, page, per_page)?;
        let mut events = batch.events;
        events.truncate(usize::try_from(pagination.current_page_count).unwrap_or(usize::MAX));

        tracing::info!(
            total = pagination.total_events,
            page = pagination.current_page,
            returned = events.len(),
            "event search completed"
        );
        Ok(SearchOutcome {
            events,
            pagination,
            query,
        })
    }
}
