//! The event-source seam between services and the inventory.

use std::cmp::Ordering;
use std::fmt;

use async_trait::async_trait;

use crate::domain::{Event, QueryFilter, SearchOrder, SortField};
use crate::error::GatewayError;

/// One page of events plus the upstream match count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventBatch {
    /// Events on the requested slice, already ordered.
    pub events: Vec<Event>,
    /// Total number of events matching the filter upstream.
    pub total: u64,
}

/// Source of events for a normalized filter.
///
/// Pagination metadata is never trusted from the source; callers derive it
/// locally from [`EventBatch::total`].
#[async_trait]
pub trait EventSource: fmt::Debug + Send + Sync {
    /// Fetches up to `limit` events matching `filter`, skipping `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UpstreamFetch`] or
    /// [`GatewayError::UpstreamTimeout`] when the source is unavailable.
    async fn fetch(
        &self,
        filter: &QueryFilter,
        order: &SearchOrder,
        offset: u64,
        limit: u64,
    ) -> Result<EventBatch, GatewayError>;
}

/// Event source backed by a fixed in-process event list.
///
/// Applies [`QueryFilter::matches`], sorting and slicing locally. Ordering by
/// relevance or update time keeps insertion order since records carry
/// neither a score nor an update stamp.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventSource {
    events: Vec<Event>,
}

impl InMemoryEventSource {
    /// Wraps a list of events.
    #[must_use]
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl EventSource for InMemoryEventSource {
    async fn fetch(
        &self,
        filter: &QueryFilter,
        order: &SearchOrder,
        offset: u64,
        limit: u64,
    ) -> Result<EventBatch, GatewayError> {
        let mut matched: Vec<&Event> = self.events.iter().filter(|e| filter.matches(e)).collect();
        matched.sort_by(|a, b| compare(a, b, filter, order));

        let total = matched.len() as u64;
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        let events = matched.into_iter().skip(skip).take(take).cloned().collect();

        tracing::debug!(total, offset, limit, "in-memory fetch");
        Ok(EventBatch { events, total })
    }
}

fn compare(a: &Event, b: &Event, filter: &QueryFilter, order: &SearchOrder) -> Ordering {
    let ordering = match order.field {
        SortField::StartTime => a.start_time.cmp(&b.start_time),
        SortField::EndTime => a.effective_end().cmp(&b.effective_end()),
        SortField::Distance => match filter.geo() {
            Some(geo) => {
                let distance = |e: &Event| {
                    e.venue
                        .as_ref()
                        .and_then(|v| v.coordinates())
                        .map_or(f64::INFINITY, |(lat, lon)| geo.distance_km(lat, lon))
                };
                distance(a).total_cmp(&distance(b))
            }
            None => Ordering::Equal,
        },
        SortField::Score | SortField::UpdatedTime => Ordering::Equal,
    };
    if order.ascending {
        ordering
    } else {
        ordering.reverse()
    }
}
