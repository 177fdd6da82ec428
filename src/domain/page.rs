//! Deterministic page window computation.

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::GatewayError;

/// Page metadata derived from a total count and the requested window.
///
/// Never stored; recomputed on every request from the upstream total so
/// that inconsistent upstream paging cannot leak into responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Page {
    /// Current page number, always `>= 1`.
    pub current_page: u64,
    /// Page size, always `> 0`.
    pub events_per_page: u64,
    /// Total matching events.
    pub total_events: u64,
    /// `max(1, ceil(total_events / events_per_page))`.
    pub total_pages: u64,
    /// Events actually on this page.
    pub current_page_count: u64,
}

impl Page {
    /// Zero-based index of the first event on this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.current_page
            .saturating_sub(1)
            .saturating_mul(self.events_per_page)
    }

    /// Whether the requested page lies past the last page.
    #[must_use]
    pub const fn is_out_of_range(&self) -> bool {
        self.current_page > self.total_pages
    }
}

/// Computes the page window for `page` of size `per_page` over
/// `total_events` results.
///
/// `page < 1` is clamped to 1. Pages past the end are empty, not errors.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidPageSize`] if `per_page <= 0`.
pub fn paginate(total_events: u64, page: i64, per_page: i64) -> Result<Page, GatewayError> {
    if per_page <= 0 {
        return Err(GatewayError::InvalidPageSize(per_page));
    }
    let events_per_page = per_page.unsigned_abs();
    let current_page = page.max(1).unsigned_abs();
    let total_pages = total_events.div_ceil(events_per_page).max(1);

    let skipped = (current_page - 1).saturating_mul(events_per_page);
    let current_page_count = total_events.saturating_sub(skipped).min(events_per_page);

    Ok(Page {
        current_page,
        events_per_page,
        total_events,
        total_pages,
        current_page_count,
    })
}
