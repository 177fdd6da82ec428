//! Domain layer: event records, filter normalization, and paging.
//!
//! This module holds the request-independent value types of the gateway:
//! the [`Event`] record as fetched from the inventory, the canonical
//! [`QueryFilter`] every inbound shape is normalized into, the [`Page`]
//! window, and the [`Bucket`] emitted by every aggregation.

pub mod bucket;
pub mod event;
pub mod filter;
pub mod page;

pub use bucket::Bucket;
pub use event::{Event, Venue};
pub use filter::{
    GeoConstraint, QueryFilter, RawFilterParams, SearchOrder, SearchQuery, SortField, normalize,
    normalize_search,
};
pub use page::{Page, paginate};
