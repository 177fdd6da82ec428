//! Analytics engine: pure, synchronous aggregations over a fetched event set.
//!
//! Nothing in this module performs I/O or holds state across calls; every
//! function is safe to call concurrently on disjoint inputs.
//!
//! ```text
//! histogram        ──┐
//! date_histogram ──► trend ──┴──► report
//! ```

pub mod date_histogram;
pub mod histogram;
pub mod interval;
pub mod report;
pub mod trend;

pub use date_histogram::{DateHistogram, MAX_DATE_HISTOGRAM_BUCKETS, TimeBucket, date_histogram};
pub use histogram::{GroupField, SortKey, UNKNOWN_KEY, histogram};
pub use interval::{CountMode, Interval, parse_timezone};
pub use report::{Report, compose_report};
pub use trend::{TrendMonth, TrendSummary, TrendWindow, monthly_trend};
