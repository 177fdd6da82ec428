//! Chart rendering for analysis responses.
//!
//! Renderers turn a `{key, value}` series into a self-contained image
//! reference that clients can drop into an `<img src>`.

pub mod svg;

use std::fmt;

use crate::domain::Bucket;

pub use svg::SvgChartRenderer;

/// Renders bucket series into image data URIs.
pub trait ChartRenderer: fmt::Debug + Send + Sync {
    /// Vertical bar chart, one bar per bucket in input order.
    fn bar_chart(&self, title: &str, buckets: &[Bucket]) -> String;

    /// Line chart through the buckets in input order.
    fn line_chart(&self, title: &str, buckets: &[Bucket]) -> String;
}
