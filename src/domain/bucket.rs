//! Aggregation output: a keyed count.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One `{key, value}` pair of a histogram or date histogram.
///
/// `key` is a category/city label for histograms and the ISO-8601 bucket
/// start for date histograms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Bucket {
    /// Label or ISO-8601 bucket start.
    pub key: String,
    /// Number of events counted into the bucket.
    pub value: u64,
}

impl Bucket {
    /// Creates a bucket.
    #[must_use]
    pub fn new(key: impl Into<String>, value: u64) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Sum of `value` over a bucket sequence.
#[must_use]
pub fn total(buckets: &[Bucket]) -> u64 {
    buckets.iter().map(|b| b.value).sum()
}
