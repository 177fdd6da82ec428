//! Categorical histogram: group, count, sort, truncate.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Bucket, Event};
use crate::error::GatewayError;

/// Key used for events that carry no value for the group field.
pub const UNKNOWN_KEY: &str = "unknown";

/// Fields a histogram can group on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GroupField {
    /// Event category.
    Category,
    /// Event city (the inventory's `location`).
    City,
}

impl GroupField {
    fn value_of<'a>(&self, event: &'a Event) -> Option<&'a str> {
        let value = match self {
            Self::Category => event.category.as_deref(),
            Self::City => event.location.as_deref(),
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }
}

impl FromStr for GroupField {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "category" => Ok(Self::Category),
            "city" => Ok(Self::City),
            other => Err(GatewayError::UnsupportedGroupField(other.to_string())),
        }
    }
}

/// Primary sort key for histogram buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Sort by count.
    #[default]
    Value,
    /// Sort by label.
    Key,
}

impl FromStr for SortKey {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "value" => Ok(Self::Value),
            "key" => Ok(Self::Key),
            other => Err(GatewayError::invalid_parameter(
                "sort",
                format!("`{other}` is not one of value, key"),
            )),
        }
    }
}

/// Groups `events` by `group_field`, counts, sorts, and keeps the first
/// `max_buckets` entries.
///
/// Events without a value land in the [`UNKNOWN_KEY`] bucket, so the counts
/// before truncation always sum to `events.len()`. Ties on the primary key
/// are broken by label ascending whatever the direction.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidLimit`] if `max_buckets <= 0`.
pub fn histogram(
    events: &[Event],
    group_field: GroupField,
    sort_key: SortKey,
    ascending: bool,
    max_buckets: i64,
) -> Result<Vec<Bucket>, GatewayError> {
    if max_buckets <= 0 {
        return Err(GatewayError::InvalidLimit {
            field: "num".to_string(),
            value: max_buckets,
        });
    }

    let mut counts: HashMap<&str, u64> = HashMap::new();
    for event in events {
        let key = group_field.value_of(event).unwrap_or(UNKNOWN_KEY);
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut buckets: Vec<Bucket> = counts
        .into_iter()
        .map(|(key, value)| Bucket::new(key, value))
        .collect();

    buckets.sort_by(|a, b| {
        let primary = match sort_key {
            SortKey::Value => a.value.cmp(&b.value),
            SortKey::Key => a.key.cmp(&b.key),
        };
        let primary = if ascending {
            primary
        } else {
            primary.reverse()
        };
        match primary {
            Ordering::Equal => a.key.cmp(&b.key),
            other => other,
        }
    });

    buckets.truncate(usize::try_from(max_buckets).unwrap_or(usize::MAX));

    tracing::debug!(
        group = ?group_field,
        events = events.len(),
        buckets = buckets.len(),
        "histogram computed"
    );
    Ok(buckets)
}
