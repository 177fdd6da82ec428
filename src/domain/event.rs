//! Event records as returned by the inventory collaborator.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Physical venue where an event takes place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Venue {
    /// Venue display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Street address.
    #[serde(default)]
    pub address: Option<String>,
    /// Latitude in degrees, within `[-90, 90]`.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude in degrees, within `[-180, 180]`.
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Venue {
    /// Returns `(lat, lon)` when both coordinates are present and in range.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.latitude?;
        let lon = self.longitude?;
        ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)).then_some((lat, lon))
    }
}

/// A single event from the inventory.
///
/// Events are fetched fresh per request; the gateway only holds them for
/// the lifetime of one request. Every descriptive field is optional because
/// the inventory omits them freely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Event {
    /// Unique event identifier.
    pub id: String,
    /// Event title.
    #[serde(default)]
    pub name: String,
    /// Long-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// City label reported by the inventory (e.g. `"臺北"`).
    #[serde(default)]
    pub location: Option<String>,
    /// Start instant in epoch milliseconds.
    pub start_time: i64,
    /// End instant in epoch milliseconds. Missing means a point event.
    #[serde(default)]
    pub end_time: Option<i64>,
    /// Category label (e.g. `"音樂"`).
    #[serde(default)]
    pub category: Option<String>,
    /// Event type label (e.g. `"Web Post"`).
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,
    /// Venue details.
    #[serde(default)]
    pub venue: Option<Venue>,
}

impl Event {
    /// End instant, falling back to `start_time` for point events and
    /// clamping malformed records so that `start <= end` always holds.
    #[must_use]
    pub fn effective_end(&self) -> i64 {
        self.end_time.unwrap_or(self.start_time).max(self.start_time)
    }

    /// Whether `[start_time, end]` intersects the closed range `[from, to]`.
    #[must_use]
    pub fn overlaps(&self, from: Option<i64>, to: Option<i64>) -> bool {
        let after_from = from.is_none_or(|f| self.effective_end() >= f);
        let before_to = to.is_none_or(|t| self.start_time <= t);
        after_from && before_to
    }
}
