//! Filter normalization: raw, untrusted query parameters into a canonical
//! [`QueryFilter`].
//!
//! Every inbound shape (REST query strings, JSON bodies, LLM-extracted
//! parameters) lands in [`RawFilterParams`] first and goes through
//! [`normalize`]. Nothing downstream ever reads raw parameters.

use std::collections::BTreeSet;
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::event::Event;
use crate::error::GatewayError;

/// Radius applied when a geo point is given without a radius, in kilometres.
pub const DEFAULT_RADIUS_KM: f64 = 10.0;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Flat, untrusted filter and paging parameters.
///
/// Every field is kept as an optional string so that malformed values reach
/// [`normalize`] and fail there with a field-identifying error instead of
/// being rejected by the extractor. Numbers and booleans in JSON bodies are
/// accepted and stringified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RawFilterParams {
    /// Free-text keyword.
    #[serde(default, deserialize_with = "lenient_string")]
    pub query: Option<String>,
    /// Lower time bound, epoch milliseconds.
    #[serde(default, deserialize_with = "lenient_string")]
    pub from: Option<String>,
    /// Upper time bound, epoch milliseconds.
    #[serde(default, deserialize_with = "lenient_string")]
    pub to: Option<String>,
    /// Comma-separated city list.
    #[serde(default, deserialize_with = "lenient_string")]
    pub city: Option<String>,
    /// Comma-separated category list.
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
    /// Comma-separated event type list.
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    pub event_type: Option<String>,
    /// Single event identifier.
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    /// Geo point as `"lat,lon"`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub gps: Option<String>,
    /// Geo radius in kilometres.
    #[serde(default, deserialize_with = "lenient_string")]
    pub radius: Option<String>,
    /// Requested page (1-based). Also accepted as `p`.
    #[serde(default, alias = "p", deserialize_with = "lenient_string")]
    pub page: Option<String>,
    /// Page size.
    #[serde(default, deserialize_with = "lenient_string")]
    pub num: Option<String>,
    /// Sort field.
    #[serde(default, deserialize_with = "lenient_string")]
    pub sort: Option<String>,
    /// Sort direction, `true` for ascending.
    #[serde(default, deserialize_with = "lenient_string")]
    pub asc: Option<String>,
}

/// A geo point with a search radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoConstraint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Radius in kilometres, always `> 0`.
    pub radius_km: f64,
}

impl GeoConstraint {
    /// Great-circle distance from this point to `(lat, lon)` in kilometres.
    #[must_use]
    pub fn distance_km(&self, lat: f64, lon: f64) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), lat.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (lon - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }

    /// Renders the point in the `"lat,lon"` wire form.
    #[must_use]
    pub fn point_string(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

/// Canonical, immutable event predicate.
///
/// An empty filter matches every event. Set-valued fields are OR within the
/// field and AND across fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryFilter {
    query: Option<String>,
    from: Option<i64>,
    to: Option<i64>,
    city: BTreeSet<String>,
    category: BTreeSet<String>,
    #[serde(rename = "type")]
    event_type: BTreeSet<String>,
    id: Option<String>,
    geo: Option<GeoConstraint>,
}

impl QueryFilter {
    /// Keyword, trimmed and non-empty.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Lower time bound in epoch milliseconds.
    #[must_use]
    pub const fn from(&self) -> Option<i64> {
        self.from
    }

    /// Upper time bound in epoch milliseconds.
    #[must_use]
    pub const fn to(&self) -> Option<i64> {
        self.to
    }

    /// Accepted cities.
    #[must_use]
    pub const fn cities(&self) -> &BTreeSet<String> {
        &self.city
    }

    /// Accepted categories.
    #[must_use]
    pub const fn categories(&self) -> &BTreeSet<String> {
        &self.category
    }

    /// Accepted event types.
    #[must_use]
    pub const fn types(&self) -> &BTreeSet<String> {
        &self.event_type
    }

    /// Specific event id.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Geo constraint.
    #[must_use]
    pub const fn geo(&self) -> Option<&GeoConstraint> {
        self.geo.as_ref()
    }

    /// Whether no field constrains the result.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns a copy whose time range is replaced by `[from, to]`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRange`] if `from > to`.
    pub fn with_time_range(&self, from: i64, to: i64) -> Result<Self, GatewayError> {
        if from > to {
            return Err(GatewayError::InvalidRange { from, to });
        }
        Ok(Self {
            from: Some(from),
            to: Some(to),
            ..self.clone()
        })
    }

    /// Returns a copy restricted to a single category.
    #[must_use]
    pub fn with_category(&self, category: &str) -> Self {
        let mut next = self.clone();
        next.category = BTreeSet::from([category.to_string()]);
        next
    }

    /// Evaluates the predicate against one event.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        if self.id.as_deref().is_some_and(|id| id != event.id) {
            return false;
        }
        if !event.overlaps(self.from, self.to) {
            return false;
        }
        if !in_set(&self.city, event.location.as_deref())
            || !in_set(&self.category, event.category.as_deref())
            || !in_set(&self.event_type, event.event_type.as_deref())
        {
            return false;
        }
        if let Some(query) = &self.query {
            if !keyword_matches(query, event) {
                return false;
            }
        }
        if let Some(geo) = &self.geo {
            let within = event
                .venue
                .as_ref()
                .and_then(|v| v.coordinates())
                .is_some_and(|(lat, lon)| geo.distance_km(lat, lon) <= geo.radius_km);
            if !within {
                return false;
            }
        }
        true
    }
}

fn in_set(set: &BTreeSet<String>, value: Option<&str>) -> bool {
    set.is_empty() || value.is_some_and(|v| set.contains(v))
}

fn keyword_matches(query: &str, event: &Event) -> bool {
    let haystack = [
        Some(event.name.as_str()),
        event.description.as_deref(),
        event.location.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::to_lowercase)
    .collect::<Vec<_>>()
    .join("\n");

    query
        .split_whitespace()
        .all(|term| haystack.contains(&term.to_lowercase()))
}

/// Upstream sort keys accepted by the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum SortField {
    /// Relevance score of the keyword match.
    #[serde(rename = "_score")]
    Score,
    /// Event start time.
    #[serde(rename = "start_time")]
    StartTime,
    /// Event end time.
    #[serde(rename = "end_time")]
    EndTime,
    /// Last update time in the inventory.
    #[serde(rename = "updated_time")]
    UpdatedTime,
    /// Distance from the geo point.
    #[serde(rename = "distance")]
    Distance,
}

impl SortField {
    /// Wire name of this sort key.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Score => "_score",
            Self::StartTime => "start_time",
            Self::EndTime => "end_time",
            Self::UpdatedTime => "updated_time",
            Self::Distance => "distance",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "_score" | "score" => Some(Self::Score),
            "start_time" => Some(Self::StartTime),
            "end_time" => Some(Self::EndTime),
            "updated_time" => Some(Self::UpdatedTime),
            "distance" => Some(Self::Distance),
            _ => None,
        }
    }
}

/// Normalized result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct SearchOrder {
    /// Sort key.
    pub field: SortField,
    /// `true` for ascending.
    pub ascending: bool,
}

impl Default for SearchOrder {
    fn default() -> Self {
        Self {
            field: SortField::StartTime,
            ascending: true,
        }
    }
}

/// A fully normalized search request: predicate, order, and raw paging.
///
/// Paging values are left unchecked here; [`super::page::paginate`] owns
/// their clamping and validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    /// Event predicate.
    pub filter: QueryFilter,
    /// Result ordering.
    pub order: SearchOrder,
    /// Requested page, if given.
    pub page: Option<i64>,
    /// Requested page size, if given.
    pub per_page: Option<i64>,
}

impl SearchQuery {
    /// Canonical flat parameters that normalize back to this query.
    #[must_use]
    pub fn to_raw(&self) -> RawFilterParams {
        let f = &self.filter;
        let joined = |set: &BTreeSet<String>| {
            (!set.is_empty()).then(|| set.iter().cloned().collect::<Vec<_>>().join(","))
        };
        RawFilterParams {
            query: f.query.clone(),
            from: f.from.map(|v| v.to_string()),
            to: f.to.map(|v| v.to_string()),
            city: joined(&f.city),
            category: joined(&f.category),
            event_type: joined(&f.event_type),
            id: f.id.clone(),
            gps: f.geo.map(|g| g.point_string()),
            radius: f.geo.map(|g| g.radius_km.to_string()),
            page: self.page.map(|v| v.to_string()),
            num: self.per_page.map(|v| v.to_string()),
            sort: Some(self.order.field.as_str().to_string()),
            asc: Some(self.order.ascending.to_string()),
        }
    }
}

/// Canonicalizes raw filter parameters into a [`QueryFilter`].
///
/// Paging and sort fields on `raw` are ignored here; see
/// [`normalize_search`].
///
/// # Errors
///
/// - [`GatewayError::InvalidParameter`] for malformed numbers.
/// - [`GatewayError::InvalidRange`] when `from > to`.
/// - [`GatewayError::InvalidGeo`] for a bad point or non-positive radius.
pub fn normalize(raw: &RawFilterParams) -> Result<QueryFilter, GatewayError> {
    let from = parse_epoch_ms("from", raw.from.as_deref())?;
    let to = parse_epoch_ms("to", raw.to.as_deref())?;
    if let (Some(f), Some(t)) = (from, to) {
        if f > t {
            return Err(GatewayError::InvalidRange { from: f, to: t });
        }
    }

    let radius = match non_blank(raw.radius.as_deref()) {
        Some(r) => Some(parse_float("radius", r)?),
        None => None,
    };
    let geo = match non_blank(raw.gps.as_deref()) {
        Some(gps) => Some(parse_geo(gps, radius)?),
        None => None,
    };

    Ok(QueryFilter {
        query: non_blank(raw.query.as_deref()).map(ToString::to_string),
        from,
        to,
        city: split_set(raw.city.as_deref()),
        category: split_set(raw.category.as_deref()),
        event_type: split_set(raw.event_type.as_deref()),
        id: non_blank(raw.id.as_deref()).map(ToString::to_string),
        geo,
    })
}

/// Normalizes the filter plus ordering and paging parameters.
///
/// Without an explicit sort, keyword searches order by relevance
/// descending and everything else by start time ascending.
///
/// # Errors
///
/// Everything [`normalize`] returns, plus
/// [`GatewayError::InvalidParameter`] for malformed `page`, `num`, `sort`,
/// or `asc`.
pub fn normalize_search(raw: &RawFilterParams) -> Result<SearchQuery, GatewayError> {
    let filter = normalize(raw)?;

    let default_order = if filter.query().is_some() {
        SearchOrder {
            field: SortField::Score,
            ascending: false,
        }
    } else {
        SearchOrder::default()
    };

    let field = match non_blank(raw.sort.as_deref()) {
        Some(s) => SortField::parse(s).ok_or_else(|| {
            GatewayError::invalid_parameter("sort", format!("unsupported sort field `{s}`"))
        })?,
        None => default_order.field,
    };
    let ascending = match non_blank(raw.asc.as_deref()) {
        Some(a) => parse_bool("asc", a)?,
        None if raw.sort.is_some() => true,
        None => default_order.ascending,
    };

    let page = match non_blank(raw.page.as_deref()) {
        Some(p) => Some(parse_int("page", p)?),
        None => None,
    };
    let per_page = match non_blank(raw.num.as_deref()) {
        Some(n) => Some(parse_int("num", n)?),
        None => None,
    };

    Ok(SearchQuery {
        filter,
        order: SearchOrder { field, ascending },
        page,
        per_page,
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn split_set(value: Option<&str>) -> BTreeSet<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_int(field: &str, raw: &str) -> Result<i64, GatewayError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| GatewayError::invalid_parameter(field, format!("`{raw}` is not an integer")))
}

fn parse_epoch_ms(field: &str, raw: Option<&str>) -> Result<Option<i64>, GatewayError> {
    non_blank(raw)
        .map(|v| {
            v.parse::<i64>().map_err(|_| {
                GatewayError::invalid_parameter(
                    field,
                    format!("`{v}` is not an epoch-millisecond integer"),
                )
            })
        })
        .transpose()
}

fn parse_float(field: &str, raw: &str) -> Result<f64, GatewayError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| GatewayError::invalid_parameter(field, format!("`{raw}` is not a number")))
}

fn parse_bool(field: &str, raw: &str) -> Result<bool, GatewayError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(GatewayError::invalid_parameter(
            field,
            format!("`{raw}` is not a boolean"),
        )),
    }
}

fn parse_geo(gps: &str, radius: Option<f64>) -> Result<GeoConstraint, GatewayError> {
    let mut parts = gps.split(',').map(str::trim);
    let (Some(lat), Some(lon), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(GatewayError::InvalidGeo(format!(
            "gps `{gps}` must be `lat,lon`"
        )));
    };
    let latitude = lat
        .parse::<f64>()
        .ok()
        .filter(|v| (-90.0..=90.0).contains(v))
        .ok_or_else(|| GatewayError::InvalidGeo(format!("latitude `{lat}` not in [-90, 90]")))?;
    let longitude = lon
        .parse::<f64>()
        .ok()
        .filter(|v| (-180.0..=180.0).contains(v))
        .ok_or_else(|| {
            GatewayError::InvalidGeo(format!("longitude `{lon}` not in [-180, 180]"))
        })?;

    let radius_km = radius.unwrap_or(DEFAULT_RADIUS_KM);
    if radius_km <= 0.0 {
        return Err(GatewayError::InvalidGeo(format!(
            "radius {radius_km} must be > 0"
        )));
    }

    Ok(GeoConstraint {
        latitude,
        longitude,
        radius_km,
    })
}

/// Accepts strings, numbers and booleans, yielding their string form.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct LenientVisitor;

    impl<'de> Visitor<'de> for LenientVisitor {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string, number, boolean, or null")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2: Deserializer<'de>>(self, d: D2) -> Result<Self::Value, D2::Error> {
            d.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(LenientVisitor)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::event::Venue;

    fn raw() -> RawFilterParams {
        RawFilterParams::default()
    }

    fn event(id: &str, city: &str, category: &str, start: i64) -> Event {
        Event {
            id: id.to_string(),
            name: format!("event {id}"),
            location: Some(city.to_string()),
            category: Some(category.to_string()),
            start_time: start,
            ..Event::default()
        }
    }

    #[test]
    fn empty_params_give_empty_filter() {
        let Ok(filter) = normalize(&raw()) else {
            panic!("normalize failed");
        };
        assert!(filter.is_empty());
        assert!(filter.matches(&event("a", "臺北", "音樂", 0)));
    }

    #[test]
    fn lists_are_trimmed_deduped_and_blank_dropped() {
        let params = RawFilterParams {
            city: Some(" 臺北, 高雄,,臺北 ,".to_string()),
            ..raw()
        };
        let Ok(filter) = normalize(&params) else {
            panic!("normalize failed");
        };
        let cities: Vec<&str> = filter.cities().iter().map(String::as_str).collect();
        assert_eq!(cities, vec!["臺北", "高雄"]);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let params = RawFilterParams {
            from: Some("2000".to_string()),
            to: Some("1000".to_string()),
            ..raw()
        };
        assert_eq!(
            normalize(&params),
            Err(GatewayError::InvalidRange {
                from: 2000,
                to: 1000
            })
        );
    }

    #[test]
    fn malformed_number_names_field() {
        let params = RawFilterParams {
            to: Some("tomorrow".to_string()),
            ..raw()
        };
        let Err(GatewayError::InvalidParameter { field, .. }) = normalize(&params) else {
            panic!("expected InvalidParameter");
        };
        assert_eq!(field, "to");
    }

    #[test]
    fn gps_defaults_radius_and_validates_range() {
        let params = RawFilterParams {
            gps: Some("25.03, 121.56".to_string()),
            ..raw()
        };
        let Ok(filter) = normalize(&params) else {
            panic!("normalize failed");
        };
        let Some(geo) = filter.geo() else {
            panic!("expected geo");
        };
        assert!((geo.radius_km - DEFAULT_RADIUS_KM).abs() < f64::EPSILON);

        let bad = RawFilterParams {
            gps: Some("95,121".to_string()),
            ..raw()
        };
        assert!(matches!(normalize(&bad), Err(GatewayError::InvalidGeo(_))));

        let zero_radius = RawFilterParams {
            gps: Some("25,121".to_string()),
            radius: Some("0".to_string()),
            ..raw()
        };
        assert!(matches!(
            normalize(&zero_radius),
            Err(GatewayError::InvalidGeo(_))
        ));

        let one_part = RawFilterParams {
            gps: Some("25".to_string()),
            ..raw()
        };
        assert!(matches!(
            normalize(&one_part),
            Err(GatewayError::InvalidGeo(_))
        ));
    }

    #[test]
    fn id_is_retained_alongside_other_fields() {
        let params = RawFilterParams {
            id: Some("e9".to_string()),
            category: Some("音樂".to_string()),
            ..raw()
        };
        let Ok(filter) = normalize(&params) else {
            panic!("normalize failed");
        };
        assert_eq!(filter.id(), Some("e9"));
        assert_eq!(filter.categories().len(), 1);
        assert!(!filter.matches(&event("e1", "臺北", "音樂", 0)));
        assert!(filter.matches(&event("e9", "臺北", "音樂", 0)));
    }

    #[test]
    fn or_within_field_and_across_fields() {
        let params = RawFilterParams {
            city: Some("臺北,高雄".to_string()),
            category: Some("音樂".to_string()),
            ..raw()
        };
        let Ok(filter) = normalize(&params) else {
            panic!("normalize failed");
        };
        assert!(filter.matches(&event("a", "臺北", "音樂", 0)));
        assert!(filter.matches(&event("b", "高雄", "音樂", 0)));
        assert!(!filter.matches(&event("c", "高雄", "展覽", 0)));
        assert!(!filter.matches(&event("d", "臺中", "音樂", 0)));
    }

    #[test]
    fn keyword_requires_every_term() {
        let params = RawFilterParams {
            query: Some("親子 展覽".to_string()),
            ..raw()
        };
        let Ok(filter) = normalize(&params) else {
            panic!("normalize failed");
        };
        let mut hit = event("a", "臺北", "展覽", 0);
        hit.name = "親子藝術展覽".to_string();
        let mut miss = event("b", "臺北", "展覽", 0);
        miss.name = "藝術展覽".to_string();
        assert!(filter.matches(&hit));
        assert!(!filter.matches(&miss));
    }

    #[test]
    fn geo_filter_uses_distance() {
        let params = RawFilterParams {
            gps: Some("25.0330,121.5654".to_string()),
            radius: Some("5".to_string()),
            ..raw()
        };
        let Ok(filter) = normalize(&params) else {
            panic!("normalize failed");
        };
        let mut near = event("near", "臺北", "音樂", 0);
        near.venue = Some(Venue {
            latitude: Some(25.0478),
            longitude: Some(121.5170),
            ..Venue::default()
        });
        let mut far = event("far", "高雄", "音樂", 0);
        far.venue = Some(Venue {
            latitude: Some(22.6273),
            longitude: Some(120.3014),
            ..Venue::default()
        });
        assert!(filter.matches(&near));
        assert!(!filter.matches(&far));
        assert!(!filter.matches(&event("none", "臺北", "音樂", 0)));
    }

    #[test]
    fn search_defaults_depend_on_keyword() {
        let Ok(plain) = normalize_search(&raw()) else {
            panic!("normalize failed");
        };
        assert_eq!(plain.order, SearchOrder::default());

        let keyword = RawFilterParams {
            query: Some("音樂".to_string()),
            ..raw()
        };
        let Ok(search) = normalize_search(&keyword) else {
            panic!("normalize failed");
        };
        assert_eq!(search.order.field, SortField::Score);
        assert!(!search.order.ascending);
    }

    #[test]
    fn search_rejects_unknown_sort_and_bad_paging() {
        let sort = RawFilterParams {
            sort: Some("popularity".to_string()),
            ..raw()
        };
        assert!(matches!(
            normalize_search(&sort),
            Err(GatewayError::InvalidParameter { field, .. }) if field == "sort"
        ));

        let page = RawFilterParams {
            page: Some("two".to_string()),
            ..raw()
        };
        assert!(matches!(
            normalize_search(&page),
            Err(GatewayError::InvalidParameter { field, .. }) if field == "page"
        ));
    }

    #[test]
    fn canonical_params_normalize_to_the_same_query() {
        let params = RawFilterParams {
            query: Some(" 爵士 ".to_string()),
            city: Some("高雄, 臺北".to_string()),
            gps: Some("25.03,121.56".to_string()),
            ..raw()
        };
        let Ok(search) = normalize_search(&params) else {
            panic!("normalize failed");
        };
        let canonical = search.to_raw();
        assert_eq!(canonical.city.as_deref(), Some("臺北,高雄"));
        assert_eq!(canonical.sort.as_deref(), Some("_score"));
        assert_eq!(normalize_search(&canonical), Ok(search));
    }

    #[test]
    fn json_numbers_are_accepted_as_strings() {
        let json = r#"{"from": 1700000000000, "asc": false, "p": 2, "city": null}"#;
        let Ok(params) = serde_json::from_str::<RawFilterParams>(json) else {
            panic!("deserialization failed");
        };
        assert_eq!(params.from.as_deref(), Some("1700000000000"));
        assert_eq!(params.asc.as_deref(), Some("false"));
        assert_eq!(params.page.as_deref(), Some("2"));
        assert!(params.city.is_none());
    }
}
