//! Turning untrusted LLM output into raw filter parameters.
//!
//! The completion service is asked for a JSON object, but anything may come
//! back: prose, fenced code, arrays, wrong types. Only recognised scalar
//! fields survive, and the result still goes through the normal filter
//! normalization afterwards.

use serde_json::{Map, Value};

use crate::domain::RawFilterParams;
use crate::upstream::ChatMessage;

/// Cities the inventory knows, in canonical spelling.
pub const TAIWAN_CITIES: [&str; 20] = [
    "臺北", "新北", "臺中", "臺南", "高雄", "桃園", "基隆", "新竹", "嘉義", "苗栗", "彰化",
    "南投", "雲林", "屏東", "宜蘭", "花蓮", "臺東", "澎湖", "金門", "連江",
];

/// Canonical spelling of a city label (`台` → `臺`).
#[must_use]
pub fn fold_city(city: &str) -> String {
    city.trim().replace('台', "臺")
}

/// Keeps only whitelisted cities from a comma-separated list.
///
/// Returns `None` when nothing survives.
#[must_use]
pub fn sanitize_cities(raw: &str) -> Option<String> {
    let mut kept: Vec<String> = Vec::new();
    for city in raw.split(',').map(fold_city) {
        if TAIWAN_CITIES.contains(&city.as_str()) && !kept.contains(&city) {
            kept.push(city);
        }
    }
    (!kept.is_empty()).then(|| kept.join(","))
}

/// Removes a surrounding Markdown code fence, with or without a language tag.
#[must_use]
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(pos) => rest.get(pos + 1..).unwrap_or_default(),
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// Parses LLM output into raw filter parameters.
///
/// Returns `None` when no JSON object can be recovered. Unknown keys,
/// nested values and cities outside [`TAIWAN_CITIES`] are dropped.
#[must_use]
pub fn parse_llm_params(text: &str) -> Option<RawFilterParams> {
    let object = recover_object(strip_code_fences(text))?;
    let field = |key: &str| object.get(key).and_then(scalar);

    Some(RawFilterParams {
        query: field("query"),
        from: field("from"),
        to: field("to"),
        city: field("city").as_deref().and_then(sanitize_cities),
        category: field("category"),
        event_type: field("type"),
        id: field("id"),
        gps: field("gps"),
        radius: field("radius"),
        page: None,
        num: None,
        sort: field("sort"),
        asc: field("asc"),
    })
}

/// Applies front-end `sort`/`asc`, which take precedence over extraction.
pub fn apply_order_override(params: &mut RawFilterParams, front_end: Option<&RawFilterParams>) {
    let Some(front_end) = front_end else {
        return;
    };
    if let Some(sort) = front_end.sort.as_deref().filter(|s| !s.trim().is_empty()) {
        params.sort = Some(sort.to_string());
    }
    if let Some(asc) = front_end.asc.as_deref().filter(|s| !s.trim().is_empty()) {
        params.asc = Some(asc.to_string());
    }
}

/// Builds the extraction transcript for the completion service.
#[must_use]
pub fn extraction_prompt(message: &str, today: &str, now_ms: i64) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You extract event-search parameters from a user message. \
             Reply with one JSON object only, no Markdown.",
        ),
        ChatMessage::user(format!(
            "Today is {today} (epoch ms {now_ms}).\n\
             Allowed keys: query, city, category, type, from, to, sort, asc.\n\
             city must be a comma-separated subset of: {cities}.\n\
             from/to are epoch milliseconds. sort is one of _score, start_time, \
             end_time, updated_time, distance; asc is a boolean.\n\
             Omit keys you cannot infer.\n\nMessage: {message}",
            cities = TAIWAN_CITIES.join(", "),
        )),
    ]
}

fn recover_object(text: &str) -> Option<Map<String, Value>> {
    if let Ok(Value::Object(map)) = serde_json::from_str(text) {
        return Some(map);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    match serde_json::from_str(text.get(start..=end)?) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// String form of a scalar; arrays of scalars are joined with commas.
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter(|item| !item.is_array())
                .filter_map(scalar)
                .collect();
            (!parts.is_empty()).then(|| parts.join(","))
        }
        Value::Null | Value::Object(_) => None,
    }
}
