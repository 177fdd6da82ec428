//! HTTP client for the remote event inventory.
//!
//! Calls `GET {base}/activity` with the flat query contract and decodes
//! `{count, queryTime, events}`. Every call runs under the configured
//! [`RetryPolicy`].

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::retry::RetryPolicy;
use super::source::{EventBatch, EventSource};
use crate::domain::{Event, QueryFilter, SearchOrder};
use crate::error::GatewayError;

#[derive(Debug, Deserialize)]
struct ActivityResponse {
    #[serde(default)]
    count: u64,
    #[serde(default, rename = "queryTime")]
    query_time: Option<f64>,
    #[serde(default)]
    events: Vec<Event>,
}

/// [`EventSource`] backed by the inventory's `/activity` endpoint.
#[derive(Debug, Clone)]
pub struct HttpEventSource {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpEventSource {
    /// Creates a source for `base_url` (without trailing `/activity`).
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
        }
    }

    fn activity_url(&self) -> String {
        format!("{}/activity", self.base_url)
    }

    async fn fetch_once(&self, params: &[(&'static str, String)]) -> Result<EventBatch, GatewayError> {
        let response = self
            .client
            .get(self.activity_url())
            .query(params)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.retry.attempt_timeout.as_millis()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::UpstreamFetch {
                status: Some(status.as_u16()),
                message: format!("inventory returned {status}: {}", truncate(&body, 200)),
            });
        }

        let decoded: ActivityResponse =
            response
                .json()
                .await
                .map_err(|e| GatewayError::UpstreamFetch {
                    status: Some(502),
                    message: format!("malformed inventory response: {e}"),
                })?;

        tracing::debug!(
            count = decoded.count,
            returned = decoded.events.len(),
            query_time = ?decoded.query_time,
            "inventory responded"
        );
        Ok(EventBatch {
            events: decoded.events,
            total: decoded.count,
        })
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    #[tracing::instrument(skip(self, filter, order))]
    async fn fetch(
        &self,
        filter: &QueryFilter,
        order: &SearchOrder,
        offset: u64,
        limit: u64,
    ) -> Result<EventBatch, GatewayError> {
        let params = query_params(filter, order, offset, limit);
        self.retry
            .execute("inventory", || self.fetch_once(&params))
            .await
    }
}

/// Flattens a normalized filter into the inventory's query parameters.
///
/// The inventory pages by number, so `offset` is converted to the 1-based
/// page that contains it.
pub(crate) fn query_params(
    filter: &QueryFilter,
    order: &SearchOrder,
    offset: u64,
    limit: u64,
) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(query) = filter.query() {
        params.push(("query", query.to_string()));
    }
    let joined = |set: &std::collections::BTreeSet<String>| {
        set.iter().map(String::as_str).collect::<Vec<_>>().join(",")
    };
    if !filter.cities().is_empty() {
        params.push(("city", joined(filter.cities())));
    }
    if !filter.categories().is_empty() {
        params.push(("category", joined(filter.categories())));
    }
    if !filter.types().is_empty() {
        params.push(("type", joined(filter.types())));
    }
    if let Some(from) = filter.from() {
        params.push(("from", from.to_string()));
    }
    if let Some(to) = filter.to() {
        params.push(("to", to.to_string()));
    }
    if let Some(id) = filter.id() {
        params.push(("id", id.to_string()));
    }
    if let Some(geo) = filter.geo() {
        params.push(("gps", geo.point_string()));
        params.push(("radius", geo.radius_km.to_string()));
    }
    params.push(("sort", order.field.as_str().to_string()));
    params.push(("asc", order.ascending.to_string()));
    params.push(("num", limit.to_string()));
    params.push(("p", (offset / limit.max(1) + 1).to_string()));
    params
}

fn transport_error(error: &reqwest::Error, timeout_ms: u128) -> GatewayError {
    if error.is_timeout() {
        GatewayError::UpstreamTimeout {
            timeout_ms: u64::try_from(timeout_ms).unwrap_or(u64::MAX),
        }
    } else {
        GatewayError::UpstreamFetch {
            status: error.status().map(|s| s.as_u16()),
            message: error.to_string(),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
