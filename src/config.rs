//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use chrono_tz::Tz;

use crate::analytics::parse_timezone;
use crate::upstream::RetryPolicy;

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Base URL of the event inventory API.
    pub inventory_api_base: String,

    /// Per-attempt timeout for inventory calls, in milliseconds.
    pub upstream_timeout_ms: u64,

    /// Retries after the first failed upstream attempt.
    pub upstream_retries: u32,

    /// Cap for one retry backoff delay, in milliseconds.
    pub upstream_max_backoff_ms: u64,

    /// OpenAI-compatible API base; the chat runs on rules alone when unset.
    pub llm_endpoint: Option<String>,

    /// Model name sent with every completion request.
    pub llm_model: String,

    /// Bearer token for the LLM endpoint.
    pub llm_api_key: Option<String>,

    /// Per-attempt timeout for LLM calls, in milliseconds.
    pub llm_timeout_ms: u64,

    /// Zone anchoring trend windows, chat time words and default bucketing.
    pub report_timezone: Tz,

    /// Page size when a search does not give `num`.
    pub default_per_page: i64,

    /// Most events one analysis pulls from the inventory.
    pub analytics_fetch_limit: u64,

    /// Whole-request timeout applied by the HTTP layer, in seconds.
    pub request_timeout_secs: u64,

    /// Serve from an empty in-memory source instead of the inventory.
    pub demo_mode: bool,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is not a [`SocketAddr`] or
    /// `REPORT_TIMEZONE` is not an IANA zone name.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .context("LISTEN_ADDR is not a socket address")?;

        let inventory_api_base = std::env::var("INVENTORY_API_BASE")
            .unwrap_or_else(|_| "http://localhost:8080/api".to_string());

        let report_timezone = std::env::var("REPORT_TIMEZONE")
            .ok()
            .map(|name| parse_timezone(&name))
            .transpose()
            .context("REPORT_TIMEZONE is not a known zone")?
            .unwrap_or(chrono_tz::Asia::Taipei);

        Ok(Self {
            listen_addr,
            inventory_api_base,
            upstream_timeout_ms: parse_env("UPSTREAM_TIMEOUT_MS", 10_000),
            upstream_retries: parse_env("UPSTREAM_RETRIES", 3),
            upstream_max_backoff_ms: parse_env("UPSTREAM_MAX_BACKOFF_MS", 2_000),
            llm_endpoint: non_empty_env("LLM_ENDPOINT"),
            llm_model: non_empty_env("LLM_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            llm_api_key: non_empty_env("LLM_API_KEY"),
            llm_timeout_ms: parse_env("LLM_TIMEOUT_MS", 15_000),
            report_timezone,
            default_per_page: parse_env("DEFAULT_PER_PAGE", 5),
            analytics_fetch_limit: parse_env("ANALYTICS_FETCH_LIMIT", 10_000),
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 30),
            demo_mode: parse_env_bool("DEMO_MODE", false),
        })
    }

    /// Retry policy for inventory calls.
    #[must_use]
    pub fn inventory_retry(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.upstream_retries,
            attempt_timeout: Duration::from_millis(self.upstream_timeout_ms),
            max_backoff: Duration::from_millis(self.upstream_max_backoff_ms),
            ..RetryPolicy::default()
        }
    }

    /// Retry policy for LLM calls.
    ///
    /// The chat always has a rule-based fallback, so one retry is enough.
    #[must_use]
    pub fn llm_retry(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.upstream_retries.min(1),
            attempt_timeout: Duration::from_millis(self.llm_timeout_ms),
            max_backoff: Duration::from_millis(self.upstream_max_backoff_ms),
            ..RetryPolicy::default()
        }
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key)
        .ok()
        .map(|v| v.trim().to_ascii_lowercase())
        .as_deref()
    {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
