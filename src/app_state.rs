//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use chrono_tz::Tz;

use crate::chart::SvgChartRenderer;
use crate::service::{AnalyticsService, ChatService, EventService};
use crate::upstream::{CompletionClient, EventSource};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Paginated event search.
    pub event_service: Arc<EventService>,
    /// Histograms, trends and reports.
    pub analytics_service: Arc<AnalyticsService>,
    /// Chat turns over search and analytics.
    pub chat_service: Arc<ChatService>,
}

/// Settings shared by the services.
#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    /// Zone for trend windows, chat time words and default bucketing.
    pub timezone: Tz,
    /// Page size when a search does not give one.
    pub default_per_page: i64,
    /// Most events one analysis fetches.
    pub analytics_fetch_limit: u64,
}

impl AppState {
    /// Wires all services over one event source. Without `llm` the chat
    /// runs on keyword rules only.
    #[must_use]
    pub fn new(
        source: Arc<dyn EventSource>,
        llm: Option<Arc<dyn CompletionClient>>,
        settings: ServiceSettings,
    ) -> Self {
        let event_service = EventService::new(Arc::clone(&source), settings.default_per_page);
        let analytics_service = AnalyticsService::new(
            source,
            Arc::new(SvgChartRenderer),
            settings.timezone,
            settings.analytics_fetch_limit,
        );
        let chat_service = ChatService::new(event_service.clone(), analytics_service.clone(), llm);
        Self {
            event_service: Arc::new(event_service),
            analytics_service: Arc::new(analytics_service),
            chat_service: Arc::new(chat_service),
        }
    }
}
