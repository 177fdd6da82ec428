//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::dto::{
    ChatRequest, ChatResponse, ConversationStageRequest, ConversationStageResponse, IntervalInfo,
    SearchResponse,
};
use super::handlers::{analysis, chat, events, system};
use crate::analytics::{CountMode, GroupField, Interval, SortKey};
use crate::chat::{ConversationStage, FollowUp};
use crate::domain::{Bucket, Event, Page, RawFilterParams, Venue};
use crate::error::{ErrorBody, ErrorResponse};
use crate::service::{GeographicAnalysis, MonthlyAnalysis, ReportAnalysis};

/// Generated OpenAPI specification.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "event-chat-gateway",
        description = "Event search, activity analytics and natural-language event chat."
    ),
    paths(
        system::health_handler,
        system::intervals_handler,
        events::search_events,
        events::recommend_events,
        analysis::histogram,
        analysis::date_histogram,
        analysis::monthly,
        analysis::geographic,
        analysis::report,
        chat::chat,
        chat::conversation_stage,
    ),
    components(schemas(
        Bucket,
        ChatRequest,
        ChatResponse,
        ConversationStage,
        ConversationStageRequest,
        ConversationStageResponse,
        CountMode,
        ErrorBody,
        ErrorResponse,
        Event,
        FollowUp,
        GeographicAnalysis,
        GroupField,
        Interval,
        IntervalInfo,
        MonthlyAnalysis,
        Page,
        RawFilterParams,
        ReportAnalysis,
        SearchResponse,
        SortKey,
        Venue,
    )),
    tags(
        (name = "System", description = "Health and configuration"),
        (name = "Events", description = "Event search"),
        (name = "Analytics", description = "Histograms, trends and reports"),
        (name = "Chat", description = "Natural-language event assistant"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/config/intervals",
            "/api/v1/events",
            "/api/v1/recommend",
            "/api/v1/activity/histogram",
            "/api/v1/activity/date-histogram",
            "/api/v1/analysis/monthly",
            "/api/v1/analysis/geographic",
            "/api/v1/analysis/report",
            "/api/v1/chat",
            "/api/v1/conversation-stage",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
