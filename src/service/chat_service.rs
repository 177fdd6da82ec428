//! Chat service: one conversational turn from message to reply.
//!
//! ```text
//! history ─► condense ─► stage
//! message ─► classify ─┬─ search intents ──► extract params ─► EventService
//!                      ├─ analysis intents ► extract params ─► AnalyticsService
//!                      └─ small talk ──────► canned reply
//!                               └─► follow-up questions for the stage
//! ```
//!
//! The completion service is optional. When it is absent, fails, or
//! answers with something unusable, classification and stage analysis
//! fall back to keyword rules and extraction to time-word rules.

use std::fmt::Write;
use std::sync::Arc;

use chrono::DateTime;
use chrono_tz::Tz;
use uuid::Uuid;

use super::analytics_service::{AnalyticsService, HistogramOptions};
use super::event_service::{EventService, SearchOutcome};
use crate::analytics::report::REPORT_TOP_CITIES;
use crate::chat::extract::extraction_prompt;
use crate::chat::intent::classification_prompt;
use crate::chat::stage::{OPENING_HISTORY_LEN, STAGE_WINDOW, stage_prompt};
use crate::chat::{
    ConversationStage, FollowUp, Intent, apply_order_override, classify_by_keywords,
    classify_stage_by_rules, condense_history, extract_by_rules, follow_up, needs_follow_up,
    parse_llm_params,
};
use crate::domain::{Bucket, Event, Page, RawFilterParams, normalize_search};
use crate::error::GatewayError;
use crate::upstream::{ChatMessage, CompletionClient, CompletionOptions};

/// History messages forwarded to the classifier.
pub const MAX_HISTORY_MESSAGES: usize = 10;

const MAX_HISTORY_CHARS: usize = 500;
const MAX_DESCRIPTION_CHARS: usize = 200;

const LABEL_OPTIONS: CompletionOptions = CompletionOptions {
    temperature: 0.1,
    max_tokens: 50,
};

/// One inbound chat turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatTurn {
    /// The user's message.
    pub message: String,
    /// Prior messages, oldest first.
    pub history: Vec<ChatMessage>,
    /// Requested result page.
    pub page: Option<i64>,
    /// Front-end parameters; only `sort` and `asc` are honoured.
    pub search_params: Option<RawFilterParams>,
}

/// The assistant's answer to a chat turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    /// Reply identifier.
    pub id: Uuid,
    /// Intent the turn was classified as.
    pub intent: Intent,
    /// Stage of the conversation before this turn.
    pub stage: ConversationStage,
    /// Markdown reply text, follow-up questions included.
    pub message: String,
    /// Events on the current page, for search intents.
    pub events: Option<Vec<Event>>,
    /// Page metadata, for search intents.
    pub pagination: Option<Page>,
    /// Canonical parameters of the search or analysis that ran.
    pub search_params: Option<RawFilterParams>,
    /// Chart data URIs, for analysis intents.
    pub charts: Vec<String>,
    /// Questions offered to keep the conversation going.
    pub follow_up: Option<FollowUp>,
}

impl ChatReply {
    fn text(intent: Intent, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            intent,
            stage: ConversationStage::Opening,
            message: message.into(),
            events: None,
            pagination: None,
            search_params: None,
            charts: Vec::new(),
            follow_up: None,
        }
    }
}

/// Orchestrates chat turns over the search and analytics services.
#[derive(Debug, Clone)]
pub struct ChatService {
    events: EventService,
    analytics: AnalyticsService,
    llm: Option<Arc<dyn CompletionClient>>,
}

impl ChatService {
    /// Creates a new `ChatService`. Without `llm` only rules are used.
    #[must_use]
    pub fn new(
        events: EventService,
        analytics: AnalyticsService,
        llm: Option<Arc<dyn CompletionClient>>,
    ) -> Self {
        Self {
            events,
            analytics,
            llm,
        }
    }

    /// Answers one chat turn; `now_ms` anchors relative time words.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidRequest`] for an empty message.
    /// - Validation errors from front-end parameters.
    /// - Upstream errors from the search or analysis that ran.
    #[tracing::instrument(skip_all, fields(page = turn.page))]
    pub async fn respond(&self, turn: ChatTurn, now_ms: i64) -> Result<ChatReply, GatewayError> {
        let message = turn.message.trim();
        if message.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "message must not be empty".to_string(),
            ));
        }

        let history = condense_history(&turn.history);
        let stage = self.stage_of(&history).await;
        let intent = self.classify(message, &history).await;
        tracing::info!(%intent, %stage, "chat turn classified");

        let mut reply = self.answer(intent, message, &turn, now_ms).await?;
        reply.stage = stage;
        let found = reply.pagination.as_ref().map(|page| page.total_events);
        if needs_follow_up(message, found.is_some(), &history) {
            let questions = follow_up(stage, found);
            reply.message.push_str(&questions.to_markdown());
            reply.follow_up = Some(questions);
        }
        Ok(reply)
    }

    /// Stage of a conversation given its prior messages.
    ///
    /// Search-result replies are condensed first. Histories of at most two
    /// messages are at the opening without consulting the LLM.
    pub async fn conversation_stage(&self, history: &[ChatMessage]) -> ConversationStage {
        self.stage_of(&condense_history(history)).await
    }

    async fn answer(
        &self,
        intent: Intent,
        message: &str,
        turn: &ChatTurn,
        now_ms: i64,
    ) -> Result<ChatReply, GatewayError> {
        match intent {
            Intent::SearchEvents | Intent::GetEventDetails => {
                let mut params = self.extract_params(message, now_ms).await?;
                apply_order_override(&mut params, turn.search_params.as_ref());
                params.page = turn.page.map(|p| p.to_string());
                let outcome = self.events.search(&params).await?;
                Ok(search_reply(intent, outcome, self.analytics.timezone()))
            }
            Intent::AnalyzeTrends => {
                let params = self.extract_params(message, now_ms).await?;
                let analysis = self.analytics.monthly(&params, now_ms).await?;
                let subject = params.category.clone().unwrap_or_default();
                let mut text = format!("## Monthly trend\n\n{}\n\n", analysis.trend.describe(&subject));
                text.push_str("| Month | Events |\n|---|---|\n");
                for month in &analysis.trend.monthly {
                    let _ = writeln!(text, "| {} | {} |", month.month, month.value);
                }
                Ok(ChatReply {
                    search_params: Some(params),
                    charts: vec![analysis.chart],
                    ..ChatReply::text(intent, text)
                })
            }
            Intent::AnalyzeStatistics => {
                let params = self.extract_params(message, now_ms).await?;
                let buckets = self
                    .analytics
                    .histogram(&params, HistogramOptions::default())
                    .await?;
                let text = format!(
                    "## Events by category\n\n{}",
                    bucket_list(&buckets, "No events matched.")
                );
                Ok(ChatReply {
                    search_params: Some(params),
                    ..ChatReply::text(intent, text)
                })
            }
            Intent::AnalyzeGeographic => {
                let params = self.extract_params(message, now_ms).await?;
                let analysis = self
                    .analytics
                    .geographic(&params, REPORT_TOP_CITIES)
                    .await?;
                let text = format!(
                    "## Events by city\n\n{}",
                    bucket_list(&analysis.buckets, "No events matched.")
                );
                Ok(ChatReply {
                    search_params: Some(params),
                    charts: vec![analysis.chart],
                    ..ChatReply::text(intent, text)
                })
            }
            Intent::GenerateReport => {
                let params = self.extract_params(message, now_ms).await?;
                let analysis = self.analytics.report(&params, now_ms).await?;
                let text = format!("## Event report\n\n{}", analysis.report.summary_text);
                Ok(ChatReply {
                    search_params: Some(params),
                    charts: vec![analysis.monthly_chart, analysis.geographic_chart],
                    ..ChatReply::text(intent, text)
                })
            }
            Intent::Greeting => Ok(ChatReply::text(
                intent,
                "Hello! I can find events across Taiwan and summarize activity trends. \
                 Try asking for music events in 臺北 this week.",
            )),
            Intent::Goodbye => Ok(ChatReply::text(
                intent,
                "Goodbye! Come back any time you need event ideas.",
            )),
            Intent::Other => Ok(ChatReply::text(
                intent,
                "I can search events, show event details, and analyze monthly trends, \
                 categories or cities. What would you like to know?",
            )),
        }
    }

    async fn stage_of(&self, history: &[ChatMessage]) -> ConversationStage {
        let Some(llm) = self.llm.as_ref().filter(|_| history.len() > OPENING_HISTORY_LEN) else {
            return classify_stage_by_rules(history);
        };
        let recent = recent_messages(history, STAGE_WINDOW);
        match llm
            .complete(&stage_prompt(&recent, history.len()), LABEL_OPTIONS)
            .await
        {
            Ok(text) => ConversationStage::from_llm_output(&text).unwrap_or_else(|| {
                tracing::warn!(output = %text, "unrecognised stage label, using keyword rules");
                classify_stage_by_rules(history)
            }),
            Err(e) => {
                tracing::warn!(error = %e, "stage analysis failed, using keyword rules");
                classify_stage_by_rules(history)
            }
        }
    }

    async fn classify(&self, message: &str, history: &[ChatMessage]) -> Intent {
        let Some(llm) = &self.llm else {
            return classify_by_keywords(message);
        };
        let recent = recent_messages(history, MAX_HISTORY_MESSAGES);
        match llm
            .complete(&classification_prompt(message, &recent), LABEL_OPTIONS)
            .await
        {
            Ok(text) => Intent::from_llm_output(&text).unwrap_or_else(|| {
                tracing::warn!(output = %text, "unrecognised intent label, using keyword rules");
                classify_by_keywords(message)
            }),
            Err(e) => {
                tracing::warn!(error = %e, "intent classification failed, using keyword rules");
                classify_by_keywords(message)
            }
        }
    }

    /// Raw parameters from the LLM when they pass search normalization,
    /// ordering included, otherwise from the time-word rules.
    async fn extract_params(
        &self,
        message: &str,
        now_ms: i64,
    ) -> Result<RawFilterParams, GatewayError> {
        let timezone = self.analytics.timezone();
        if let Some(llm) = &self.llm {
            let today = DateTime::from_timestamp_millis(now_ms)
                .map(|dt| dt.with_timezone(&timezone).format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            match llm
                .complete(
                    &extraction_prompt(message, &today, now_ms),
                    CompletionOptions::EXTRACTION,
                )
                .await
            {
                Ok(text) => match parse_llm_params(&text) {
                    Some(params) => match normalize_search(&params) {
                        Ok(_) => return Ok(params),
                        Err(e) => {
                            tracing::warn!(error = %e, "extracted parameters rejected, using rules");
                        }
                    },
                    None => tracing::warn!(output = %text, "no JSON object in extraction output"),
                },
                Err(e) => tracing::warn!(error = %e, "parameter extraction failed, using rules"),
            }
        }
        extract_by_rules(message, now_ms, timezone)
    }
}

/// The last `limit` messages, each cut to a bounded length.
fn recent_messages(history: &[ChatMessage], limit: usize) -> Vec<ChatMessage> {
    history
        .iter()
        .skip(history.len().saturating_sub(limit))
        .map(|m| ChatMessage {
            role: m.role.clone(),
            content: m.content.chars().take(MAX_HISTORY_CHARS).collect(),
        })
        .collect()
}

fn search_reply(intent: Intent, outcome: SearchOutcome, timezone: Tz) -> ChatReply {
    let page = outcome.pagination;
    let mut text = format!(
        "Found {} events; showing {} on page {} of {}.\n",
        page.total_events, page.current_page_count, page.current_page, page.total_pages
    );
    for (i, event) in outcome.events.iter().enumerate() {
        let _ = write!(
            text,
            "\n{}. {}",
            page.offset() + i as u64 + 1,
            describe_event(event, timezone, intent == Intent::GetEventDetails)
        );
    }

    let query = &outcome.query;
    text.push_str("\n### Search conditions\n");
    if let Some(keyword) = query.filter.query() {
        let _ = writeln!(text, "- Keyword: {keyword}");
    }
    for (label, set) in [
        ("City", query.filter.cities()),
        ("Category", query.filter.categories()),
        ("Type", query.filter.types()),
    ] {
        if !set.is_empty() {
            let joined = set.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
            let _ = writeln!(text, "- {label}: {joined}");
        }
    }
    if let Some(from) = query.filter.from() {
        let _ = writeln!(text, "- From: {}", format_date(from, timezone));
    }
    if let Some(to) = query.filter.to() {
        let _ = writeln!(text, "- To: {}", format_date(to, timezone));
    }
    let _ = writeln!(
        text,
        "- Sort: {} {}",
        query.order.field.as_str(),
        if query.order.ascending { "ascending" } else { "descending" }
    );

    let mut canonical = query.to_raw();
    canonical.page = Some(page.current_page.to_string());
    canonical.num = Some(page.events_per_page.to_string());

    ChatReply {
        events: Some(outcome.events),
        pagination: Some(page),
        search_params: Some(canonical),
        ..ChatReply::text(intent, text)
    }
}

fn describe_event(event: &Event, timezone: Tz, with_description: bool) -> String {
    let mut text = format!("**{}**\n", event.name);
    let start = format_date(event.start_time, timezone);
    let end = format_date(event.effective_end(), timezone);
    if event.end_time.is_some() && end != start {
        let _ = writeln!(text, "   - Date: {start} ~ {end}");
    } else {
        let _ = writeln!(text, "   - Date: {start}");
    }
    if let Some(venue) = &event.venue {
        let name = venue
            .name
            .as_deref()
            .or(venue.address.as_deref())
            .unwrap_or("venue");
        match venue.coordinates() {
            Some((lat, lon)) => {
                let _ = writeln!(
                    text,
                    "   - Venue: [{name}](https://www.google.com/maps/place/{lat},{lon})"
                );
            }
            None => {
                let _ = writeln!(text, "   - Venue: {name}");
            }
        }
    }
    if let Some(city) = &event.location {
        let _ = writeln!(text, "   - City: {city}");
    }
    if let Some(category) = &event.category {
        let _ = writeln!(text, "   - Category: {category}");
    }
    if with_description {
        if let Some(description) = &event.description {
            let short: String = description.chars().take(MAX_DESCRIPTION_CHARS).collect();
            let _ = writeln!(text, "   - About: {short}");
        }
    }
    text
}

fn bucket_list(buckets: &[Bucket], empty: &str) -> String {
    if buckets.is_empty() {
        return empty.to_string();
    }
    buckets
        .iter()
        .map(|b| format!("- {}: {}", b.key, b.value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_date(ms: i64, timezone: Tz) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.with_timezone(&timezone).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| ms.to_string())
}
