//! Chat request/response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::chat::{ConversationStage, FollowUp, Intent};
use crate::domain::{Event, Page, RawFilterParams};
use crate::error::GatewayError;
use crate::service::{ChatReply, ChatTurn};
use crate::upstream::ChatMessage;

/// Request body for `POST /chat`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// The user's message.
    #[serde(default)]
    pub message: String,
    /// Prior messages, oldest first.
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
    /// Requested result page, as a number or numeric string. Also accepted as `p`.
    #[serde(default, alias = "p")]
    #[schema(value_type = Option<i64>)]
    pub page: Option<serde_json::Value>,
    /// Parameters the front end last displayed; only `sort` and `asc` are honoured.
    #[serde(default)]
    pub search_params: Option<RawFilterParams>,
}

impl ChatRequest {
    /// Converts into a service-level [`ChatTurn`].
    ///
    /// # Errors
    ///
    /// [`GatewayError::InvalidParameter`] when `page` is neither an integer
    /// nor an integer string.
    pub fn into_turn(self) -> Result<ChatTurn, GatewayError> {
        let page = match self.page {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::Number(n)) => Some(n.as_i64().ok_or_else(|| {
                GatewayError::invalid_parameter("page", format!("`{n}` is not an integer"))
            })?),
            Some(serde_json::Value::String(s)) if s.trim().is_empty() => None,
            Some(serde_json::Value::String(s)) => Some(s.trim().parse::<i64>().map_err(|_| {
                GatewayError::invalid_parameter("page", format!("`{s}` is not an integer"))
            })?),
            Some(other) => {
                return Err(GatewayError::invalid_parameter(
                    "page",
                    format!("`{other}` is not an integer"),
                ));
            }
        };
        Ok(ChatTurn {
            message: self.message,
            history: self.chat_history,
            page,
            search_params: self.search_params,
        })
    }
}

/// Response body for `POST /chat`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChatResponse {
    /// Reply identifier.
    pub id: Uuid,
    /// Intent the message was classified as.
    pub intent: Intent,
    /// Conversation stage read from the history.
    pub stage: ConversationStage,
    /// Markdown reply text.
    pub message: String,
    /// Events on the current page, for search intents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<Event>>,
    /// Page metadata, for search intents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Page>,
    /// Parameters to send back with the next page request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_params: Option<RawFilterParams>,
    /// Chart images as `data:` URIs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub charts: Vec<String>,
    /// Follow-up questions, also appended to `message`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<FollowUp>,
}

impl From<ChatReply> for ChatResponse {
    fn from(reply: ChatReply) -> Self {
        Self {
            id: reply.id,
            intent: reply.intent,
            stage: reply.stage,
            message: reply.message,
            events: reply.events,
            pagination: reply.pagination,
            search_params: reply.search_params,
            charts: reply.charts,
            follow_up: reply.follow_up,
        }
    }
}

/// Request body for `POST /conversation-stage`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ConversationStageRequest {
    /// Messages so far, oldest first.
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
}

/// Response body for `POST /conversation-stage`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationStageResponse {
    /// Current stage.
    pub stage: ConversationStage,
    /// When the analysis ran.
    pub timestamp: DateTime<Utc>,
}
