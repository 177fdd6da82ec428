//! Chat intent labels and keyword-based classification.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::upstream::ChatMessage;

/// What the user wants from a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Find events matching a description.
    SearchEvents,
    /// Details about one specific event.
    GetEventDetails,
    /// Six-month trend.
    AnalyzeTrends,
    /// Category breakdown.
    AnalyzeStatistics,
    /// City breakdown.
    AnalyzeGeographic,
    /// Combined trend and city report.
    GenerateReport,
    /// Salutation.
    Greeting,
    /// Farewell.
    Goodbye,
    /// Anything else.
    Other,
}

impl Intent {
    /// Every intent, in prompt order.
    pub const ALL: [Self; 9] = [
        Self::SearchEvents,
        Self::GetEventDetails,
        Self::AnalyzeTrends,
        Self::AnalyzeStatistics,
        Self::AnalyzeGeographic,
        Self::GenerateReport,
        Self::Greeting,
        Self::Goodbye,
        Self::Other,
    ];

    /// Wire label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SearchEvents => "search_events",
            Self::GetEventDetails => "get_event_details",
            Self::AnalyzeTrends => "analyze_trends",
            Self::AnalyzeStatistics => "analyze_statistics",
            Self::AnalyzeGeographic => "analyze_geographic",
            Self::GenerateReport => "generate_report",
            Self::Greeting => "greeting",
            Self::Goodbye => "goodbye",
            Self::Other => "other",
        }
    }

    /// Whether answering requires an event search.
    #[must_use]
    pub const fn is_search(&self) -> bool {
        matches!(self, Self::SearchEvents | Self::GetEventDetails)
    }

    /// Reads a label out of free LLM text such as `"2. get_event_details"`.
    #[must_use]
    pub fn from_llm_output(text: &str) -> Option<Self> {
        let cleaned = text.trim().trim_matches(|c: char| c == '`' || c == '"' || c == '\'');
        if let Ok(intent) = cleaned.parse() {
            return Some(intent);
        }
        let lowered = cleaned.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .filter_map(|intent| lowered.find(intent.as_str()).map(|pos| (pos, intent)))
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, intent)| intent)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|intent| intent.as_str() == s.trim())
            .ok_or_else(|| format!("unknown intent `{s}`"))
    }
}

const REPORT_KEYWORDS: &[&str] = &["報告", "報表", "report"];
const GEOGRAPHIC_KEYWORDS: &[&str] = &["地區", "地理", "城市分布", "縣市", "geographic"];
const TREND_KEYWORDS: &[&str] = &["趨勢", "月度", "每月", "trend"];
const STATISTICS_KEYWORDS: &[&str] = &["統計", "分析", "類別分布", "statistic"];
const DETAIL_KEYWORDS: &[&str] = &["詳情", "詳細", "資訊", "介紹", "說明"];
const SEARCH_KEYWORDS: &[&str] = &[
    "找", "搜尋", "查找", "活動", "展覽", "音樂會", "講座", "課程", "推薦",
];
const GREETING_KEYWORDS: &[&str] = &["你好", "哈囉", "嗨", "hello", "hi"];
const GOODBYE_KEYWORDS: &[&str] = &["再見", "掰掰", "bye", "goodbye"];

/// Keyword rules used when the LLM is unavailable or answers nonsense.
///
/// Analysis keywords are checked before search keywords because analysis
/// requests usually mention "活動" too.
#[must_use]
pub fn classify_by_keywords(message: &str) -> Intent {
    let lowered = message.to_lowercase();
    let has = |keywords: &[&str]| keywords.iter().any(|k| lowered.contains(k));

    if has(REPORT_KEYWORDS) {
        Intent::GenerateReport
    } else if has(GEOGRAPHIC_KEYWORDS) {
        Intent::AnalyzeGeographic
    } else if has(TREND_KEYWORDS) {
        Intent::AnalyzeTrends
    } else if has(STATISTICS_KEYWORDS) {
        Intent::AnalyzeStatistics
    } else if has(DETAIL_KEYWORDS) {
        Intent::GetEventDetails
    } else if has(SEARCH_KEYWORDS) {
        Intent::SearchEvents
    } else if has(GOODBYE_KEYWORDS) {
        Intent::Goodbye
    } else if has(GREETING_KEYWORDS) {
        Intent::Greeting
    } else {
        Intent::Other
    }
}

/// Builds the classification transcript for the completion service.
#[must_use]
pub fn classification_prompt(message: &str, history: &[ChatMessage]) -> Vec<ChatMessage> {
    let labels = Intent::ALL
        .iter()
        .map(Intent::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let history_text = history
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n");
    vec![
        ChatMessage::system(
            "You classify messages sent to an event-search assistant. \
             Answer with exactly one intent label and nothing else.",
        ),
        ChatMessage::user(format!(
            "Labels: {labels}\n\nConversation so far:\n{history_text}\n\nMessage: {message}"
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_from_str() {
        for intent in Intent::ALL {
            assert_eq!(intent.as_str().parse::<Intent>(), Ok(intent));
        }
        assert!("help".parse::<Intent>().is_err());
    }

    #[test]
    fn llm_output_is_tolerated() {
        assert_eq!(
            Intent::from_llm_output("  `analyze_trends`\n"),
            Some(Intent::AnalyzeTrends)
        );
        assert_eq!(
            Intent::from_llm_output("Intent: generate_report."),
            Some(Intent::GenerateReport)
        );
        assert_eq!(Intent::from_llm_output("compare_events"), None);
    }

    #[test]
    fn keyword_rules() {
        assert_eq!(classify_by_keywords("幫我找臺北的展覽"), Intent::SearchEvents);
        assert_eq!(
            classify_by_keywords("分析音樂活動的趨勢"),
            Intent::AnalyzeTrends
        );
        assert_eq!(
            classify_by_keywords("各縣市的活動有多少"),
            Intent::AnalyzeGeographic
        );
        assert_eq!(classify_by_keywords("給我一份報告"), Intent::GenerateReport);
        assert_eq!(classify_by_keywords("活動統計"), Intent::AnalyzeStatistics);
        assert_eq!(classify_by_keywords("Hello!"), Intent::Greeting);
        assert_eq!(classify_by_keywords("掰掰"), Intent::Goodbye);
        assert_eq!(classify_by_keywords("今天天氣如何"), Intent::Other);
    }
}
