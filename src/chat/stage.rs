//! Conversation stages and proactive follow-up questions.
//!
//! A stage is read from the history that precedes a turn. It decides which
//! follow-up questions are offered when a reply would otherwise leave the
//! user without a next step.

use std::collections::BTreeSet;
use std::fmt::{self, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::upstream::ChatMessage;

/// Where a conversation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStage {
    /// Greetings, or too little history to tell.
    Opening,
    /// Learning what the user enjoys.
    Exploring,
    /// Pinning down details of a request.
    Clarifying,
    /// Running or refining searches.
    Searching,
    /// The assistant is proposing events.
    Recommending,
    /// The user is weighing options.
    Deciding,
    /// Wrapping up.
    Closing,
}

impl ConversationStage {
    /// Every stage, in conversation order.
    pub const ALL: [Self; 7] = [
        Self::Opening,
        Self::Exploring,
        Self::Clarifying,
        Self::Searching,
        Self::Recommending,
        Self::Deciding,
        Self::Closing,
    ];

    /// Wire label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Exploring => "exploring",
            Self::Clarifying => "clarifying",
            Self::Searching => "searching",
            Self::Recommending => "recommending",
            Self::Deciding => "deciding",
            Self::Closing => "closing",
        }
    }

    /// Reads a stage label out of free LLM text.
    #[must_use]
    pub fn from_llm_output(text: &str) -> Option<Self> {
        let cleaned = text
            .trim()
            .trim_matches(|c: char| c == '`' || c == '"' || c == '\'' || c == '.')
            .to_ascii_lowercase();
        if let Ok(stage) = cleaned.parse() {
            return Some(stage);
        }
        Self::ALL
            .into_iter()
            .filter_map(|stage| cleaned.find(stage.as_str()).map(|pos| (pos, stage)))
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, stage)| stage)
    }
}

impl fmt::Display for ConversationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s.trim())
            .ok_or_else(|| format!("unknown conversation stage `{s}`"))
    }
}

/// Histories this short are always at the opening.
pub const OPENING_HISTORY_LEN: usize = 2;

/// Messages shown to the stage classifier.
pub const STAGE_WINDOW: usize = 6;

const CLOSING_KEYWORDS: &[&str] = &["謝謝", "再見", "結束", "不用了", "夠了", "bye", "thanks"];
const SEARCHING_KEYWORDS: &[&str] = &["搜尋", "查找", "找", "活動", "事件", "搜索", "search"];
const RECOMMENDING_KEYWORDS: &[&str] = &[
    "推薦", "建議", "適合", "為您找到", "found ", "recommend",
];
const DECIDING_KEYWORDS: &[&str] = &[
    "考慮", "想想", "決定", "選擇", "報名", "參加", "不錯", "感興趣",
];
const CLARIFYING_KEYWORDS: &[&str] = &["具體", "詳細", "確認", "是否", "對嗎", "正確嗎", "意思是"];
const EXPLORING_KEYWORDS: &[&str] = &["喜歡", "想要", "偏好", "興趣", "類型", "什麼樣", "推薦"];
const OPENING_KEYWORDS: &[&str] = &["你好", "您好", "嗨", "hello", "hi", "開始", "幫助"];

/// Keyword rules used when the LLM is unavailable or answers nonsense.
///
/// The user's last message is checked first, closing before searching;
/// then the assistant's last reply for recommendations. Without any
/// keyword the stage follows the history length.
#[must_use]
pub fn classify_stage_by_rules(history: &[ChatMessage]) -> ConversationStage {
    if history.len() <= OPENING_HISTORY_LEN {
        return ConversationStage::Opening;
    }
    let last = |role: &str| {
        history
            .iter()
            .rev()
            .find(|m| m.role == role)
            .map(|m| m.content.to_lowercase())
            .unwrap_or_default()
    };
    let (user, assistant) = (last("user"), last("assistant"));
    let (user, assistant) = (user.as_str(), assistant.as_str());
    let has = |text: &str, keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

    if has(user, CLOSING_KEYWORDS) {
        ConversationStage::Closing
    } else if has(user, SEARCHING_KEYWORDS) {
        ConversationStage::Searching
    } else if has(assistant, RECOMMENDING_KEYWORDS) {
        ConversationStage::Recommending
    } else if has(user, DECIDING_KEYWORDS) {
        ConversationStage::Deciding
    } else if has(user, CLARIFYING_KEYWORDS) {
        ConversationStage::Clarifying
    } else if has(user, EXPLORING_KEYWORDS) {
        ConversationStage::Exploring
    } else if has(user, OPENING_KEYWORDS) {
        ConversationStage::Opening
    } else {
        match history.len() {
            0..=4 => ConversationStage::Exploring,
            5..=8 => ConversationStage::Clarifying,
            9..=12 => ConversationStage::Searching,
            _ => ConversationStage::Recommending,
        }
    }
}

/// Builds the stage-classification transcript.
///
/// `recent` is the tail of the history; `total` is its full length.
#[must_use]
pub fn stage_prompt(recent: &[ChatMessage], total: usize) -> Vec<ChatMessage> {
    let labels = ConversationStage::ALL
        .iter()
        .map(ConversationStage::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let transcript = recent
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n");
    vec![
        ChatMessage::system(
            "You track the conversation stage of an event-search assistant. \
             Answer with exactly one stage name and nothing else.",
        ),
        ChatMessage::user(format!(
            "Stages: {labels}\n\
             opening greets, exploring learns preferences, clarifying confirms details, \
             searching runs searches, recommending proposes events, deciding weighs options, \
             closing wraps up.\n\n\
             Messages so far: {total}\nRecent messages:\n{transcript}"
        )),
    ]
}

const VAGUE_WORDS: &[&str] = &["不知道", "隨便", "都可以", "看看", "沒想法", "不確定"];
const INTEREST_WORDS: &[&str] = &["不錯", "有趣", "看起來", "感覺", "好像"];
const OPEN_QUESTION_WORDS: &[&str] = &["什麼", "如何", "怎麼", "為什麼", "哪裡", "哪個"];
const SHORT_MESSAGE_CHARS: usize = 10;
const STAGNATION_HISTORY_LEN: usize = 6;
const STAGNATION_RATIO: f64 = 0.6;

/// Whether a reply should end with follow-up questions.
///
/// True for short, vague or open-ended messages, for messages showing
/// interest, after any search, and when recent user messages keep
/// repeating the same words.
#[must_use]
pub fn needs_follow_up(message: &str, searched: bool, history: &[ChatMessage]) -> bool {
    let has = |words: &[&str]| words.iter().any(|w| message.contains(w));
    message.trim().chars().count() < SHORT_MESSAGE_CHARS
        || has(VAGUE_WORDS)
        || searched
        || has(INTEREST_WORDS)
        || is_stagnant(history)
        || has(OPEN_QUESTION_WORDS)
}

fn is_stagnant(history: &[ChatMessage]) -> bool {
    if history.len() <= STAGNATION_HISTORY_LEN {
        return false;
    }
    let recent_user: Vec<&str> = history
        .iter()
        .rev()
        .take(4)
        .filter(|m| m.role == "user")
        .map(|m| m.content.as_str())
        .collect();
    if recent_user.len() < 2 {
        return false;
    }
    let words: Vec<String> = recent_user
        .iter()
        .flat_map(|content| content.split_whitespace())
        .map(str::to_lowercase)
        .collect();
    if words.is_empty() {
        return true;
    }
    let unique = words.iter().collect::<BTreeSet<_>>().len();
    let repetition = 1.0 - unique as f64 / words.len() as f64;
    repetition > STAGNATION_RATIO
}

/// Follow-up questions and quick replies attached to a chat reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FollowUp {
    /// Stage the questions were chosen for.
    pub stage: ConversationStage,
    /// Questions to put to the user.
    pub questions: Vec<String>,
    /// Short replies the user can send back.
    pub suggestions: Vec<String>,
}

impl FollowUp {
    fn new(stage: ConversationStage, questions: &[&str], suggestions: &[&str]) -> Self {
        Self {
            stage,
            questions: questions.iter().map(ToString::to_string).collect(),
            suggestions: suggestions.iter().map(ToString::to_string).collect(),
        }
    }

    /// Markdown block appended below the reply.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut text = String::from("\n\n---\n\n**I can also help with:**\n");
        for (i, question) in self.questions.iter().enumerate() {
            let _ = write!(text, "\n{}. {question}", i + 1);
        }
        if !self.suggestions.is_empty() {
            text.push_str("\n\n**Try:** ");
            text.push_str(&self.suggestions.iter().take(2).cloned().collect::<Vec<_>>().join(" · "));
        }
        text.push('\n');
        text
    }
}

/// Follow-up questions for `stage`.
///
/// `found` is the total match count when the turn ran a search; the
/// searching and recommending stages tailor their questions to it.
#[must_use]
pub fn follow_up(stage: ConversationStage, found: Option<u64>) -> FollowUp {
    use ConversationStage as S;
    match (stage, found) {
        (S::Opening, _) => FollowUp::new(
            stage,
            &[
                "What kind of events are you looking for today?",
                "Would you like something this weekend or on a specific date?",
            ],
            &["音樂", "展覽", "戶外", "親子", "課程"],
        ),
        (S::Exploring, _) => FollowUp::new(
            stage,
            &[
                "What do you usually enjoy doing in your free time?",
                "Is there a city you would like to go to?",
                "Do you prefer weekends or weekday evenings?",
            ],
            &["臺北", "臺中", "高雄", "臺南", "this weekend"],
        ),
        (S::Clarifying, _) => FollowUp::new(
            stage,
            &[
                "Is there a category you have in mind?",
                "Do you have a time range in mind?",
            ],
            &["start searching", "change conditions"],
        ),
        (S::Searching, Some(0)) => FollowUp::new(
            stage,
            &[
                "Nothing matched. Shall I relax the conditions?",
                "Would you like to try a wider date range or another city?",
            ],
            &["widen the dates", "any city", "another category"],
        ),
        (S::Searching, Some(n)) if n > 50 => FollowUp::new(
            stage,
            &[
                "That is a lot of events. Shall I narrow them down?",
                "Would you like to add a city or a category?",
            ],
            &["this weekend only", "pick a city", "pick a category", "sort by date"],
        ),
        (S::Searching, Some(_)) => FollowUp::new(
            stage,
            &[
                "Would you like details on any of these events?",
                "Do these results fit what you wanted?",
            ],
            &["show details", "adjust conditions", "new search"],
        ),
        (S::Searching, None) => FollowUp::new(
            stage,
            &[
                "Anything else to add before I search?",
                "Are the search conditions right?",
            ],
            &["start searching", "adjust conditions"],
        ),
        (S::Recommending, Some(1)) => FollowUp::new(
            stage,
            &[
                "Does this event fit what you need?",
                "Shall I look for similar events?",
            ],
            &["show details", "similar events", "new search"],
        ),
        (S::Recommending, Some(n)) if (2..=5).contains(&n) => FollowUp::new(
            stage,
            &[
                "Does any of these events interest you?",
                "Which one would you like to know more about?",
            ],
            &["pick one", "why these", "show more"],
        ),
        (S::Recommending, Some(n)) if n > 5 => FollowUp::new(
            stage,
            &[
                "Which of these recommendations appeal to you?",
                "Shall I filter them by date or city?",
            ],
            &["filter by date", "filter by city", "highlights only"],
        ),
        (S::Recommending, _) => FollowUp::new(
            stage,
            &[
                "What do you think of these suggestions?",
                "Would you like more personal recommendations?",
            ],
            &["why these", "new search"],
        ),
        (S::Deciding, _) => FollowUp::new(
            stage,
            &[
                "Would more details help you decide?",
                "Would you like to compare a few of these events?",
            ],
            &["compare events", "how to register", "show details"],
        ),
        (S::Closing, _) => FollowUp::new(
            stage,
            &[
                "Is there anything else I can help with?",
                "Enjoy the event, and come back any time!",
            ],
            &["other events", "activity trends"],
        ),
    }
}
