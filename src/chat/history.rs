//! Chat-history condensing.
//!
//! Search replies carry whole result pages in markdown. Before a history
//! is forwarded to the completion service, each such reply is replaced by
//! a one-line summary of its headline, conditions and first few events.

use std::sync::LazyLock;

use regex::Regex;

use crate::upstream::ChatMessage;

/// Phrases that mark a search-result reply, ours and the legacy front end's.
const SEARCH_MARKERS: &[&str] = &[
    " events; showing ",
    "### Search conditions",
    "   - Date: ",
    "   - Venue: ",
    "   - City: ",
    "   - Category: ",
    "## 搜尋結果",
    "### 活動列表",
    "### 搜尋條件",
    "共找到",
    "本頁顯示",
    "- 活動日期：",
    "- 活動地點：",
    "- 城市：",
    "- 類別：",
    "為您找到",
];

const MIN_MARKERS: usize = 3;
const MIN_LINKS: usize = 5;
const MIN_NUMBERED_ITEMS: usize = 3;
const SUMMARY_EVENTS: usize = 3;

static MARKDOWN_LINK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[([^\]\n]+)\]\(([^)\s]+)\)").ok());

/// `1. **Name**` or `1. [Name](url)` at the start of a line.
static NUMBERED_ITEM: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?m)^\d+\.\s*(?:\*\*([^*\n]+)\*\*|\[([^\]\n]+)\]\([^)\s]+\))").ok()
});

/// Whether `content` looks like a page of search results.
#[must_use]
pub fn is_search_result(content: &str) -> bool {
    let markers = SEARCH_MARKERS
        .iter()
        .filter(|marker| content.contains(**marker))
        .count();
    markers >= MIN_MARKERS
        || MARKDOWN_LINK.iter().flat_map(|re| re.find_iter(content)).count() >= MIN_LINKS
        || NUMBERED_ITEM.iter().flat_map(|re| re.find_iter(content)).count() >= MIN_NUMBERED_ITEMS
}

/// One-line digest of a search-result reply.
#[must_use]
pub fn summarize_search_result(content: &str) -> String {
    let mut parts = Vec::new();

    if let Some(headline) = content.lines().map(str::trim).find(|line| {
        (line.starts_with("Found ") && line.contains(" events"))
            || (line.contains("共找到") && line.contains("個活動"))
            || line.contains("為您找到")
    }) {
        parts.push(headline.to_string());
    }

    let conditions: Vec<&str> = content
        .lines()
        .skip_while(|line| !line.contains("### Search conditions") && !line.contains("### 搜尋條件"))
        .skip(1)
        .map(str::trim)
        .take_while(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.trim_start_matches("- "))
        .collect();
    if !conditions.is_empty() {
        parts.push(format!("conditions: {}", conditions.join(", ")));
    }

    let mut names: Vec<&str> = NUMBERED_ITEM
        .iter()
        .flat_map(|re| re.captures_iter(content))
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().trim())
        .take(SUMMARY_EVENTS)
        .collect();
    if names.is_empty() {
        names = MARKDOWN_LINK
            .iter()
            .flat_map(|re| re.captures_iter(content))
            .filter(|caps| caps.get(2).is_none_or(|url| !url.as_str().contains("maps")))
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .take(SUMMARY_EVENTS)
            .collect();
    }
    if !names.is_empty() {
        parts.push(format!("events: {}", names.join(", ")));
    }

    if parts.is_empty() {
        "Search results (condensed)".to_string()
    } else {
        format!("Search results summary: {}", parts.join("; "))
    }
}

/// Replaces assistant search-result replies with their summaries.
///
/// User messages and other assistant replies pass through unchanged.
#[must_use]
pub fn condense_history(history: &[ChatMessage]) -> Vec<ChatMessage> {
    history
        .iter()
        .map(|message| {
            if message.role == "assistant" && is_search_result(&message.content) {
                let content = summarize_search_result(&message.content);
                tracing::debug!(
                    before = message.content.len(),
                    after = content.len(),
                    "condensed search reply in history"
                );
                ChatMessage {
                    role: message.role.clone(),
                    content,
                }
            } else {
                message.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = "Found 12 events; showing 2 on page 1 of 6.\n\
        \n1. **Jazz Night**\n   - Date: 2024-06-16\n   - Venue: [Zepp](https://www.google.com/maps/place/25.06,121.52)\n   - City: 臺北\n\
        \n2. **Print Fair**\n   - Date: 2024-06-18\n   - City: 臺北\n\
        \n### Search conditions\n- City: 臺北\n- Sort: start_time ascending\n";

    fn message(role: &str, content: &str) -> ChatMessage {
        ChatMessage {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn search_reply_is_detected() {
        assert!(is_search_result(REPLY));
        assert!(!is_search_result("Hello! I can find events across Taiwan."));
        assert!(!is_search_result("## Events by category\n\n- 音樂: 3"));
    }

    #[test]
    fn legacy_link_lists_are_detected() {
        let legacy = "為您找到一些活動：\n1. [市集](https://a.tw/1)\n2. [講座](https://a.tw/2)\n3. [展覽](https://a.tw/3)";
        assert!(is_search_result(legacy));
        let summary = summarize_search_result(legacy);
        assert!(summary.contains("events: 市集, 講座, 展覽"));
    }

    #[test]
    fn summary_keeps_headline_conditions_and_names() {
        let summary = summarize_search_result(REPLY);
        assert_eq!(
            summary,
            "Search results summary: Found 12 events; showing 2 on page 1 of 6.; \
             conditions: City: 臺北, Sort: start_time ascending; events: Jazz Night, Print Fair"
        );
    }

    #[test]
    fn only_assistant_search_replies_are_condensed() {
        let history = vec![
            message("user", REPLY),
            message("assistant", REPLY),
            message("assistant", "Goodbye!"),
        ];
        let condensed = condense_history(&history);
        assert_eq!(condensed.len(), 3);
        assert_eq!(condensed.first(), history.first());
        assert!(
            condensed
                .get(1)
                .is_some_and(|m| m.content.starts_with("Search results summary:"))
        );
        assert_eq!(condensed.get(2), history.get(2));
    }
}
