//! Chat-turn helpers: intent labels, conversation stages, history
//! condensing, LLM output sanitizing, and the rule-based fallback.

pub mod extract;
pub mod fallback;
pub mod history;
pub mod intent;
pub mod stage;

pub use extract::{TAIWAN_CITIES, apply_order_override, parse_llm_params, sanitize_cities};
pub use fallback::extract_by_rules;
pub use history::condense_history;
pub use intent::{Intent, classify_by_keywords};
pub use stage::{ConversationStage, FollowUp, classify_stage_by_rules, follow_up, needs_follow_up};
