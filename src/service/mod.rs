//! Service layer: business logic orchestration.
//!
//! [`EventService`] runs paginated searches, [`AnalyticsService`] feeds
//! fetched events through the analytics engine, and [`ChatService`] turns a
//! chat message into one of the two.

pub mod analytics_service;
pub mod chat_service;
pub mod event_service;

pub use analytics_service::{
    AnalyticsService, DateHistogramOptions, GeographicAnalysis, HistogramOptions,
    MonthlyAnalysis, ReportAnalysis,
};
pub use chat_service::{ChatReply, ChatService, ChatTurn};
pub use event_service::{EventService, SearchOutcome};
