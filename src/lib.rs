//! # event-chat-gateway
//!
//! REST gateway for event search, activity analytics and a natural-language
//! event chat over an external event inventory.
//!
//! Every inbound shape (query string, JSON body, LLM-extracted parameters)
//! is normalized into one canonical filter before anything is fetched. The
//! analytics engine is pure and synchronous; all I/O lives behind the
//! [`upstream::EventSource`] and [`upstream::CompletionClient`] traits.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── ChatService ── intent + extraction (chat/)
//!     ├── EventService / AnalyticsService (service/)
//!     │
//!     ├── Filter normalizer, pagination (domain/)
//!     ├── Aggregators (analytics/) ── ChartRenderer (chart/)
//!     │
//!     └── Inventory API / LLM endpoint (upstream/)
//! ```

pub mod analytics;
pub mod api;
pub mod app_state;
pub mod chart;
pub mod chat;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod upstream;
