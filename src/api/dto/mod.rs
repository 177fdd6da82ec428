//! Data Transfer Objects for REST request/response serialization.
//!
//! Query-string values arrive as optional strings and are validated here
//! or in [`crate::domain::normalize`], so a malformed value always yields a
//! field-identifying 400 rather than an extractor rejection.

pub mod analysis_dto;
pub mod chat_dto;
pub mod common_dto;
pub mod search_dto;

pub use analysis_dto::*;
pub use chat_dto::*;
pub use search_dto::*;
