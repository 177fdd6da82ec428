//! Remote collaborators: the event inventory and the LLM completion service.
//!
//! Both sit behind object-safe traits so that services hold
//! `Arc<dyn EventSource>` / `Arc<dyn CompletionClient>` and tests swap in
//! in-process implementations.

pub mod inventory;
pub mod llm;
pub mod retry;
pub mod source;

pub use inventory::HttpEventSource;
pub use llm::{ChatMessage, CompletionClient, CompletionOptions, HttpCompletionClient};
pub use retry::RetryPolicy;
pub use source::{EventBatch, EventSource, InMemoryEventSource};
