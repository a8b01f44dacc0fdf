//! LLM access for the optional enhancement path.
//!
//! The triage core never requires a model: everything here is consumed
//! through the [`rambler_common::RemoteClassifier`] trait, and any failure
//! only disables chunk merging.

pub mod client;
pub mod config;
pub mod openai;
pub mod relationship;
pub mod retry;

pub use client::{ChatMessage, LlmClient, LlmRequest, LlmResponse, Role, TokenUsage};
pub use config::{build_llm_client, LlmConfig, SemaphoredClient};
pub use openai::OpenAiClient;
pub use relationship::LlmRelationshipClassifier;
pub use retry::{RetryConfig, RetryingClient};
