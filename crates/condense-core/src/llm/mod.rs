//! LLM integration - OpenAI-compatible completions
//!
//! This module provides:
//! - The [`CompletionService`] contract the summarizer depends on
//! - An OpenRouter HTTP client implementing it
//! - Request/response types matching the OpenAI-compatible API
//! - Rate limit handling with exponential backoff

mod client;
mod completion;
mod types;

pub use client::{LlmClient, LlmClientBuilder};
pub use completion::{CompletionRequest, CompletionService};
pub use types::{
    ChatRequest, ChatResponse, Choice, FinishReason, LlmResponse, Message, MessageRole, Usage,
};
