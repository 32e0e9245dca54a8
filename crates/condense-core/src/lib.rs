//! Condense Core Library
//!
//! This crate turns text of any length into a summary that fits a language
//! model's input window:
//! - Model context windows and token budgets
//! - Tokenization (tiktoken) and sentence boundary detection
//! - Chunk planning: token windows with overlap, or greedy sentence packing
//! - Recursive summarization with headroom reservation and ordered fan-out
//! - An OpenRouter completion client
//! - File-backed configuration

pub mod chunking;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod sentences;
pub mod summarizer;
pub mod tokenizer;

#[cfg(test)]
mod test_support;


pub use chunking::{Chunk, ChunkPlanner};
pub use error::{Error, Result};
pub use summarizer::{ChunkSummary, Summarizer, SummaryResult};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::chunking::{Chunk, ChunkPlanner};
    pub use crate::config::{Config, SummarizerConfig};
    pub use crate::error::{Error, Result};
    pub use crate::llm::{CompletionRequest, CompletionService};
    pub use crate::models::{ModelLimits, ModelProfile};
    pub use crate::sentences::{PunctuationSentenceDetector, SentenceDetector};
    pub use crate::summarizer::{Summarizer, SummaryResult};
    pub use crate::tokenizer::{TiktokenTokenizer, Tokenizer};
}
