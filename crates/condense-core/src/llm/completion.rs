//! Completion service contract consumed by the summarizer

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single prompt-in, text-out completion call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Full prompt text
    pub prompt: String,
    /// Model identifier (e.g., "openai/gpt-4o-mini")
    pub model: String,
    /// Sampling temperature (0.0 to 2.0)
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: usize,
}

impl CompletionRequest {
    /// Create a new request with deterministic sampling
    pub fn new(prompt: impl Into<String>, model: impl Into<String>, max_tokens: usize) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            temperature: 0.0,
            max_tokens,
        }
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Text generation backend.
///
/// Failures and timeouts surface as ordinary errors; callers in this crate
/// never retry them. Any retry policy lives in the implementation.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_to_zero_temperature() {
        let request = CompletionRequest::new("Summarize", "openai/gpt-4", 500);
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.max_tokens, 500);
        assert_eq!(request.model, "openai/gpt-4");
    }

    #[test]
    fn test_request_with_temperature() {
        let request = CompletionRequest::new("p", "m", 10).with_temperature(0.7);
        assert_eq!(request.temperature, 0.7);
    }
}
