//! Error types for Condense

use thiserror::Error;

/// Result type alias using Condense's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Condense error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Planning errors (E001-E099)
    #[error("Model '{0}' is not registered. Add its context window under [models] in config.toml.")]
    UnknownModel(String),

    #[error("No text to summarize")]
    EmptyInput,

    #[error("Sentence is too long: {tokens} tokens (budget is {budget} tokens)")]
    SentenceTooLong { tokens: usize, budget: usize },

    #[error(
        "Reserved headroom of {headroom} tokens leaves no room in the {budget}-token budget of model '{model}'"
    )]
    HeadroomExceedsBudget {
        model: String,
        budget: usize,
        headroom: usize,
    },

    #[error("Summary did not converge after {0} levels of recursion")]
    RecursionLimit(usize),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    // Network errors (E100-E199)
    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    #[error("LLM API error: {0}. Check CONDENSE_API_KEY or OPENROUTER_API_KEY.")]
    LLMError(String),

    #[error("Rate limited. Waiting {0} seconds before retry.")]
    RateLimited(u64),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // User errors (E700-E799)
    #[error("Operation cancelled")]
    Cancelled,

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownModel(_) => "E001",
            Self::EmptyInput => "E002",
            Self::SentenceTooLong { .. } => "E003",
            Self::HeadroomExceedsBudget { .. } => "E004",
            Self::RecursionLimit(_) => "E005",
            Self::Tokenizer(_) => "E006",
            Self::NetworkError(_) => "E100",
            Self::LLMError(_) => "E101",
            Self::RateLimited(_) => "E102",
            Self::ConfigError(_) => "E600",
            Self::Cancelled => "E700",
            Self::InvalidInput(_) => "E800",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::UnknownModel(model) => Some(format!("add `\"{}\" = <window>` under [models]", model)),
            Self::SentenceTooLong { budget, .. } => Some(format!(
                "pre-split the input or raise the budget above {} tokens",
                budget
            )),
            Self::HeadroomExceedsBudget { .. } => Some(
                "lower summarizer.response_reserve_tokens in config.toml".to_string(),
            ),
            Self::NetworkError(_) => Some("Check internet connection".to_string()),
            Self::LLMError(_) => Some("Set CONDENSE_API_KEY or OPENROUTER_API_KEY".to_string()),
            _ => None,
        }
    }

    /// Whether this error was raised by the completion provider rather than
    /// by chunk planning
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            Self::NetworkError(_) | Self::LLMError(_) | Self::RateLimited(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_model_error() {
        let error = Error::UnknownModel("acme/tiny".to_string());
        assert_eq!(error.code(), "E001");
        assert!(error.to_string().contains("acme/tiny"));
        assert!(error.suggestion().unwrap().contains("acme/tiny"));
    }

    #[test]
    fn test_sentence_too_long_error() {
        let error = Error::SentenceTooLong {
            tokens: 812,
            budget: 400,
        };
        assert_eq!(error.code(), "E003");
        assert_eq!(
            error.to_string(),
            "Sentence is too long: 812 tokens (budget is 400 tokens)"
        );
        assert!(error.suggestion().unwrap().contains("400"));
    }

    #[test]
    fn test_headroom_error_mentions_model() {
        let error = Error::HeadroomExceedsBudget {
            model: "openai/gpt-4".to_string(),
            budget: 511,
            headroom: 550,
        };
        assert_eq!(error.code(), "E004");
        let message = error.to_string();
        assert!(message.contains("550"));
        assert!(message.contains("openai/gpt-4"));
    }

    #[test]
    fn test_provider_errors() {
        assert!(Error::LLMError("boom".to_string()).is_provider_error());
        assert!(Error::RateLimited(5).is_provider_error());
        assert!(!Error::EmptyInput.is_provider_error());
        assert!(!Error::Cancelled.is_provider_error());
    }

    #[test]
    fn test_generic_codes() {
        assert_eq!(Error::Other("x".to_string()).code(), "E9999");
        let io = Error::from(std::io::Error::other("disk"));
        assert_eq!(io.code(), "E9999");
        assert_eq!(io.suggestion(), None);
    }
}
