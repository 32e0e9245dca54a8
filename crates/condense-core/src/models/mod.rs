//! Model context windows and token budgets
//!
//! Every chunking decision starts here: a model id maps to the size of its
//! input window, and the effective budget is that window minus one token of
//! safety margin, optionally capped by a caller override.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};

/// Context window of a single model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProfile {
    /// Model identifier (e.g., "openai/gpt-4o")
    pub id: String,
    /// Maximum number of input tokens the model accepts
    pub max_input_tokens: usize,
}

impl ModelProfile {
    /// Create a new model profile
    pub fn new(id: impl Into<String>, max_input_tokens: usize) -> Self {
        Self {
            id: id.into(),
            max_input_tokens,
        }
    }
}

/// Default context windows for common OpenRouter models
fn default_profile_table() -> HashMap<String, ModelProfile> {
    let profiles = [
        // OpenAI models
        ModelProfile::new("openai/gpt-4o", 128_000),
        ModelProfile::new("openai/gpt-4o-mini", 128_000),
        ModelProfile::new("openai/gpt-4-turbo", 128_000),
        ModelProfile::new("openai/gpt-4", 8_191),
        ModelProfile::new("openai/gpt-3.5-turbo", 16_385),
        ModelProfile::new("openai/text-davinci-003", 4_097),
        // Anthropic models
        ModelProfile::new("anthropic/claude-sonnet-4-20250514", 200_000),
        ModelProfile::new("anthropic/claude-opus-4-20250514", 200_000),
        ModelProfile::new("anthropic/claude-3-5-haiku-latest", 200_000),
    ];

    profiles
        .into_iter()
        .map(|profile| (profile.id.clone(), profile))
        .collect()
}

/// Registry of model context windows
#[derive(Debug, Clone)]
pub struct ModelLimits {
    profiles: HashMap<String, ModelProfile>,
}

impl Default for ModelLimits {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelLimits {
    /// Create a registry with the default model table
    pub fn new() -> Self {
        Self {
            profiles: default_profile_table(),
        }
    }

    /// Create a registry with no models registered
    pub fn empty() -> Self {
        Self {
            profiles: HashMap::new(),
        }
    }

    /// Create a registry from the default table plus the `[models]` section
    /// of the configuration. Configured windows win over defaults.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut limits = Self::new();
        for (id, window) in &config.models {
            limits.register(ModelProfile::new(id.clone(), *window))?;
        }
        Ok(limits)
    }

    /// Add or replace a model profile
    pub fn register(&mut self, profile: ModelProfile) -> Result<()> {
        if profile.max_input_tokens < 2 {
            return Err(Error::ConfigError(format!(
                "model '{}' needs a context window of at least 2 tokens, got {}",
                profile.id, profile.max_input_tokens
            )));
        }
        self.profiles.insert(profile.id.clone(), profile);
        Ok(())
    }

    /// Builder-style variant of [`ModelLimits::register`]
    pub fn with_model(mut self, id: impl Into<String>, max_input_tokens: usize) -> Result<Self> {
        self.register(ModelProfile::new(id, max_input_tokens))?;
        Ok(self)
    }

    /// Get the profile for a model, returns None if unknown
    pub fn profile(&self, model: &str) -> Option<&ModelProfile> {
        self.profiles.get(model)
    }

    /// Maximum input window of a model
    pub fn max_input_tokens(&self, model: &str) -> Result<usize> {
        self.profiles
            .get(model)
            .map(|p| p.max_input_tokens)
            .ok_or_else(|| Error::UnknownModel(model.to_string()))
    }

    /// Token budget for a chunk or prompt body.
    ///
    /// One token of the window is always held back. A positive override caps
    /// the budget further; `None` or `Some(0)` means "use the model limit".
    pub fn effective_budget(&self, model: &str, max_override: Option<usize>) -> Result<usize> {
        let limit = self.max_input_tokens(model)? - 1;

        Ok(match max_override {
            Some(cap) if cap > 0 => cap.min(limit),
            _ => limit,
        })
    }

    /// Iterate over the registered model ids
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_model_window() {
        let limits = ModelLimits::new();
        assert_eq!(limits.max_input_tokens("openai/gpt-4").unwrap(), 8_191);
        assert_eq!(
            limits.max_input_tokens("openai/text-davinci-003").unwrap(),
            4_097
        );
    }

    #[test]
    fn test_unknown_model_is_error() {
        let limits = ModelLimits::new();
        let err = limits.max_input_tokens("acme/unknown").unwrap_err();
        assert!(matches!(err, Error::UnknownModel(ref m) if m == "acme/unknown"));

        let err = limits.effective_budget("acme/unknown", Some(10)).unwrap_err();
        assert_eq!(err.code(), "E001");
    }

    #[test]
    fn test_effective_budget_reserves_one_token() {
        let limits = ModelLimits::empty().with_model("test/model", 100).unwrap();
        assert_eq!(limits.effective_budget("test/model", None).unwrap(), 99);
    }

    #[test]
    fn test_effective_budget_override() {
        let limits = ModelLimits::empty().with_model("test/model", 100).unwrap();

        // Smaller override wins
        assert_eq!(limits.effective_budget("test/model", Some(40)).unwrap(), 40);
        // Override above the limit is capped
        assert_eq!(limits.effective_budget("test/model", Some(500)).unwrap(), 99);
        // Zero means no override
        assert_eq!(limits.effective_budget("test/model", Some(0)).unwrap(), 99);
    }

    #[test]
    fn test_register_rejects_tiny_window() {
        let mut limits = ModelLimits::empty();
        let err = limits.register(ModelProfile::new("test/tiny", 1)).unwrap_err();
        assert_eq!(err.code(), "E600");
        assert!(limits.profile("test/tiny").is_none());
    }

    #[test]
    fn test_from_config_overrides_defaults() {
        let mut config = Config::default();
        config.models.insert("openai/gpt-4".to_string(), 32_768);
        config.models.insert("local/llama".to_string(), 4_096);

        let limits = ModelLimits::from_config(&config).unwrap();
        assert_eq!(limits.max_input_tokens("openai/gpt-4").unwrap(), 32_768);
        assert_eq!(limits.max_input_tokens("local/llama").unwrap(), 4_096);
        assert!(limits.models().any(|m| m == "openai/gpt-4o"));
    }
}
