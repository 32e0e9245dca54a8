//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Condense configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    /// Extra or overriding model context windows, keyed by model id
    #[serde(default)]
    pub models: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(skip)]
    pub api_key: Option<String>,
    pub default_model: String,
    pub timeout_secs: u64,
}

/// Headroom and fan-out settings for recursive summarization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Tokens reserved for the generated summary; also the completion's max_tokens
    pub response_reserve_tokens: usize,
    /// Tokens reserved for the prompt template wrapped around the text
    pub prompt_reserve_tokens: usize,
    /// Sibling chunks summarized concurrently at one recursion level
    pub max_concurrency: usize,
    /// Deepest recursion level before giving up on convergence
    pub max_depth: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            response_reserve_tokens: 500,
            prompt_reserve_tokens: 50,
            max_concurrency: 4,
            max_depth: 8,
        }
    }
}

impl SummarizerConfig {
    /// Total tokens kept out of the input budget
    pub fn headroom(&self) -> usize {
        self.response_reserve_tokens + self.prompt_reserve_tokens
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.response_reserve_tokens == 0 {
            return Err(anyhow!("summarizer.response_reserve_tokens must be positive"));
        }
        if self.max_concurrency == 0 {
            return Err(anyhow!("summarizer.max_concurrency must be at least 1"));
        }
        if self.max_depth == 0 {
            return Err(anyhow!("summarizer.max_depth must be at least 1"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_key: None,
                default_model: "openai/gpt-4o-mini".to_string(),
                timeout_secs: 120,
            },
            summarizer: SummarizerConfig::default(),
            models: BTreeMap::new(),
        }
    }
}

impl LlmConfig {
    pub fn resolved_api_key(&self) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;

        Ok(env::var("CONDENSE_API_KEY")
            .or_else(|_| env::var("OPENROUTER_API_KEY"))
            .ok())
    }

    pub fn redacted_api_key(&self) -> anyhow::Result<Option<String>> {
        self.resolved_api_key().map(|opt| opt.as_deref().map(redact_key))
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.api_key.is_some() {
            return Err(anyhow!(
                "LLM API keys must be provided via environment variables, not stored in configuration"
            ));
        }
        Ok(())
    }
}

/// Mask all but the last four characters of a key
pub(crate) fn redact_key(key: &str) -> String {
    let count = key.chars().count();
    if count <= 4 {
        return "***".to_string();
    }
    let suffix: String = key.chars().skip(count - 4).collect();
    format!("***{}", suffix)
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("CONDENSE_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("condense")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.llm.enforce_env_only()?;
        self.summarizer.validate()?;

        if let Some((model, window)) = self.models.iter().find(|(_, window)| **window < 2) {
            return Err(anyhow!(
                "Model '{}' has a context window of {} tokens; at least 2 are required",
                model,
                window
            ));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            // LLM settings
            "llm.default_model" => Ok(self.llm.default_model.clone()),
            "llm.timeout_secs" => Ok(self.llm.timeout_secs.to_string()),

            // Summarizer settings
            "summarizer.response_reserve_tokens" => {
                Ok(self.summarizer.response_reserve_tokens.to_string())
            }
            "summarizer.prompt_reserve_tokens" => {
                Ok(self.summarizer.prompt_reserve_tokens.to_string())
            }
            "summarizer.max_concurrency" => Ok(self.summarizer.max_concurrency.to_string()),
            "summarizer.max_depth" => Ok(self.summarizer.max_depth.to_string()),

            // API key (special handling - show redacted)
            "llm.api_key" | "api_key" => match self.llm.redacted_api_key()? {
                Some(redacted) => Ok(redacted),
                None => Ok(
                    "(not set - use CONDENSE_API_KEY or OPENROUTER_API_KEY env var)".to_string(),
                ),
            },

            _ => match key.strip_prefix("models.") {
                Some(model) => self
                    .models
                    .get(model)
                    .map(|window| window.to_string())
                    .ok_or_else(|| anyhow!("No context window configured for model '{}'", model)),
                None => Err(anyhow!(
                    "Unknown configuration key: {}. See Config::list for available keys.",
                    key
                )),
            },
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            // LLM settings
            "llm.default_model" => {
                self.llm.default_model = value.to_string();
            }
            "llm.timeout_secs" => {
                self.llm.timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {}", value))?;
            }

            // Summarizer settings
            "summarizer.response_reserve_tokens" => {
                let tokens: usize = value
                    .parse()
                    .with_context(|| format!("Invalid response_reserve_tokens value: {}", value))?;
                if tokens == 0 {
                    return Err(anyhow!("Response reserve must be positive"));
                }
                self.summarizer.response_reserve_tokens = tokens;
            }
            "summarizer.prompt_reserve_tokens" => {
                self.summarizer.prompt_reserve_tokens = value
                    .parse()
                    .with_context(|| format!("Invalid prompt_reserve_tokens value: {}", value))?;
            }
            "summarizer.max_concurrency" => {
                let concurrency: usize = value
                    .parse()
                    .with_context(|| format!("Invalid max_concurrency value: {}", value))?;
                if concurrency == 0 {
                    return Err(anyhow!("Concurrency must be at least 1"));
                }
                self.summarizer.max_concurrency = concurrency;
            }
            "summarizer.max_depth" => {
                let depth: usize = value
                    .parse()
                    .with_context(|| format!("Invalid max_depth value: {}", value))?;
                if depth == 0 {
                    return Err(anyhow!("Max depth must be at least 1"));
                }
                self.summarizer.max_depth = depth;
            }

            // API key cannot be set via config
            "llm.api_key" | "api_key" => {
                return Err(anyhow!(
                    "API keys cannot be stored in configuration for security. \
                     Set the CONDENSE_API_KEY or OPENROUTER_API_KEY environment variable instead."
                ));
            }

            _ => match key.strip_prefix("models.") {
                Some(model) if !model.is_empty() => {
                    let window: usize = value
                        .parse()
                        .with_context(|| format!("Invalid context window value: {}", value))?;
                    if window < 2 {
                        return Err(anyhow!("Context window must be at least 2 tokens"));
                    }
                    self.models.insert(model.to_string(), window);
                }
                _ => {
                    return Err(anyhow!(
                        "Unknown configuration key: {}. See Config::list for available keys.",
                        key
                    ));
                }
            },
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = vec![
            "llm.default_model",
            "llm.timeout_secs",
            "llm.api_key",
            "summarizer.response_reserve_tokens",
            "summarizer.prompt_reserve_tokens",
            "summarizer.max_concurrency",
            "summarizer.max_depth",
        ];

        let mut entries = keys
            .into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        entries.extend(
            self.models
                .iter()
                .map(|(model, window)| (format!("models.{}", model), window.to_string())),
        );

        Ok(entries)
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}
