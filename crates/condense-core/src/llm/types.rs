//! Wire types for OpenAI-compatible chat completions

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Request body for `/chat/completions`
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model identifier (e.g., "openai/gpt-4o-mini")
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    /// A request carrying a single user prompt
    pub fn from_prompt(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(model, vec![Message::user(prompt)])
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Why generation stopped
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    /// Hit max_tokens; the text is cut off
    Length,
    ContentFilter,
    Error,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinishReason::Stop => write!(f, "stop"),
            FinishReason::Length => write!(f, "length"),
            FinishReason::ContentFilter => write!(f, "content_filter"),
            FinishReason::Error => write!(f, "error"),
            FinishReason::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub index: usize,
    pub message: Message,
    pub finish_reason: Option<FinishReason>,
}

/// Response body from `/chat/completions`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub id: String,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

/// First choice of a chat response, flattened
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: FinishReason,
}

impl LlmResponse {
    /// Flatten a chat response; `None` if it carries no choices
    pub fn from_chat_response(response: ChatResponse) -> Option<Self> {
        let usage = response.usage.unwrap_or_default();
        let choice = response.choices.into_iter().next()?;

        Some(Self {
            content: choice.message.content,
            model: response.model,
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            finish_reason: choice.finish_reason.unwrap_or(FinishReason::Unknown),
        })
    }

    /// Whether the provider stopped at max_tokens
    pub fn is_truncated(&self) -> bool {
        self.finish_reason == FinishReason::Length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_request_serialization() {
        let request = ChatRequest::from_prompt("openai/gpt-4", "Summarize this")
            .with_temperature(0.0)
            .with_max_tokens(500);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "openai/gpt-4");
        assert_eq!(json["max_tokens"], 500);
        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Summarize this");
    }

    #[test]
    fn test_unset_fields_are_omitted() {
        let request = ChatRequest::new("m", vec![Message::system("s")]);
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("temperature"));
        assert!(!json.contains("max_tokens"));
    }

    #[test]
    fn test_response_flattening() {
        let json = r#"{
            "id": "gen-42",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "openai/gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "A short digest."},
                "finish_reason": "length"
            }],
            "usage": {"prompt_tokens": 812, "completion_tokens": 500, "total_tokens": 1312}
        }"#;

        let response: ChatResponse = serde_json::from_str(json).unwrap();
        let flat = LlmResponse::from_chat_response(response).unwrap();
        assert_eq!(flat.content, "A short digest.");
        assert_eq!(flat.input_tokens, 812);
        assert_eq!(flat.output_tokens, 500);
        assert!(flat.is_truncated());
    }

    #[test]
    fn test_response_without_usage_or_choices() {
        let json = r#"{"id": "x", "model": "m", "choices": [], "usage": null}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(LlmResponse::from_chat_response(response).is_none());

        let json = r#"{"id": "x", "model": "m", "choices": [
            {"index": 0, "message": {"role": "assistant", "content": "ok"}, "finish_reason": "tool_calls"}
        ]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        let flat = LlmResponse::from_chat_response(response).unwrap();
        assert_eq!(flat.finish_reason, FinishReason::Unknown);
        assert_eq!(flat.input_tokens, 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(MessageRole::User.to_string(), "user");
        assert_eq!(FinishReason::ContentFilter.to_string(), "content_filter");
    }
}
