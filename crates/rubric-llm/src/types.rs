//! Request and response types for chat completion calls.
//!
//! These mirror the OpenAI chat completion wire format, which the
//! classification engine uses exclusively in non-streaming mode: the
//! request always carries `stream: false` and exactly two messages
//! (system + user).

use serde::{Deserialize, Serialize};

/// A message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// The role of the message author ("system", "user", "assistant").
    pub role: String,

    /// The content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Create a message with role and content.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

/// A chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// The model identifier.
    pub model: String,

    /// The conversation messages (system prompt + user prompt).
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature.
    pub temperature: f64,

    /// Maximum number of tokens to generate.
    pub max_tokens: i32,

    /// Always `false`: the engine never streams.
    pub stream: bool,
}

impl ChatRequest {
    /// Create a non-streaming request from a system and a user prompt.
    pub fn new(
        model: impl Into<String>,
        system: impl Into<String>,
        user: impl Into<String>,
        temperature: f64,
        max_tokens: i32,
    ) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature,
            max_tokens,
            stream: false,
        }
    }
}

/// A chat completion response.
///
/// Providers that fail at the application layer return HTTP 200 with an
/// `error` object instead of `choices`; both fields are optional so the
/// backend can inspect whichever arrived.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatResponse {
    /// Completion identifier, when the provider sends one.
    #[serde(default)]
    pub id: Option<String>,

    /// The list of completion choices.
    #[serde(default)]
    pub choices: Vec<Choice>,

    /// Token usage statistics, if available.
    #[serde(default)]
    pub usage: Option<Usage>,

    /// The model that generated the response.
    #[serde(default)]
    pub model: Option<String>,

    /// Application-level error reported in the body.
    #[serde(default)]
    pub error: Option<ApiError>,
}

/// A single completion choice.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Choice {
    /// The index of this choice.
    #[serde(default)]
    pub index: i32,

    /// The assistant's response message.
    pub message: ChatMessage,

    /// Why generation stopped.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Usage {
    /// Number of tokens in the prompt.
    pub prompt_tokens: i32,

    /// Number of tokens in the completion.
    pub completion_tokens: i32,

    /// Total tokens used.
    pub total_tokens: i32,
}

/// An application-level error object in a completion response body.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    /// Provider-supplied message.
    #[serde(default)]
    pub message: String,

    /// Provider-supplied error class.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_helpers() {
        let sys = ChatMessage::system("You are a classifier.");
        assert_eq!(sys.role, "system");
        let user = ChatMessage::user("классифицируй: кабель");
        assert_eq!(user.role, "user");
    }

    #[test]
    fn request_serializes_stream_false() {
        let req = ChatRequest::new("gpt-4o-mini", "sys", "usr", 0.3, 1024);
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""stream":false"#));
        assert!(json.contains(r#""temperature":0.3"#));
        assert!(json.contains(r#""max_tokens":1024"#));
        assert_eq!(req.messages.len(), 2);
    }

    #[test]
    fn response_with_choices() {
        let json = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "{\"selected_code\":\"C\"}"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 100, "completion_tokens": 20, "total_tokens": 120}
        }"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.choices.len(), 1);
        assert!(resp.error.is_none());
        assert_eq!(resp.usage.unwrap().total_tokens, 120);
    }

    #[test]
    fn response_with_error_object() {
        let json = r#"{"error": {"message": "model overloaded", "type": "server_error"}}"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(resp.choices.is_empty());
        let err = resp.error.unwrap();
        assert_eq!(err.message, "model overloaded");
        assert_eq!(err.kind.as_deref(), Some("server_error"));
    }

    #[test]
    fn response_minimal_body() {
        let resp: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.id.is_none());
        assert!(resp.choices.is_empty());
        assert!(resp.error.is_none());
    }
}
