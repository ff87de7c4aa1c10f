//! Provider-neutral chat model types
//!
//! `Message` doubles as the persisted transcript format, so it serializes in
//! the OpenAI chat shape:
//!
//! - **Roles**: `system`, `user`, `assistant`, `tool`
//! - **Tool calls**: only `assistant` messages carry `tool_calls`
//! - **Tool results**: `tool` messages carry the `tool_call_id` they answer
//!
//! ```rust
//! use nivuus_core::llm::provider::{Message, MessageRole};
//!
//! let tool_response = Message::tool_response(
//!     "call_123".to_string(),
//!     "read_file".to_string(),
//!     "{\"content\":\"hello\"}".to_string(),
//! );
//! assert_eq!(tool_response.role, MessageRole::Tool);
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Universal LLM request structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMRequest {
    pub messages: Vec<Message>,
    pub tools: Option<Vec<ToolDefinition>>,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub tool_choice: Option<ToolChoice>,
}

impl LLMRequest {
    /// Plain request without tools
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: None,
            model: model.into(),
            max_tokens: None,
            temperature: None,
            tool_choice: None,
        }
    }

    /// Attach tool schemas and let the model decide when to call them
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        if !tools.is_empty() {
            self.tools = Some(tools);
            self.tool_choice = Some(ToolChoice::Auto);
        }
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Tool choice configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ToolChoice {
    /// Let the model decide whether to call tools ("auto")
    Auto,
    /// Force the model to not call any tools ("none")
    None,
}

impl ToolChoice {
    /// Convert to provider-specific format
    pub fn to_provider_format(&self, _provider: &str) -> Value {
        match self {
            Self::Auto => json!("auto"),
            Self::None => json!("none"),
        }
    }
}

/// Universal message structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn with_role(role: MessageRole, content: Option<String>) -> Self {
        Self {
            role,
            content,
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a user message
    pub fn user(content: String) -> Self {
        Self::with_role(MessageRole::User, Some(content))
    }

    /// Create an assistant message
    pub fn assistant(content: String) -> Self {
        Self::with_role(MessageRole::Assistant, Some(content))
    }

    /// Create an assistant message with tool calls
    pub fn assistant_with_tools(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        let mut message = Self::with_role(MessageRole::Assistant, content);
        message.tool_calls = Some(tool_calls);
        message
    }

    /// Create a system message
    pub fn system(content: String) -> Self {
        Self::with_role(MessageRole::System, Some(content))
    }

    /// Create a tool response message answering `tool_call_id`
    pub fn tool_response(tool_call_id: String, function_name: String, content: String) -> Self {
        let mut message = Self::with_role(MessageRole::Tool, Some(content));
        message.tool_call_id = Some(tool_call_id);
        message.name = Some(function_name);
        message
    }

    /// Check if this message has tool calls
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls
            .as_ref()
            .is_some_and(|calls| !calls.is_empty())
    }

    /// Tool calls carried by an assistant message, empty otherwise
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or(&[])
    }

    /// Check if this is a tool response message
    pub fn is_tool_response(&self) -> bool {
        self.role == MessageRole::Tool
    }

    /// An assistant message whose tool calls still need results
    pub fn is_pending_tool_request(&self) -> bool {
        self.role == MessageRole::Assistant && self.has_tool_calls()
    }

    /// A system message with usable content
    pub fn is_system_prompt(&self) -> bool {
        self.role == MessageRole::System
            && self
                .content
                .as_deref()
                .is_some_and(|content| !content.trim().is_empty())
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    /// Get the role string for OpenAI API
    pub fn as_openai_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }
}

/// Universal tool definition in the OpenAI function calling shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The type of tool (always "function" for function calling)
    #[serde(rename = "type")]
    pub tool_type: String,

    /// Function definition containing name, description, and parameters
    pub function: FunctionDefinition,
}

/// Function definition within a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// The parameters the function accepts, described as a JSON Schema object
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a new tool definition with function type
    pub fn function(name: String, description: String, parameters: Value) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name,
                description,
                parameters,
            },
        }
    }
}

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,

    /// The type of tool call (always "function")
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,

    pub function: FunctionCall,
}

fn default_call_type() -> String {
    "function".to_string()
}

/// Function call within a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,

    /// The arguments to pass to the function, as a JSON string
    #[serde(default)]
    pub arguments: String,
}

impl ToolCall {
    /// Create a new function tool call
    pub fn function(id: String, name: String, arguments: String) -> Self {
        Self {
            id,
            call_type: default_call_type(),
            function: FunctionCall { name, arguments },
        }
    }
}

/// Universal LLM response
#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub usage: Option<Usage>,
    pub finish_reason: FinishReason,
}

impl LLMResponse {
    /// The reply as a transcript message, appended verbatim
    pub fn into_message(self) -> Message {
        match self.tool_calls {
            Some(calls) if !calls.is_empty() => Message::assistant_with_tools(self.content, calls),
            _ => Message {
                role: MessageRole::Assistant,
                content: self.content,
                name: None,
                tool_calls: None,
                tool_call_id: None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Error(String),
}

/// Universal LLM provider trait
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Get provider name
    fn name(&self) -> &str;

    /// Generate completion
    async fn generate(&self, request: LLMRequest) -> Result<LLMResponse, LLMError>;

    /// Validate request for this provider
    fn validate_request(&self, request: &LLMRequest) -> Result<(), LLMError> {
        if request.messages.is_empty() {
            return Err(LLMError::InvalidRequest(
                "Messages cannot be empty".to_string(),
            ));
        }
        if request.model.is_empty() {
            return Err(LLMError::InvalidRequest(
                "Model cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LLMError {
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Provider error: {0}")]
    Provider(String),
}

impl LLMError {
    /// Authentication failures stop the agent; everything else is retried
    pub fn is_fatal(&self) -> bool {
        matches!(self, LLMError::Authentication(_))
    }

    /// Short label used in the action log target
    pub fn kind(&self) -> &'static str {
        match self {
            LLMError::Authentication(_) => "authentication",
            LLMError::RateLimit => "rate_limit",
            LLMError::InvalidRequest(_) => "invalid_request",
            LLMError::Network(_) => "network",
            LLMError::Provider(_) => "provider",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_serializes_in_openai_shape() {
        let call = ToolCall::function(
            "call_1".to_string(),
            "read_file".to_string(),
            "{\"filepath\":\"/etc/hostname\"}".to_string(),
        );
        let message = Message::assistant_with_tools(None, vec![call]);
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "assistant");
        assert!(value["content"].is_null());
        assert_eq!(value["tool_calls"][0]["type"], "function");
        assert_eq!(value["tool_calls"][0]["function"]["name"], "read_file");
        assert!(value.get("tool_call_id").is_none());
    }

    #[test]
    fn persisted_messages_tolerate_missing_and_extra_fields() {
        let raw = r#"[
            {"role": "system", "content": "prompt"},
            {"role": "assistant", "content": null, "refusal": null,
             "tool_calls": [{"id": "a", "type": "function", "function": {"name": "web_search", "arguments": "{}"}}]},
            {"role": "tool", "tool_call_id": "a", "name": "web_search", "content": "[]"},
            {"role": "assistant"}
        ]"#;
        let messages: Vec<Message> = serde_json::from_str(raw).unwrap();
        assert_eq!(messages.len(), 4);
        assert!(messages[1].is_pending_tool_request());
        assert_eq!(messages[2].tool_call_id.as_deref(), Some("a"));
        assert_eq!(messages[3].content, None);
    }

    #[test]
    fn empty_tool_call_list_is_a_plain_reply() {
        let response = LLMResponse {
            content: Some("done".to_string()),
            tool_calls: Some(Vec::new()),
            usage: None,
            finish_reason: FinishReason::Stop,
        };
        let message = response.into_message();
        assert!(!message.has_tool_calls());
        assert!(message.tool_calls.is_none());
    }

    #[test]
    fn only_authentication_is_fatal() {
        assert!(LLMError::Authentication("bad key".into()).is_fatal());
        assert!(!LLMError::RateLimit.is_fatal());
        assert!(!LLMError::Network("reset".into()).is_fatal());
        assert!(!LLMError::Provider("500".into()).is_fatal());
    }
}
