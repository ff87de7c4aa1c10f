//! # LLM integration layer
//!
//! Provider-neutral request/response types, the `LLMProvider` trait the
//! conversation loop talks to, and the OpenAI-compatible adapter.

pub mod factory;
pub mod provider;
pub mod providers;

pub use factory::create_provider;
pub use provider::{
    FinishReason, FunctionCall, LLMError, LLMProvider, LLMRequest, LLMResponse, Message,
    MessageRole, ToolCall, ToolChoice, ToolDefinition, Usage,
};
pub use providers::OpenAIProvider;
