use super::providers::OpenAIProvider;
use crate::config::core::AgentConfig;
use crate::llm::provider::{LLMError, LLMProvider};
use std::sync::Arc;
use std::time::Duration;

/// Build the provider named in `[agent].provider`
pub fn create_provider(
    agent: &AgentConfig,
    api_key: String,
) -> Result<Arc<dyn LLMProvider>, LLMError> {
    match agent.provider.to_lowercase().as_str() {
        "openai" => Ok(Arc::new(OpenAIProvider::with_base_url(
            api_key,
            agent.base_url.clone(),
            Duration::from_secs(agent.request_timeout_secs),
        ))),
        other => Err(LLMError::InvalidRequest(format!(
            "Unknown provider '{other}'. Supported providers: openai"
        ))),
    }
}
