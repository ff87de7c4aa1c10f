use crate::llm::provider::{LLMProvider, LLMRequest, Message, MessageRole};
use crate::utils::truncate_chars;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

const SUMMARIZER_PROMPT: &str = "You condense chat transcripts. Summarize the following messages concisely but completely. \
Keep important facts, context and decisions. The summary replaces these messages in a longer conversation, \
so it must preserve continuity.";

const TOOL_RESULT_PREVIEW_CHARS: usize = 100;
const TOOL_ARGUMENT_PREVIEW_CHARS: usize = 50;
const MESSAGE_PREVIEW_CHARS: usize = 150;

/// Produces the text of a compaction summary
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, messages: &[Message]) -> Result<String>;
}

/// Summarizes with a cheaper model through the same provider
pub struct LLMSummarizer {
    provider: Arc<dyn LLMProvider>,
    model: String,
    max_tokens: u32,
    locale: String,
}

impl LLMSummarizer {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        model: impl Into<String>,
        max_tokens: u32,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens,
            locale: locale.into(),
        }
    }
}

#[async_trait]
impl Summarizer for LLMSummarizer {
    async fn summarize(&self, messages: &[Message]) -> Result<String> {
        if messages.is_empty() {
            return Ok("No earlier messages.".to_string());
        }

        let request = LLMRequest::new(
            self.model.clone(),
            vec![
                Message::system(SUMMARIZER_PROMPT.to_string()),
                Message::user(format!(
                    "Summarize these messages (language: {}, at most 500 characters):\n\n{}",
                    self.locale,
                    render_for_summary(messages)
                )),
            ],
        )
        .with_max_tokens(self.max_tokens);

        debug!(model = %self.model, messages = messages.len(), "requesting history summary");
        let response = self.provider.generate(request).await?;
        response
            .content
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| anyhow!("Summary model returned no text"))
    }
}

/// One line per message with long content shortened
pub fn render_for_summary(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|message| match message.role {
            MessageRole::Tool => format!(
                "Tool [{}]: {}",
                message.name.as_deref().unwrap_or("unnamed"),
                preview(message.text(), TOOL_RESULT_PREVIEW_CHARS)
            ),
            MessageRole::Assistant if message.has_tool_calls() => {
                let calls = message
                    .tool_calls()
                    .iter()
                    .map(|call| {
                        format!(
                            "{}({})",
                            call.function.name,
                            preview(&call.function.arguments, TOOL_ARGUMENT_PREVIEW_CHARS)
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("Assistant calls: {calls}")
            }
            role => format!(
                "{}: {}",
                capitalize(role.as_openai_str()),
                preview(message.text(), MESSAGE_PREVIEW_CHARS)
            ),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn preview(text: &str, max_chars: usize) -> String {
    let cut = truncate_chars(text, max_chars);
    if cut.len() < text.len() {
        format!("{cut}...")
    } else {
        cut.to_string()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
