use super::summarizer::Summarizer;
use crate::config::constants::messages;
use crate::llm::provider::{Message, MessageRole};
use std::sync::Arc;
use tracing::{info, warn};

/// Folds the oldest messages into a single summary message when the
/// transcript outgrows its bound
pub struct HistoryCompactor {
    summarizer: Arc<dyn Summarizer>,
    window: usize,
    system_prompt: String,
}

impl HistoryCompactor {
    /// `system_prompt` is used when the transcript has lost its own
    pub fn new(summarizer: Arc<dyn Summarizer>, window: usize, system_prompt: String) -> Self {
        Self {
            summarizer,
            window: window.max(2),
            system_prompt,
        }
    }

    /// Returns `[system, summary, ..newer]` with at most `max_length` messages,
    /// never fewer than two. Transcripts already within bounds are returned
    /// unchanged.
    pub async fn compact(&self, transcript: Vec<Message>, max_length: usize) -> Vec<Message> {
        if transcript.len() <= max_length {
            return transcript;
        }
        let max_length = max_length.max(2);

        let mut transcript = transcript;
        let original_len = transcript.len();
        let mut passes = 0;
        while transcript.len() > max_length {
            transcript = self.compact_once(transcript).await;
            passes += 1;
        }

        info!(
            before = original_len,
            after = transcript.len(),
            passes,
            "compacted conversation history"
        );
        transcript
    }

    async fn compact_once(&self, transcript: Vec<Message>) -> Vec<Message> {
        let mut rest = transcript.into_iter().peekable();
        let system = match rest.next_if(Message::is_system_prompt) {
            Some(system) => system,
            None => {
                warn!("transcript has no usable system prompt, restoring it");
                Message::system(self.system_prompt.clone())
            }
        };
        let rest: Vec<Message> = rest.collect();

        let cut = window_end(&rest, self.window);
        let (older, newer) = rest.split_at(cut);
        let summary = self.summary_for(older).await;

        let mut compacted = Vec::with_capacity(newer.len() + 2);
        compacted.push(system);
        compacted.push(Message::user(summary));
        compacted.extend_from_slice(newer);
        compacted
    }

    async fn summary_for(&self, older: &[Message]) -> String {
        match self.summarizer.summarize(older).await {
            Ok(text) => format!("{}{text}", messages::SUMMARY_PREFIX),
            Err(err) => {
                warn!("History summary failed, using counts instead: {err:#}");
                fallback_summary(older)
            }
        }
    }
}

/// End of the summarized window. Grows past `window` so that the tool
/// replies of a request inside the window are summarized with it.
fn window_end(messages: &[Message], window: usize) -> usize {
    let mut end = window.min(messages.len());
    while end < messages.len() && messages[end].is_tool_response() {
        end += 1;
    }
    end
}

/// Deterministic summary stating message counts by role
pub fn fallback_summary(older: &[Message]) -> String {
    let count = |role: MessageRole| older.iter().filter(|m| m.role == role).count();
    format!(
        "{}{} earlier messages, including {} user messages and {} assistant replies ({} tool results).",
        messages::FALLBACK_SUMMARY_PREFIX,
        older.len(),
        count(MessageRole::User),
        count(MessageRole::Assistant),
        count(MessageRole::Tool),
    )
}
