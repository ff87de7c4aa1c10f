//! Ephemeral memory digest sent with every model request

use crate::config::constants::messages::MEMORY_REMINDER;
use crate::llm::provider::Message;
use crate::memory::MemoryStore;
use crate::utils::truncate_chars;
use std::fmt::Write;

const TARGET_PREVIEW_CHARS: usize = 80;
const ERROR_PREVIEW_CHARS: usize = 50;

/// Render the memory digest as a user message, or `None` when memory is empty.
///
/// The message is placed right after the system prompt of the outgoing request
/// and is never stored in the transcript.
pub fn build_memory_summary(memory: &MemoryStore, recent_actions: usize) -> Option<Message> {
    if !memory.has_summary_content() {
        return None;
    }

    let mut summary = String::new();
    let _ = writeln!(summary, "{MEMORY_REMINDER}");
    let _ = writeln!(summary, "--- Memory summary ---");

    if let Some(info) = memory.system_info() {
        let _ = writeln!(summary, "System info: {info}");
    }

    let notes = memory.notes().trim();
    if !notes.is_empty() {
        let _ = writeln!(summary, "Notes: {notes}");
    }

    let log = memory.action_log();
    if !log.is_empty() && recent_actions > 0 {
        let shown = &log[log.len().saturating_sub(recent_actions)..];
        let _ = writeln!(
            summary,
            "Recent actions ({} of {}):",
            shown.len(),
            memory.action_count()
        );
        for entry in shown {
            let time = entry.timestamp.format("%H:%M:%S");
            let target = truncate_chars(&entry.target, TARGET_PREVIEW_CHARS);
            let _ = write!(
                summary,
                "- [{time}] {} {}: {target}",
                entry.action_type, entry.status
            );
            if let Some(error) = entry.error_msg.as_deref() {
                let _ = write!(
                    summary,
                    " (error: {}...)",
                    truncate_chars(error, ERROR_PREVIEW_CHARS)
                );
            }
            summary.push('\n');
        }
    }
    summary.push_str("--- End of memory summary ---");

    Some(Message::user(summary))
}
