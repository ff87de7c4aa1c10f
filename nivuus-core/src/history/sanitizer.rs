use crate::llm::provider::{Message, MessageRole};
use tracing::debug;

/// Drop every tool request that is not immediately answered, in order, by one
/// tool message per call, and every tool message without such a request.
///
/// Idempotent: the output only contains complete request/result groups.
pub fn sanitize(transcript: &[Message]) -> Vec<Message> {
    let mut sanitized = Vec::with_capacity(transcript.len());
    let mut dropped = 0usize;
    let mut index = 0;

    while index < transcript.len() {
        let message = &transcript[index];

        if message.role == MessageRole::Assistant && message.has_tool_calls() {
            let calls = message.tool_calls();
            let group_end = index + 1 + calls.len();
            let complete = group_end <= transcript.len()
                && calls
                    .iter()
                    .zip(&transcript[index + 1..group_end])
                    .all(|(call, reply)| answers(reply, &call.id));

            if complete {
                sanitized.extend_from_slice(&transcript[index..group_end]);
                index = group_end;
            } else {
                // Drop the request together with the partial run of tool replies
                let partial = transcript[index + 1..]
                    .iter()
                    .take_while(|reply| reply.is_tool_response())
                    .count();
                dropped += 1 + partial;
                index += 1 + partial;
            }
            continue;
        }

        if message.is_tool_response() {
            dropped += 1;
        } else {
            sanitized.push(message.clone());
        }
        index += 1;
    }

    if dropped > 0 {
        debug!(dropped, kept = sanitized.len(), "sanitized transcript");
    }
    sanitized
}

fn answers(reply: &Message, call_id: &str) -> bool {
    reply.is_tool_response() && reply.tool_call_id.as_deref() == Some(call_id)
}
