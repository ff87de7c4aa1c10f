//! Tools the model can call
//!
//! Each tool is a plain collaborator ([`CommandExecutor`], [`FileTools`],
//! [`WebSearchClient`], the memory store) and the [`registry`] maps model
//! function calls onto them.

pub mod command;
pub mod file_ops;
pub mod process_group;
pub mod registry;
pub mod web_search;

pub use command::{CommandError, CommandExecutor, CommandOutcome, Completion, CompletionGuard};
pub use file_ops::FileTools;
pub use registry::{ConfirmationFlag, ToolDispatcher, ToolResult, build_tool_definitions};
pub use web_search::{SearchResult, WebSearchClient, WebSearchError};

use crate::memory::ActionStatus;
use serde_json::Value;

/// Payload of a completed tool call and the status recorded for it
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub status: ActionStatus,
    pub payload: Value,
}

impl ToolOutput {
    pub fn new(status: ActionStatus, payload: Value) -> Self {
        Self { status, payload }
    }

    pub fn success(payload: Value) -> Self {
        Self::new(ActionStatus::Success, payload)
    }
}
