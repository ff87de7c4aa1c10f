use crate::memory::MemoryError;
use crate::tools::command::CommandError;
use crate::tools::web_search::WebSearchError;
use crate::utils::truncate_chars;
use anyhow::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Argument problems detected before any tool runs
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolCallError {
    #[error("Argument parsing error for {tool}: {message} (arguments: {raw})")]
    ArgumentParse {
        tool: String,
        raw: String,
        message: String,
    },
    #[error("Missing required parameter '{parameter}' for {tool}")]
    MissingParameter { tool: String, parameter: String },
    #[error("Invalid parameter for {tool}: {message}")]
    InvalidParameter { tool: String, message: String },
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

/// Structured failure returned to the model in place of a tool result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecutionError {
    pub tool_name: String,
    pub error_type: ToolErrorType,
    pub message: String,
    pub is_recoverable: bool,
    pub recovery_suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolErrorType {
    InvalidParameters,
    ToolNotFound,
    PermissionDenied,
    ResourceNotFound,
    NetworkError,
    Timeout,
    NotConfigured,
    ExecutionError,
}

impl ToolExecutionError {
    pub fn new(tool_name: &str, error_type: ToolErrorType, message: String) -> Self {
        let (is_recoverable, recovery_suggestions) = generate_recovery_info(error_type);
        Self {
            tool_name: tool_name.to_string(),
            error_type,
            message,
            is_recoverable,
            recovery_suggestions,
        }
    }

    pub fn from_call_error(tool_name: &str, error: &ToolCallError) -> Self {
        let error_type = match error {
            ToolCallError::UnknownTool(_) => ToolErrorType::ToolNotFound,
            _ => ToolErrorType::InvalidParameters,
        };
        Self::new(tool_name, error_type, error.to_string())
    }

    /// Only the outermost message is kept; the full chain belongs in the logs
    pub fn from_error(tool_name: &str, error: &Error) -> Self {
        Self::new(tool_name, classify_error(error), error.to_string())
    }

    /// Cap the message at `max_chars` characters
    pub fn bounded(mut self, max_chars: usize) -> Self {
        let cut = truncate_chars(&self.message, max_chars);
        if cut.len() < self.message.len() {
            self.message = format!("{cut}...");
        }
        self
    }

    pub fn to_json_value(&self) -> Value {
        json!({
            "error": {
                "tool_name": self.tool_name,
                "error_type": format!("{:?}", self.error_type),
                "message": self.message,
                "is_recoverable": self.is_recoverable,
                "recovery_suggestions": self.recovery_suggestions,
            }
        })
    }
}

pub fn classify_error(error: &Error) -> ToolErrorType {
    if let Some(memory_error) = error.downcast_ref::<MemoryError>() {
        return match memory_error {
            MemoryError::PathNotFound(_) => ToolErrorType::ResourceNotFound,
            MemoryError::PathNotObject(_) | MemoryError::EmptyPath => {
                ToolErrorType::InvalidParameters
            }
        };
    }
    if let Some(search_error) = error.downcast_ref::<WebSearchError>() {
        return match search_error {
            WebSearchError::NotConfigured => ToolErrorType::NotConfigured,
            WebSearchError::Network(_) => ToolErrorType::NetworkError,
            WebSearchError::InvalidResponse(_) => ToolErrorType::ExecutionError,
        };
    }
    if let Some(CommandError::EmptyCommand) = error.downcast_ref::<CommandError>() {
        return ToolErrorType::InvalidParameters;
    }
    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::NotFound => return ToolErrorType::ResourceNotFound,
            std::io::ErrorKind::PermissionDenied => return ToolErrorType::PermissionDenied,
            _ => {}
        }
    }

    let error_msg = format!("{error:#}").to_lowercase();
    if error_msg.contains("permission") || error_msg.contains("access denied") {
        ToolErrorType::PermissionDenied
    } else if error_msg.contains("not found") || error_msg.contains("no such file") {
        ToolErrorType::ResourceNotFound
    } else if error_msg.contains("timeout") || error_msg.contains("timed out") {
        ToolErrorType::Timeout
    } else if error_msg.contains("network") || error_msg.contains("connection") {
        ToolErrorType::NetworkError
    } else if error_msg.contains("invalid") || error_msg.contains("malformed") {
        ToolErrorType::InvalidParameters
    } else {
        ToolErrorType::ExecutionError
    }
}

fn generate_recovery_info(error_type: ToolErrorType) -> (bool, Vec<String>) {
    let (recoverable, suggestions): (bool, &[&str]) = match error_type {
        ToolErrorType::InvalidParameters => (
            true,
            &[
                "Check parameter names and types against the tool schema",
                "Ensure required parameters are provided",
            ],
        ),
        ToolErrorType::ToolNotFound => (
            false,
            &["Use one of the tools listed in the function declarations"],
        ),
        ToolErrorType::PermissionDenied => (
            true,
            &["Check file permissions or choose a path the agent can access"],
        ),
        ToolErrorType::ResourceNotFound => (
            true,
            &[
                "Verify the path exists",
                "Use list_directory or get_memory_keys to explore what is available",
            ],
        ),
        ToolErrorType::NetworkError => (
            true,
            &["Retry the operation after a brief delay"],
        ),
        ToolErrorType::Timeout => (
            true,
            &["Break the operation into smaller steps or raise timeoutMs"],
        ),
        ToolErrorType::NotConfigured => (
            false,
            &["Continue without this tool"],
        ),
        ToolErrorType::ExecutionError => (
            false,
            &["Review the error message and try a different approach"],
        ),
    };
    (
        recoverable,
        suggestions.iter().map(|s| (*s).to_string()).collect(),
    )
}
