//! Tool dispatch: name resolution, argument contracts, confirmation state and
//! bounded results

mod arguments;
mod declarations;
mod error;

pub use arguments::{
    GetMemoryKeysArgs, GetMemoryValueArgs, ListDirectoryArgs, ParamKind, ParamSpec, ParsedCall,
    ReadFileArgs, RunCommandArgs, SetMemoryValueArgs, TOOL_SPECS, ToolInvocation, ToolSpec,
    WebSearchArgs, WriteFileArgs, lookup, parse_call,
};
pub use declarations::build_tool_definitions;
pub use error::{ToolCallError, ToolErrorType, ToolExecutionError, classify_error};

use super::ToolOutput;
use super::command::CommandExecutor;
use super::file_ops::FileTools;
use super::web_search::WebSearchClient;
use crate::agent::session::Session;
use crate::config::constants::action_types;
use crate::config::core::ToolsConfig;
use crate::llm::provider::{Message, ToolDefinition};
use crate::memory::ActionStatus;
use crate::ui::{LoopEvent, UserInteraction};
use crate::utils::truncate_chars;
use anyhow::Result;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error};

/// Set while a confirmation-gated tool call is in flight
#[derive(Debug, Clone, Default)]
pub struct ConfirmationFlag(Arc<AtomicBool>);

impl ConfirmationFlag {
    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Raise the flag until the returned guard is dropped
    pub fn raise(&self) -> ConfirmationGuard {
        self.0.store(true, Ordering::SeqCst);
        ConfirmationGuard(Arc::clone(&self.0))
    }
}

#[must_use = "the flag is cleared when the guard is dropped"]
pub struct ConfirmationGuard(Arc<AtomicBool>);

impl Drop for ConfirmationGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// What one tool call produced for the transcript
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub tool_name: String,
    pub status: ActionStatus,
    pub content: String,
}

impl ToolResult {
    pub fn into_message(self, tool_call_id: String) -> Message {
        Message::tool_response(tool_call_id, self.tool_name, self.content)
    }
}

pub struct ToolDispatcher {
    session: Session,
    interaction: Arc<dyn UserInteraction>,
    commands: CommandExecutor,
    files: FileTools,
    web: WebSearchClient,
    confirmation: ConfirmationFlag,
    limits: ToolsConfig,
}

impl ToolDispatcher {
    pub fn new(
        session: Session,
        interaction: Arc<dyn UserInteraction>,
        commands: CommandExecutor,
        files: FileTools,
        web: WebSearchClient,
        limits: ToolsConfig,
    ) -> Self {
        let confirmation = session.confirmation_flag();
        Self {
            session,
            interaction,
            commands,
            files,
            web,
            confirmation,
            limits,
        }
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        build_tool_definitions(self.web.is_configured())
    }

    pub fn confirmation_flag(&self) -> ConfirmationFlag {
        self.confirmation.clone()
    }

    /// Run one tool call. Never fails: every problem becomes a failure result.
    pub async fn dispatch(&self, tool_name: &str, raw_arguments: &str) -> ToolResult {
        let action_type = format!("{}{tool_name}", action_types::TOOL_PREFIX);
        let parsed = parse_call(tool_name, raw_arguments);
        let target = match &parsed {
            Ok(call) => call.canonical_arguments.clone(),
            Err(_) => raw_arguments.to_string(),
        };

        self.session
            .record_action(&action_type, &target, ActionStatus::Attempted, None);
        self.interaction.notify(LoopEvent::ToolRequested {
            name: tool_name,
            arguments: &target,
        });

        let outcome = match parsed {
            Err(err) => {
                debug!(tool = tool_name, "rejected tool call: {err}");
                Err(ToolExecutionError::from_call_error(tool_name, &err))
            }
            Ok(call) => {
                let _pending = call
                    .spec
                    .requires_confirmation
                    .then(|| self.confirmation.raise());
                self.invoke(call.invocation).await.map_err(|err| {
                    error!(tool = tool_name, "Tool execution failed: {err:#}");
                    ToolExecutionError::from_error(tool_name, &err)
                })
            }
        };

        let result = match outcome {
            Ok(output) => {
                self.session
                    .record_action(&action_type, &target, output.status, None);
                ToolResult {
                    tool_name: tool_name.to_string(),
                    status: output.status,
                    content: self.bound_result(output.payload.to_string()),
                }
            }
            Err(failure) => {
                let failure = failure.bounded(self.limits.max_failure_chars);
                self.session.record_action(
                    &action_type,
                    &target,
                    ActionStatus::Failure,
                    Some(&failure.message),
                );
                ToolResult {
                    tool_name: tool_name.to_string(),
                    status: ActionStatus::Failure,
                    content: failure.to_json_value().to_string(),
                }
            }
        };

        self.interaction.notify(LoopEvent::ToolFinished {
            name: tool_name,
            success: result.status.is_success(),
        });
        result
    }

    async fn invoke(&self, invocation: ToolInvocation) -> Result<ToolOutput> {
        match invocation {
            ToolInvocation::RunBashCommand(args) => {
                let outcome = self
                    .commands
                    .execute(&args.command, &args.purpose, args.timeout_ms)
                    .await?;
                Ok(ToolOutput::new(
                    outcome.status,
                    json!({
                        "status": outcome.status.as_str(),
                        "exit_code": outcome.exit_code,
                        "output": outcome.report,
                    }),
                ))
            }
            ToolInvocation::WriteFile(args) => {
                self.files.write_file(&args.filepath, &args.content).await
            }
            ToolInvocation::ReadFile(args) => self.files.read_file(&args.filepath).await,
            ToolInvocation::ListDirectory(args) => self.files.list_directory(&args.path).await,
            ToolInvocation::WebSearch(args) => {
                let results = self.web.search(&args.query).await?;
                let status = if results.is_empty() {
                    ActionStatus::SuccessNoResults
                } else {
                    ActionStatus::Success
                };
                Ok(ToolOutput::new(
                    status,
                    json!({ "query": args.query, "results": results }),
                ))
            }
            ToolInvocation::GetMemoryKeys(args) => {
                let path = args.path.unwrap_or_default();
                let keys = self.session.with_memory(|memory| memory.get_keys(&path))?;
                Ok(ToolOutput::success(json!(keys)))
            }
            ToolInvocation::GetMemoryValue(args) => {
                let value = self
                    .session
                    .with_memory(|memory| memory.get_value(&args.path).cloned())?;
                Ok(ToolOutput::success(value))
            }
            ToolInvocation::SetMemoryValue(args) => {
                let ack = self
                    .session
                    .with_memory(|memory| memory.set_value(&args.path, args.value))?;
                Ok(ToolOutput::success(json!(ack)))
            }
        }
    }

    fn bound_result(&self, content: String) -> String {
        let max_chars = self.limits.max_result_chars;
        let total = content.chars().count();
        if total <= max_chars {
            return content;
        }
        format!(
            "{}\n\n[Result truncated, full length was {total} characters]",
            truncate_chars(&content, max_chars)
        )
    }
}
