//! Turn-taking state machine between the user, the model and the tools

use super::choices::parse_numbered_choices;
use super::memory_summary::build_memory_summary;
use super::session::Session;
use crate::config::constants::{action_types, defaults, messages};
use crate::config::loader::NivuusConfig;
use crate::history::{HistoryCompactor, LLMSummarizer, sanitize};
use crate::llm::provider::{LLMError, LLMProvider, LLMRequest, Message, MessageRole};
use crate::memory::ActionStatus;
use crate::tools::{CommandExecutor, FileTools, ToolDispatcher, WebSearchClient};
use crate::ui::{LoopEvent, UserInteraction};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const USER_PROMPT: &str = "You";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingUser,
    CallingModel,
    ExecutingTools,
    Terminated,
}

/// Why the loop stopped
#[derive(Debug, Clone, PartialEq)]
pub enum ExitReason {
    UserQuit,
    /// The input channel closed (EOF, terminal gone)
    InputClosed,
    Fatal(LLMError),
}

impl ExitReason {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExitReason::Fatal(_))
    }
}

/// Knobs of the loop itself, taken from `[agent]`, `[history]`, `[memory]` and `[storage]`
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub model: String,
    pub default_instruction: String,
    pub max_history: usize,
    pub max_model_retries: u32,
    pub retry_backoff_ms: u64,
    pub summary_recent_actions: usize,
    pub autosave: bool,
}

impl LoopSettings {
    pub fn from_config(config: &NivuusConfig) -> Self {
        Self {
            model: config.agent.model.clone(),
            default_instruction: config.agent.default_instruction.clone(),
            max_history: config.history.max_length,
            max_model_retries: config.agent.max_model_retries,
            retry_backoff_ms: config.agent.retry_backoff_ms,
            summary_recent_actions: config.memory.summary_recent_actions,
            autosave: config.storage.autosave,
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&NivuusConfig::default())
    }
}

pub struct ConversationLoop {
    session: Session,
    provider: Arc<dyn LLMProvider>,
    dispatcher: ToolDispatcher,
    compactor: HistoryCompactor,
    interaction: Arc<dyn UserInteraction>,
    settings: LoopSettings,
    state: LoopState,
    failed_attempts: u32,
    exit_reason: Option<ExitReason>,
}

impl ConversationLoop {
    /// Take over the session transcript and pick the initial state.
    pub fn new(
        session: Session,
        provider: Arc<dyn LLMProvider>,
        dispatcher: ToolDispatcher,
        compactor: HistoryCompactor,
        interaction: Arc<dyn UserInteraction>,
        settings: LoopSettings,
        system_prompt: &str,
    ) -> Self {
        let prepared = prepare_transcript(session.transcript(), system_prompt);
        let state = initial_state(&prepared);
        session.replace_transcript(prepared);
        debug!(?state, "conversation loop ready");

        Self {
            session,
            provider,
            dispatcher,
            compactor,
            interaction,
            settings,
            state,
            failed_attempts: 0,
            exit_reason: None,
        }
    }

    /// Wire the tools, summarizer and compactor described by `config`
    pub fn from_config(
        config: &NivuusConfig,
        session: Session,
        provider: Arc<dyn LLMProvider>,
        interaction: Arc<dyn UserInteraction>,
        system_prompt: &str,
    ) -> Self {
        let commands = CommandExecutor::new(
            session.clone(),
            Arc::clone(&interaction),
            config.commands.clone(),
        );
        let files = FileTools::new(
            session.clone(),
            Arc::clone(&interaction),
            config.tools.max_read_bytes,
        );
        let web = WebSearchClient::new(&config.web_search);
        let dispatcher = ToolDispatcher::new(
            session.clone(),
            Arc::clone(&interaction),
            commands,
            files,
            web,
            config.tools.clone(),
        );
        let summarizer = Arc::new(LLMSummarizer::new(
            Arc::clone(&provider),
            config.agent.summary_model.clone(),
            config.history.summary_max_tokens,
            config.agent.locale.clone(),
        ));
        let compactor = HistoryCompactor::new(
            summarizer,
            config.history.compaction_window,
            system_prompt.to_string(),
        );

        Self::new(
            session,
            provider,
            dispatcher,
            compactor,
            interaction,
            LoopSettings::from_config(config),
            system_prompt,
        )
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn exit_reason(&self) -> Option<&ExitReason> {
        self.exit_reason.as_ref()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run until the loop terminates, then persist the session.
    pub async fn run(&mut self) -> ExitReason {
        while self.state != LoopState::Terminated {
            self.step().await;
        }

        if let Err(err) = self.session.save() {
            error!("Final save failed: {err:#}");
            self.interaction
                .notify(LoopEvent::Diagnostic("Could not save the conversation on exit."));
        }

        self.exit_reason.clone().unwrap_or(ExitReason::UserQuit)
    }

    /// Perform exactly one state transition and return the new state
    pub async fn step(&mut self) -> LoopState {
        let next = match self.state {
            LoopState::AwaitingUser => self.await_user().await,
            LoopState::CallingModel => self.call_model().await,
            LoopState::ExecutingTools => self.execute_tools().await,
            LoopState::Terminated => LoopState::Terminated,
        };
        debug!(from = ?self.state, to = ?next, "loop transition");
        self.state = next;
        next
    }

    async fn await_user(&mut self) -> LoopState {
        if self.settings.autosave
            && let Err(err) = self.session.save()
        {
            warn!("Autosave failed: {err:#}");
        }

        let choices = self
            .session
            .with_state(|state| {
                state
                    .transcript
                    .last()
                    .filter(|message| message.role == MessageRole::Assistant)
                    .map(|message| message.text().to_string())
            })
            .and_then(|text| parse_numbered_choices(&text));

        let input = match choices {
            Some(options) => self.interaction.prompt_choice(USER_PROMPT, &options).await,
            None => self.interaction.prompt_text(USER_PROMPT).await,
        };
        let input = match input {
            Ok(input) => input,
            Err(err) => {
                info!("Input closed: {err:#}");
                return self.terminate(ExitReason::InputClosed);
            }
        };

        let trimmed = input.trim();
        if messages::QUIT_COMMANDS
            .iter()
            .any(|quit| trimmed.eq_ignore_ascii_case(quit))
        {
            return self.terminate(ExitReason::UserQuit);
        }

        let content = if trimmed.is_empty() {
            self.settings.default_instruction.clone()
        } else {
            input
        };
        self.session.push_message(Message::user(content));
        self.failed_attempts = 0;
        LoopState::CallingModel
    }

    async fn call_model(&mut self) -> LoopState {
        let sanitized = sanitize(&self.session.transcript());
        let compacted = self
            .compactor
            .compact(sanitized, self.settings.max_history)
            .await;
        self.session.replace_transcript(compacted.clone());

        let mut outbound = compacted;
        let recent = self.settings.summary_recent_actions;
        if let Some(summary) = self
            .session
            .with_memory(|memory| build_memory_summary(memory, recent))
        {
            outbound.insert(1.min(outbound.len()), summary);
        }

        let request = LLMRequest::new(self.settings.model.clone(), outbound)
            .with_tools(self.dispatcher.tool_definitions());

        self.interaction.notify(LoopEvent::ModelCallStarted);
        let started = std::time::Instant::now();
        let result = self.provider.generate(request).await;
        self.interaction.notify(LoopEvent::ModelCallFinished);
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "model call finished"
        );

        let response = match result {
            Ok(response) => response,
            Err(err) => return self.recover_from_model_error(err, action_types::SYSTEM).await,
        };

        let reply = response.into_message();
        if !reply.has_tool_calls() && reply.text().trim().is_empty() {
            let err = LLMError::Provider("Empty response from model".to_string());
            return self
                .recover_from_model_error(err, action_types::API_CALL)
                .await;
        }

        self.failed_attempts = 0;
        if !reply.text().trim().is_empty() {
            self.interaction.notify(LoopEvent::Assistant(reply.text()));
        }

        let next = if reply.has_tool_calls() {
            let names = reply
                .tool_calls()
                .iter()
                .map(|call| call.function.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            self.session.record_action(
                action_types::TOOL_CALL_DECISION,
                &names,
                ActionStatus::Success,
                None,
            );
            LoopState::ExecutingTools
        } else {
            LoopState::AwaitingUser
        };
        self.session.push_message(reply);
        next
    }

    async fn execute_tools(&mut self) -> LoopState {
        let calls = self.session.with_state(|state| {
            state
                .transcript
                .last()
                .filter(|message| message.is_pending_tool_request())
                .map(|message| message.tool_calls().to_vec())
        });
        let Some(calls) = calls else {
            warn!("No pending tool calls to execute");
            return LoopState::AwaitingUser;
        };

        for call in calls {
            let result = self
                .dispatcher
                .dispatch(&call.function.name, &call.function.arguments)
                .await;
            self.session.push_message(result.into_message(call.id));
        }
        LoopState::CallingModel
    }

    async fn recover_from_model_error(&mut self, err: LLMError, action_type: &str) -> LoopState {
        let action_type = if matches!(err, LLMError::Network(_)) {
            action_types::NETWORK
        } else {
            action_type
        };
        let target = format!("Model API Error: {}", err.kind());
        let detail = err.to_string();
        self.session
            .record_action(action_type, &target, ActionStatus::Failure, Some(&detail));

        if err.is_fatal() {
            error!("Fatal model error: {detail}");
            self.interaction.notify(LoopEvent::Fatal(&detail));
            return self.terminate(ExitReason::Fatal(err));
        }

        self.failed_attempts += 1;
        warn!(attempt = self.failed_attempts, "Model call failed: {detail}");

        if self.failed_attempts >= self.settings.max_model_retries.max(1) {
            self.session
                .with_state(|state| rollback_to_last_user(&mut state.transcript, false));
            let notice = format!(
                "Model call failed {} times ({detail}). Your last message was discarded, please try again.",
                self.failed_attempts
            );
            self.interaction.notify(LoopEvent::Diagnostic(&notice));
            self.failed_attempts = 0;
            return LoopState::AwaitingUser;
        }

        self.session
            .with_state(|state| rollback_to_last_user(&mut state.transcript, true));
        let delay = retry_delay(self.settings.retry_backoff_ms, self.failed_attempts);
        self.interaction.notify(LoopEvent::Diagnostic(&detail));
        self.interaction.notify(LoopEvent::Retrying {
            attempt: self.failed_attempts,
            delay,
        });
        tokio::time::sleep(delay).await;
        LoopState::CallingModel
    }

    fn terminate(&mut self, reason: ExitReason) -> LoopState {
        info!(?reason, "conversation loop terminating");
        self.exit_reason = Some(reason);
        LoopState::Terminated
    }
}

/// Drop a dangling tool request and make sure message 0 is the current system prompt
pub fn prepare_transcript(mut transcript: Vec<Message>, system_prompt: &str) -> Vec<Message> {
    while transcript
        .last()
        .is_some_and(Message::is_pending_tool_request)
    {
        transcript.pop();
    }

    match transcript.first_mut() {
        Some(first) if first.role == MessageRole::System => {
            first.content = Some(system_prompt.to_string());
        }
        _ => transcript.insert(0, Message::system(system_prompt.to_string())),
    }
    transcript
}

/// A fresh conversation lets the model start on its own
pub fn initial_state(transcript: &[Message]) -> LoopState {
    if transcript.len() <= 1 {
        LoopState::CallingModel
    } else {
        LoopState::AwaitingUser
    }
}

/// Cut the transcript after the last user message, or before it when `keep_user` is false.
/// Without any user message only the system prompt survives.
pub fn rollback_to_last_user(transcript: &mut Vec<Message>, keep_user: bool) {
    match transcript
        .iter()
        .rposition(|message| message.role == MessageRole::User)
    {
        Some(index) => transcript.truncate(if keep_user { index + 1 } else { index }),
        None => {
            let keep = usize::from(transcript.first().is_some_and(Message::is_system_prompt));
            transcript.truncate(keep);
        }
    }
}

/// Exponential backoff, capped
pub fn retry_delay(base_ms: u64, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let millis = base_ms
        .saturating_mul(1u64 << exponent)
        .min(defaults::MAX_RETRY_BACKOFF_MS);
    Duration::from_millis(millis)
}
