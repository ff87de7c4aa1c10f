//! Scripted collaborators for driving the conversation loop in tests

#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use nivuus_core::agent::{ConversationLoop, LoopSettings, Session, SessionState};
use nivuus_core::config::NivuusConfig;
use nivuus_core::history::{HistoryCompactor, Summarizer};
use nivuus_core::llm::{
    FinishReason, LLMError, LLMProvider, LLMRequest, LLMResponse, Message, ToolCall,
};
use nivuus_core::tools::{
    CommandExecutor, ConfirmationFlag, FileTools, ToolDispatcher, WebSearchClient,
};
use nivuus_core::ui::{LoopEvent, UserInteraction};
use nivuus_core::utils::JsonStore;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tempfile::TempDir;

pub const SYSTEM_PROMPT: &str = "You are a test agent.";

/// Replays canned model responses and remembers every request
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<LLMResponse, LLMError>>>,
    requests: Mutex<Vec<LLMRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<LLMResponse, LLMError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<LLMRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: LLMRequest) -> Result<LLMResponse, LLMError> {
        self.requests.lock().push(request);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(LLMError::Provider("script exhausted".to_string())))
    }
}

pub fn text_reply(text: &str) -> Result<LLMResponse, LLMError> {
    Ok(LLMResponse {
        content: Some(text.to_string()),
        tool_calls: None,
        usage: None,
        finish_reason: FinishReason::Stop,
    })
}

pub fn tool_reply(calls: &[(&str, &str, &str)]) -> Result<LLMResponse, LLMError> {
    let tool_calls = calls
        .iter()
        .map(|(id, name, args)| {
            ToolCall::function(id.to_string(), name.to_string(), args.to_string())
        })
        .collect();
    Ok(LLMResponse {
        content: None,
        tool_calls: Some(tool_calls),
        usage: None,
        finish_reason: FinishReason::ToolCalls,
    })
}

/// Answers prompts from a queue; an empty queue behaves like a closed terminal
pub struct ScriptedInteraction {
    inputs: Mutex<VecDeque<String>>,
    confirm_answer: bool,
    offered_choices: Mutex<Vec<Vec<String>>>,
    events: Mutex<Vec<String>>,
    watched_flag: Mutex<Option<ConfirmationFlag>>,
    pending_at_confirm: Mutex<Vec<bool>>,
}

impl ScriptedInteraction {
    pub fn new(inputs: &[&str], confirm_answer: bool) -> Arc<Self> {
        Arc::new(Self {
            inputs: Mutex::new(inputs.iter().map(|s| s.to_string()).collect()),
            confirm_answer,
            offered_choices: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            watched_flag: Mutex::new(None),
            pending_at_confirm: Mutex::new(Vec::new()),
        })
    }

    /// Sample `flag` every time a confirmation is requested
    pub fn watch_confirmation(&self, flag: ConfirmationFlag) {
        *self.watched_flag.lock() = Some(flag);
    }

    pub fn pending_at_confirm(&self) -> Vec<bool> {
        self.pending_at_confirm.lock().clone()
    }

    pub fn offered_choices(&self) -> Vec<Vec<String>> {
        self.offered_choices.lock().clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    fn next_input(&self) -> Result<String> {
        self.inputs
            .lock()
            .pop_front()
            .ok_or_else(|| anyhow!("input closed"))
    }
}

#[async_trait]
impl UserInteraction for ScriptedInteraction {
    async fn prompt_text(&self, _label: &str) -> Result<String> {
        self.next_input()
    }

    async fn prompt_choice(&self, _label: &str, options: &[String]) -> Result<String> {
        self.offered_choices.lock().push(options.to_vec());
        self.next_input()
    }

    async fn confirm(&self, _label: &str) -> Result<bool> {
        if let Some(flag) = self.watched_flag.lock().as_ref() {
            self.pending_at_confirm.lock().push(flag.is_pending());
        }
        Ok(self.confirm_answer)
    }

    fn notify(&self, event: LoopEvent<'_>) {
        self.events.lock().push(format!("{event:?}"));
    }
}

/// Deterministic summary so compaction never touches the scripted provider
pub struct FixedSummarizer;

#[async_trait]
impl Summarizer for FixedSummarizer {
    async fn summarize(&self, messages: &[Message]) -> Result<String> {
        Ok(format!("{} messages", messages.len()))
    }
}

/// Defaults with storage in `dir` and no retry delay
pub fn test_config(dir: &TempDir) -> NivuusConfig {
    let mut config = NivuusConfig::default();
    config.storage.data_dir = Some(dir.path().to_path_buf());
    config.agent.retry_backoff_ms = 0;
    config
}

pub fn session_with(config: &NivuusConfig, transcript: Vec<Message>) -> Session {
    let store = JsonStore::new(config.storage.history_path(), config.storage.memory_path());
    let state = SessionState {
        transcript,
        memory: nivuus_core::MemoryStore::new(config.memory.max_action_log_entries),
    };
    Session::new(state, store, config.memory.write_legacy_mirrors)
}

pub fn build_dispatcher(
    config: &NivuusConfig,
    session: &Session,
    interaction: Arc<dyn UserInteraction>,
) -> ToolDispatcher {
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
    ToolDispatcher::new(
        session.clone(),
        interaction,
        commands,
        files,
        WebSearchClient::new(&config.web_search),
        config.tools.clone(),
    )
}

pub fn build_loop(
    config: &NivuusConfig,
    session: Session,
    provider: Arc<ScriptedProvider>,
    interaction: Arc<ScriptedInteraction>,
) -> ConversationLoop {
    let interaction: Arc<dyn UserInteraction> = interaction;
    let dispatcher = build_dispatcher(config, &session, Arc::clone(&interaction));
    let compactor = HistoryCompactor::new(
        Arc::new(FixedSummarizer),
        config.history.compaction_window,
        SYSTEM_PROMPT.to_string(),
    );

    ConversationLoop::new(
        session,
        provider,
        dispatcher,
        compactor,
        interaction,
        LoopSettings::from_config(config),
        SYSTEM_PROMPT,
    )
}
