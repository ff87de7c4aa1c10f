use crate::config::constants::{defaults, files};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Model and provider settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentConfig {
    /// Provider adapter to use (only OpenAI-compatible endpoints are supported)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model used for the conversation
    #[serde(default = "default_model")]
    pub model: String,

    /// Cheaper model used to summarize compacted history
    #[serde(default = "default_summary_model")]
    pub summary_model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// API key stored in the config file (environment takes precedence)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Instruction sent when the user submits an empty line
    #[serde(default = "default_instruction")]
    pub default_instruction: String,

    /// Language tag injected into the system prompt
    #[serde(default = "default_locale")]
    pub locale: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Consecutive failed model calls before giving the turn back to the user
    #[serde(default = "default_max_model_retries")]
    pub max_model_retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_provider() -> String {
    defaults::DEFAULT_PROVIDER.to_string()
}
fn default_model() -> String {
    defaults::DEFAULT_MODEL.to_string()
}
fn default_summary_model() -> String {
    defaults::DEFAULT_SUMMARY_MODEL.to_string()
}
fn default_api_key_env() -> String {
    defaults::DEFAULT_API_KEY_ENV.to_string()
}
fn default_base_url() -> String {
    defaults::DEFAULT_BASE_URL.to_string()
}
fn default_instruction() -> String {
    defaults::DEFAULT_INSTRUCTION.to_string()
}
fn default_locale() -> String {
    defaults::DEFAULT_LOCALE.to_string()
}
fn default_request_timeout_secs() -> u64 {
    defaults::DEFAULT_REQUEST_TIMEOUT_SECS
}
fn default_max_model_retries() -> u32 {
    defaults::DEFAULT_MAX_MODEL_RETRIES
}
fn default_retry_backoff_ms() -> u64 {
    defaults::DEFAULT_RETRY_BACKOFF_MS
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            summary_model: default_summary_model(),
            api_key_env: default_api_key_env(),
            api_key: None,
            base_url: default_base_url(),
            default_instruction: default_instruction(),
            locale: default_locale(),
            request_timeout_secs: default_request_timeout_secs(),
            max_model_retries: default_max_model_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Transcript size budget
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryConfig {
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    #[serde(default = "default_compaction_window")]
    pub compaction_window: usize,

    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: u32,
}

fn default_max_length() -> usize {
    defaults::MAX_HISTORY_LENGTH
}
fn default_compaction_window() -> usize {
    defaults::COMPACTION_WINDOW
}
fn default_summary_max_tokens() -> u32 {
    defaults::SUMMARY_MAX_TOKENS
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            compaction_window: default_compaction_window(),
            summary_max_tokens: default_summary_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemoryConfig {
    /// Cap on `logs.actions`; oldest entries are evicted first
    #[serde(default = "default_max_action_log_entries")]
    pub max_action_log_entries: usize,

    /// Number of recent actions shown in the per-request memory summary
    #[serde(default = "default_summary_recent_actions")]
    pub summary_recent_actions: usize,

    /// Also write the flat `action_log` / `system_info` fields for old readers
    #[serde(default)]
    pub write_legacy_mirrors: bool,
}

fn default_max_action_log_entries() -> usize {
    defaults::MAX_ACTION_LOG_ENTRIES
}
fn default_summary_recent_actions() -> usize {
    defaults::SUMMARY_RECENT_ACTIONS
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_action_log_entries: default_max_action_log_entries(),
            summary_recent_actions: default_summary_recent_actions(),
            write_legacy_mirrors: false,
        }
    }
}

/// Shell command execution limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandsConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,

    #[serde(default = "default_shell")]
    pub shell: String,
}

fn default_timeout_ms() -> u64 {
    defaults::COMMAND_TIMEOUT_MS
}
fn default_max_output_chars() -> usize {
    defaults::MAX_COMMAND_OUTPUT_LENGTH
}
fn default_shell() -> String {
    defaults::DEFAULT_SHELL.to_string()
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_output_chars: default_max_output_chars(),
            shell: default_shell(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Files larger than this are cut when read directly
    #[serde(default = "default_max_read_bytes")]
    pub max_read_bytes: usize,

    /// Upper bound on the failure text returned to the model
    #[serde(default = "default_max_failure_chars")]
    pub max_failure_chars: usize,

    /// Upper bound on a successful tool payload
    #[serde(default = "default_max_result_chars")]
    pub max_result_chars: usize,
}

fn default_max_read_bytes() -> usize {
    defaults::MAX_DIRECT_READ_SIZE
}
fn default_max_failure_chars() -> usize {
    defaults::MAX_FAILURE_CHARS
}
fn default_max_result_chars() -> usize {
    defaults::MAX_FEEDBACK_LEN
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_read_bytes: default_max_read_bytes(),
            max_failure_chars: default_max_failure_chars(),
            max_result_chars: default_max_result_chars(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebSearchConfig {
    /// SearxNG-compatible endpoint returning `{"results": [...]}` for `?q=...&format=json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_results() -> usize {
    defaults::MAX_SEARCH_RESULTS
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            max_results: default_max_results(),
        }
    }
}

/// Where the transcript and memory documents live
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Defaults to `~/.config/nivuus-agent`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_history_file")]
    pub history_file: String,

    #[serde(default = "default_memory_file")]
    pub memory_file: String,

    /// Persist the session every time the agent waits for the user
    #[serde(default = "default_true")]
    pub autosave: bool,
}

fn default_history_file() -> String {
    files::HISTORY_FILE.to_string()
}
fn default_memory_file() -> String {
    files::MEMORY_FILE.to_string()
}
fn default_true() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            history_file: default_history_file(),
            memory_file: default_memory_file(),
            autosave: default_true(),
        }
    }
}

impl StorageConfig {
    /// Resolve the data directory, falling back to the per-user config dir
    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        default_data_dir()
    }

    pub fn history_path(&self) -> PathBuf {
        self.resolve_data_dir().join(&self.history_file)
    }

    pub fn memory_path(&self) -> PathBuf {
        self.resolve_data_dir().join(&self.memory_file)
    }
}

/// `~/.config/nivuus-agent`, or `./.nivuus` when no home directory is known
pub fn default_data_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".config").join(files::APP_DIR_NAME),
        None => PathBuf::from(files::WORKSPACE_CONFIG_DIR),
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    defaults::DEFAULT_LOG_LEVEL.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
