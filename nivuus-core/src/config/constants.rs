/// Built-in defaults used when `nivuus.toml` leaves a value unset
pub mod defaults {
    pub const DEFAULT_PROVIDER: &str = "openai";
    pub const DEFAULT_MODEL: &str = "gpt-4o";
    pub const DEFAULT_SUMMARY_MODEL: &str = "gpt-4o-mini";
    pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
    pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
    pub const DEFAULT_INSTRUCTION: &str = "Continue.";
    pub const DEFAULT_LOCALE: &str = "en";
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
    pub const DEFAULT_MAX_MODEL_RETRIES: u32 = 3;
    pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 1_000;
    pub const MAX_RETRY_BACKOFF_MS: u64 = 30_000;

    /// Maximum number of messages kept in the conversation history
    pub const MAX_HISTORY_LENGTH: usize = 100;
    /// Oldest non-system messages folded into one summary per compaction pass
    pub const COMPACTION_WINDOW: usize = 10;
    pub const SUMMARY_MAX_TOKENS: u32 = 500;

    pub const MAX_ACTION_LOG_ENTRIES: usize = 30;
    pub const SUMMARY_RECENT_ACTIONS: usize = 5;

    pub const COMMAND_TIMEOUT_MS: u64 = 120_000;
    pub const MAX_COMMAND_OUTPUT_LENGTH: usize = 10_000;
    pub const DEFAULT_SHELL: &str = "sh";
    pub const STDERR_TAIL_CHARS: usize = 500;

    pub const MAX_DIRECT_READ_SIZE: usize = 100 * 1024;
    pub const MAX_FAILURE_CHARS: usize = 300;
    pub const MAX_FEEDBACK_LEN: usize = 40_000;

    pub const MAX_SEARCH_RESULTS: usize = 5;

    pub const DEFAULT_LOG_LEVEL: &str = "warn";
}

/// Tool names exposed to the model
pub mod tools {
    pub const RUN_BASH_COMMAND: &str = "run_bash_command";
    pub const READ_FILE: &str = "read_file";
    pub const WRITE_FILE: &str = "write_file";
    pub const LIST_DIRECTORY: &str = "list_directory";
    pub const WEB_SEARCH: &str = "web_search";
    pub const GET_MEMORY_KEYS: &str = "get_memory_keys";
    pub const GET_MEMORY_VALUE: &str = "get_memory_value";
    pub const SET_MEMORY_VALUE: &str = "set_memory_value";
}

/// Reserved locations inside the memory document
pub mod memory_paths {
    pub const LOGS: &str = "logs";
    pub const ACTIONS: &str = "actions";
    pub const SYSTEM: &str = "system";
    pub const INFO: &str = "info";
    pub const NOTES: &str = "notes";

    pub const LEGACY_ACTION_LOG: &str = "action_log";
    pub const LEGACY_SYSTEM_INFO: &str = "system_info";

    /// Paths that address the document root
    pub const ROOT_SENTINELS: &[&str] = &["", "/", "root"];
}

/// Action log `actionType` values recorded by the agent itself
pub mod action_types {
    pub const COMMAND: &str = "Command";
    pub const FILE_WRITE: &str = "File Write";
    pub const TOOL_PREFIX: &str = "Tool: ";
    pub const TOOL_CALL_DECISION: &str = "Tool Call Decision";
    pub const SYSTEM: &str = "System";
    pub const NETWORK: &str = "Network";
    pub const API_CALL: &str = "API Call";
}

/// On-disk layout
pub mod files {
    pub const CONFIG_FILE_NAME: &str = "nivuus.toml";
    pub const WORKSPACE_CONFIG_DIR: &str = ".nivuus";
    pub const APP_DIR_NAME: &str = "nivuus-agent";
    pub const HISTORY_FILE: &str = "conversation_history.json";
    pub const MEMORY_FILE: &str = "agent_memory.json";
    pub const BACKUP_INFIX: &str = ".backup-";
}

/// Fixed user-facing texts that end up in the transcript or the action log
pub mod messages {
    pub const SUMMARY_PREFIX: &str = "Summary of earlier conversation: ";
    pub const FALLBACK_SUMMARY_PREFIX: &str = "Summarized history: ";
    pub const MEMORY_REMINDER: &str =
        "Reminder of your persistent memory (not visible to the user, use memory tools to update it):";
    pub const EXECUTION_CANCELLED: &str = "Execution cancelled by user.";
    pub const WRITE_CANCELLED: &str = "File write cancelled by user.";
    pub const NO_OUTPUT_SUCCESS: &str = "Command executed successfully (no output).";
    pub const STDOUT_LABEL: &str = "STDOUT:";
    pub const STDERR_LABEL: &str = "STDERR:";
    pub const QUIT_COMMANDS: &[&str] = &["quit", "exit"];
}
