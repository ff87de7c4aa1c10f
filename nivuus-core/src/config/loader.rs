use crate::config::constants::files;
use crate::config::core::{
    AgentConfig, CommandsConfig, HistoryConfig, LoggingConfig, MemoryConfig, StorageConfig,
    ToolsConfig, WebSearchConfig, default_data_dir,
};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure for Nivuus
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NivuusConfig {
    /// Model and provider settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Transcript size budget
    #[serde(default)]
    pub history: HistoryConfig,

    /// Memory document settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Shell command execution
    #[serde(default)]
    pub commands: CommandsConfig,

    /// Direct file tools and tool result bounds
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub web_search: WebSearchConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NivuusConfig {
    /// Reject settings that would break the transcript or memory invariants
    pub fn validate(&self) -> Result<()> {
        let min_history = self.history.compaction_window + 2;
        if self.history.compaction_window == 0 {
            bail!("history.compaction_window must be at least 1");
        }
        if self.history.max_length < min_history {
            bail!(
                "history.max_length must be at least {min_history} (compaction_window + 2), got {}",
                self.history.max_length
            );
        }
        if self.memory.max_action_log_entries == 0 {
            bail!("memory.max_action_log_entries must be greater than zero");
        }
        if self.commands.timeout_ms == 0 {
            bail!("commands.timeout_ms must be greater than zero");
        }
        if self.commands.max_output_chars == 0 {
            bail!("commands.max_output_chars must be greater than zero");
        }
        if self.commands.shell.trim().is_empty() {
            bail!("commands.shell cannot be empty");
        }
        Ok(())
    }

    /// Write the default configuration as TOML
    pub fn create_sample_config<P: AsRef<Path>>(output: P, force: bool) -> Result<()> {
        let output = output.as_ref();
        if output.exists() && !force {
            bail!(
                "Config file already exists: {} (use --force to overwrite)",
                output.display()
            );
        }

        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let config_content = toml::to_string_pretty(&NivuusConfig::default())
            .context("Failed to serialize default configuration")?;
        fs::write(output, config_content)
            .with_context(|| format!("Failed to write config file: {}", output.display()))?;

        Ok(())
    }
}

/// Configuration manager for loading and validating configurations
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: NivuusConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration from the default locations
    pub fn load() -> Result<Self> {
        Self::load_from_workspace(std::env::current_dir()?)
    }

    /// Load configuration from a specific workspace
    pub fn load_from_workspace(workspace: impl AsRef<Path>) -> Result<Self> {
        let workspace = workspace.as_ref();

        let candidates = [
            workspace.join(files::CONFIG_FILE_NAME),
            workspace
                .join(files::WORKSPACE_CONFIG_DIR)
                .join(files::CONFIG_FILE_NAME),
            default_data_dir().join(files::CONFIG_FILE_NAME),
        ];

        for candidate in candidates {
            if candidate.exists() {
                return Self::load_from_file(&candidate);
            }
        }

        Ok(Self {
            config: NivuusConfig::default(),
            config_path: None,
        })
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: NivuusConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        Ok(Self {
            config,
            config_path: Some(path.to_path_buf()),
        })
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &NivuusConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut NivuusConfig {
        &mut self.config
    }

    pub fn into_config(self) -> NivuusConfig {
        self.config
    }

    /// Get the configuration file path (if loaded from file)
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
