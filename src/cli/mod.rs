//! Command-line interface: argument definitions and one handler per subcommand

pub mod args;
pub mod chat;
pub mod init_config;
pub mod migrate;
pub mod show_memory;

pub use args::{Cli, Commands};
pub use chat::handle_chat_command;
pub use init_config::handle_init_config_command;
pub use migrate::handle_migrate_memory_command;
pub use show_memory::handle_show_memory_command;

use anyhow::{Context, Result};
use nivuus_core::config::{ConfigManager, NivuusConfig};
use std::path::PathBuf;

/// Resolve the workspace and load the configuration, applying CLI overrides
pub fn load_config(args: &Cli) -> Result<NivuusConfig> {
    let manager = match &args.config {
        Some(path) => ConfigManager::load_from_file(path)?,
        None => ConfigManager::load_from_workspace(workspace_dir(args)?)?,
    };
    if let Some(path) = manager.config_path() {
        tracing::debug!(path = %path.display(), "configuration loaded");
    }

    let mut config = manager.into_config();
    if let Some(model) = args.model.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        config.agent.model = model.to_string();
    }
    Ok(config)
}

pub fn workspace_dir(args: &Cli) -> Result<PathBuf> {
    match &args.workspace {
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir().context("Cannot determine the current directory"),
    }
}
