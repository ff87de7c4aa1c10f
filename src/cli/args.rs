//! CLI argument parsing

use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

/// Autonomous system administration agent driven by an OpenAI-compatible model
#[derive(Parser, Debug)]
#[command(
    name = "nivuus",
    version,
    about = "Autonomous system administration agent\n\nThe agent inspects and manages the host through shell commands, file access, web search and a persistent memory, asking before anything with side effects.\n\nQuick Start:\n  export OPENAI_API_KEY=\"sk-...\"\n  nivuus chat"
)]
pub struct Cli {
    /// Configuration file (default: nivuus.toml in the workspace, then .nivuus/, then the data dir)
    #[arg(long, global = true, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Workspace directory used to look up nivuus.toml
    #[arg(long, global = true, value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub workspace: Option<PathBuf>,

    /// API key, overrides the environment variable named in the config
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Model ID, overrides `[agent].model`
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Log filter for diagnostics on stderr (e.g. `info`, `nivuus_core=debug`)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Interactive session with the agent (default)
    Chat,

    /// Rewrite a legacy flat memory file into the hierarchical layout, keeping a backup
    MigrateMemory,

    /// Write a configuration file with every default spelled out
    InitConfig {
        /// Destination (default: ./nivuus.toml)
        #[arg(long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the persisted memory, or one subtree of it, as JSON
    ShowMemory {
        /// Memory path such as `system/info` or `logs.actions`
        path: Option<String>,
    },
}
