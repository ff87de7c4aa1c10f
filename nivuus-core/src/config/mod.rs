//! Configuration: named constants, the `nivuus.toml` schema and its loader.

pub mod api_keys;
pub mod constants;
pub mod core;
pub mod loader;

pub use api_keys::{ApiKeySource, load_dotenv, resolve_api_key};
pub use self::core::{
    AgentConfig, CommandsConfig, HistoryConfig, LoggingConfig, MemoryConfig, StorageConfig,
    ToolsConfig, WebSearchConfig,
};
pub use loader::{ConfigManager, NivuusConfig};
