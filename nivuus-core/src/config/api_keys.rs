//! API key lookup: explicit flag, then environment (including `.env`), then the config file.

use crate::config::core::AgentConfig;
use anyhow::{Result, bail};
use std::env;
use tracing::{debug, warn};

/// Where the resolved key came from, for the startup banner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeySource {
    CommandLine,
    Environment,
    ConfigFile,
}

/// Load environment variables from a `.env` file in the current directory, if any
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded environment from .env"),
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to load .env file: {e}"),
    }
}

/// Resolve the API key for the configured provider
pub fn resolve_api_key(
    cli_key: Option<&str>,
    agent: &AgentConfig,
) -> Result<(String, ApiKeySource)> {
    if let Some(key) = cli_key.map(str::trim).filter(|k| !k.is_empty()) {
        return Ok((key.to_string(), ApiKeySource::CommandLine));
    }

    if let Ok(key) = env::var(&agent.api_key_env)
        && !key.trim().is_empty()
    {
        return Ok((key.trim().to_string(), ApiKeySource::Environment));
    }

    if let Some(key) = agent.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        return Ok((key.to_string(), ApiKeySource::ConfigFile));
    }

    bail!(
        "No API key configured. Set {} in your environment, pass --api-key, or add agent.api_key to nivuus.toml",
        agent.api_key_env
    )
}

/// OpenAI keys start with `sk-`; other gateways differ, so this only warns
pub fn looks_like_openai_key(key: &str) -> bool {
    key.starts_with("sk-")
}
