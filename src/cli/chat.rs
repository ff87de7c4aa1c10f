use anyhow::{Context, Result};
use console::style;
use nivuus_core::agent::{ConversationLoop, ExitReason, Session};
use nivuus_core::config::{NivuusConfig, resolve_api_key};
use nivuus_core::config::api_keys::looks_like_openai_key;
use nivuus_core::llm::create_provider;
use nivuus_core::memory::{MigrationOutcome, migrate_memory_file};
use nivuus_core::prompts::render_system_prompt;
use nivuus_core::ui::{ConsoleInteraction, UserInteraction};
use std::sync::Arc;
use tracing::{info, warn};

/// Handle the chat command. The session is created by the caller so that
/// the panic hook and signal handlers can flush it.
pub async fn handle_chat_command(
    config: &NivuusConfig,
    session: Session,
    api_key: Option<&str>,
) -> Result<ExitReason> {
    let (key, source) = resolve_api_key(api_key, &config.agent)?;
    if !looks_like_openai_key(&key) {
        warn!("API key does not look like an OpenAI key; continuing for compatible gateways");
    }
    info!(?source, provider = %config.agent.provider, model = %config.agent.model, "starting chat");

    let provider = create_provider(&config.agent, key).context("Failed to create LLM provider")?;
    let interaction: Arc<dyn UserInteraction> = Arc::new(ConsoleInteraction::new());
    let system_prompt = render_system_prompt(&config.agent.locale);

    println!(
        "{} {}",
        style("Nivuus agent").cyan().bold(),
        style(format!("({} via {})", config.agent.model, config.agent.provider)).dim()
    );
    println!(
        "{}\n",
        style("Type 'quit' or 'exit' to leave. Empty input continues the current task.").dim()
    );

    let mut conversation =
        ConversationLoop::from_config(config, session, provider, interaction, &system_prompt);
    Ok(conversation.run().await)
}

/// Upgrade a legacy memory file before the session reads it
pub fn migrate_before_start(config: &NivuusConfig) {
    let path = config.storage.memory_path();
    match migrate_memory_file(&path) {
        Ok(MigrationOutcome::Migrated { backup }) => {
            println!(
                "{} memory file upgraded, original kept at {}",
                style("Note:").yellow().bold(),
                backup.display()
            );
        }
        Ok(_) => {}
        Err(err) => warn!("Memory migration skipped: {err:#}"),
    }
}
