use anyhow::{Context, Result};
use nivuus_core::config::NivuusConfig;
use nivuus_core::memory::{MemoryPath, MemoryStore};
use nivuus_core::utils::{JsonStore, StorageKey};
use serde_json::Value;

/// Handle the show-memory command
pub fn handle_show_memory_command(config: &NivuusConfig, path: Option<&str>) -> Result<()> {
    let store = JsonStore::new(config.storage.history_path(), config.storage.memory_path());
    let document: Value = store.load(StorageKey::Memory, Value::Null);
    let memory = MemoryStore::from_document(document, config.memory.max_action_log_entries);

    let rendered = render_memory(&memory, path)?;
    println!("{rendered}");
    Ok(())
}

fn render_memory(memory: &MemoryStore, path: Option<&str>) -> Result<String> {
    let value = match path {
        Some(raw) if !MemoryPath::parse(raw).is_root() => memory
            .get_value(raw)
            .with_context(|| format!("Cannot show memory path '{raw}'"))?
            .clone(),
        _ => memory.to_document(false),
    };
    serde_json::to_string_pretty(&value).context("Failed to render memory as JSON")
}
