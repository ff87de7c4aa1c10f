//! One-time rewrite of the legacy flat memory file into the hierarchical shape

use super::MemoryStore;
use crate::config::constants::{files, memory_paths};
use crate::utils::persistence::write_json_atomic;
use anyhow::{Context, Result};
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// File rewritten; the original was copied to `backup`
    Migrated { backup: PathBuf },
    AlreadyCurrent,
    Missing,
}

/// Rewrite `path` in place when it holds the legacy flat shape
pub fn migrate_memory_file(path: &Path) -> Result<MigrationOutcome> {
    if !path.exists() {
        return Ok(MigrationOutcome::Missing);
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read memory file {}", path.display()))?;
    let document: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Memory file {} is not valid JSON", path.display()))?;

    if !MemoryStore::is_legacy_document(&document) {
        return Ok(MigrationOutcome::AlreadyCurrent);
    }

    let backup = backup_path(path, chrono::Utc::now().timestamp_millis());
    std::fs::copy(path, &backup)
        .with_context(|| format!("Failed to back up memory file to {}", backup.display()))?;

    let upgraded = upgrade_legacy_document(document);
    write_json_atomic(path, &upgraded)?;

    info!(
        path = %path.display(),
        backup = %backup.display(),
        "migrated legacy memory file"
    );
    Ok(MigrationOutcome::Migrated { backup })
}

/// `<path>.backup-<millis>`
pub fn backup_path(path: &Path, millis: i64) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!("{}{millis}", files::BACKUP_INFIX));
    PathBuf::from(name)
}

fn upgrade_legacy_document(document: Value) -> Value {
    let Value::Object(mut legacy) = document else {
        return document;
    };

    let actions = legacy
        .remove(memory_paths::LEGACY_ACTION_LOG)
        .filter(Value::is_array)
        .unwrap_or_else(|| json!([]));
    let info = legacy
        .remove(memory_paths::LEGACY_SYSTEM_INFO)
        .filter(|value| !value.is_null())
        .unwrap_or_else(|| json!({}));
    let notes = legacy
        .remove(memory_paths::NOTES)
        .filter(Value::is_string)
        .unwrap_or_else(|| json!(""));

    let mut upgraded = Map::new();
    upgraded.insert(
        memory_paths::LOGS.to_string(),
        single_entry(memory_paths::ACTIONS, actions),
    );
    upgraded.insert(
        memory_paths::SYSTEM.to_string(),
        single_entry(memory_paths::INFO, info),
    );
    upgraded.insert(memory_paths::NOTES.to_string(), notes);
    upgraded.extend(legacy);
    Value::Object(upgraded)
}

fn single_entry(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn legacy_file_is_rewritten_with_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agent_memory.json");
        let legacy = json!({
            "action_log": [{
                "timestamp": "2024-05-01T10:20:30Z",
                "actionType": "Command",
                "target": "ls",
                "status": "Success"
            }],
            "system_info": {"os": "debian"},
            "notes": "keep",
            "projects": {"web": "nginx"}
        });
        std::fs::write(&path, serde_json::to_string(&legacy).unwrap()).unwrap();

        let outcome = migrate_memory_file(&path).unwrap();
        let MigrationOutcome::Migrated { backup } = outcome else {
            panic!("expected migration, got {outcome:?}");
        };

        let original: Value =
            serde_json::from_str(&std::fs::read_to_string(&backup).unwrap()).unwrap();
        assert_eq!(original, legacy);

        let rewritten: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(rewritten["logs"]["actions"][0]["target"], "ls");
        assert_eq!(rewritten["system"]["info"]["os"], "debian");
        assert_eq!(rewritten["notes"], "keep");
        assert_eq!(rewritten["projects"]["web"], "nginx");
        assert!(rewritten.get("action_log").is_none());

        assert_eq!(
            migrate_memory_file(&path).unwrap(),
            MigrationOutcome::AlreadyCurrent
        );
    }

    #[test]
    fn current_and_missing_files_are_left_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agent_memory.json");
        assert_eq!(
            migrate_memory_file(&path).unwrap(),
            MigrationOutcome::Missing
        );

        let current = r#"{"logs":{"actions":[]},"system":{"info":{}},"notes":""}"#;
        std::fs::write(&path, current).unwrap();
        assert_eq!(
            migrate_memory_file(&path).unwrap(),
            MigrationOutcome::AlreadyCurrent
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), current);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agent_memory.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(migrate_memory_file(&path).is_err());
    }

    #[test]
    fn backup_name_appends_timestamp() {
        let path = Path::new("/data/agent_memory.json");
        assert_eq!(
            backup_path(path, 1_700_000_000_000),
            PathBuf::from("/data/agent_memory.json.backup-1700000000000")
        );
    }
}
