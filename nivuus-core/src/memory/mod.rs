//! Hierarchical agent memory.
//!
//! The document is a JSON tree addressed by [`MemoryPath`]. Three locations are
//! reserved: `logs.actions` (bounded action log), `system.info` (discovered host
//! facts) and `notes` (free text). Everything else belongs to the model.

mod action_log;
pub mod migration;
mod path;

pub use action_log::{ActionLogEntry, ActionStatus};
pub use migration::{MigrationOutcome, migrate_memory_file};
pub use path::MemoryPath;

use crate::config::constants::{defaults, memory_paths};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    #[error("Path not found in memory: {0}")]
    PathNotFound(String),
    #[error("Value at '{0}' is not an object")]
    PathNotObject(String),
    #[error("A memory path is required")]
    EmptyPath,
}

/// In-process memory document with path-addressed access and the action log
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryStore {
    root: Map<String, Value>,
    max_actions: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(defaults::MAX_ACTION_LOG_ENTRIES)
    }
}

impl MemoryStore {
    pub fn new(max_actions: usize) -> Self {
        Self {
            root: Map::new(),
            max_actions: max_actions.max(1),
        }
    }

    /// Child key names at `path`, in insertion order
    pub fn get_keys(&self, path: &str) -> Result<Vec<String>, MemoryError> {
        let path = MemoryPath::parse(path);
        if path.is_root() {
            return Ok(self.root.keys().cloned().collect());
        }
        let Some(node) = self.lookup(&path) else {
            debug!(path = %path, "memory path not found, no keys");
            return Ok(Vec::new());
        };

        match node {
            Value::Object(map) => Ok(map.keys().cloned().collect()),
            Value::Array(items) => Ok((0..items.len()).map(|i| i.to_string()).collect()),
            Value::Null => Ok(Vec::new()),
            _ => Err(MemoryError::PathNotObject(path.to_string())),
        }
    }

    pub fn get_value(&self, path: &str) -> Result<&Value, MemoryError> {
        let path = MemoryPath::parse(path);
        if path.is_root() {
            return Err(MemoryError::EmptyPath);
        }
        self.lookup(&path)
            .ok_or_else(|| MemoryError::PathNotFound(path.to_string()))
    }

    /// Assign `value` at `path`, creating intermediate objects as needed
    pub fn set_value(&mut self, path: &str, value: Value) -> Result<String, MemoryError> {
        let path = MemoryPath::parse(path);
        let Some((first, rest)) = path.segments().split_first() else {
            return Err(MemoryError::EmptyPath);
        };

        let mut slot = self.root.entry(first.clone()).or_insert(Value::Null);
        for segment in rest {
            slot = descend_mut(slot, segment);
        }
        *slot = value;

        debug!(path = %path, "memory value stored");
        Ok(format!("Value stored in memory at '{path}'"))
    }

    /// Append to `logs.actions`, evicting the oldest entries beyond the cap
    pub fn record_action(
        &mut self,
        action_type: &str,
        target: &str,
        status: ActionStatus,
        error_msg: Option<&str>,
    ) {
        let entry = ActionLogEntry::new(action_type, target, status, error_msg);
        let entry = match serde_json::to_value(&entry) {
            Ok(value) => value,
            Err(err) => {
                warn!("Failed to serialize action log entry: {err}");
                return;
            }
        };

        let max_actions = self.max_actions;
        self.with_actions(|actions| {
            actions.push(entry);
            keep_most_recent(actions, max_actions);
        });
    }

    /// Parsed action log, oldest first. Malformed entries are skipped.
    pub fn action_log(&self) -> Vec<ActionLogEntry> {
        self.root
            .get(memory_paths::LOGS)
            .and_then(|logs| logs.get(memory_paths::ACTIONS))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn action_count(&self) -> usize {
        self.root
            .get(memory_paths::LOGS)
            .and_then(|logs| logs.get(memory_paths::ACTIONS))
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    pub fn notes(&self) -> &str {
        self.root
            .get(memory_paths::NOTES)
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// `system.info` when it holds at least one fact
    pub fn system_info(&self) -> Option<&Value> {
        self.root
            .get(memory_paths::SYSTEM)
            .and_then(|system| system.get(memory_paths::INFO))
            .filter(|info| match info {
                Value::Object(map) => !map.is_empty(),
                Value::Null => false,
                Value::String(s) => !s.is_empty(),
                _ => true,
            })
    }

    /// Whether the per-request memory summary has anything to say
    pub fn has_summary_content(&self) -> bool {
        self.system_info().is_some() || !self.notes().trim().is_empty() || self.action_count() > 0
    }

    /// Build a store from a persisted document, upgrading the legacy flat shape
    pub fn from_document(document: Value, max_actions: usize) -> Self {
        let root = match document {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                warn!(
                    kind = json_kind(&other),
                    "memory document is not an object, starting fresh"
                );
                Map::new()
            }
        };

        let mut store = Self {
            root,
            max_actions: max_actions.max(1),
        };
        store.absorb_legacy_fields();

        let max_actions = store.max_actions;
        if store.action_count() > max_actions {
            store.with_actions(|actions| keep_most_recent(actions, max_actions));
        }
        store
    }

    /// Canonical document for persistence, optionally with the flat mirrors.
    /// The reserved locations are always present in the output.
    pub fn to_document(&self, legacy_mirrors: bool) -> Value {
        let mut seeded = self.clone();
        seeded.ensure_reserved_structure();
        let mut root = seeded.root;
        if legacy_mirrors {
            let actions = root
                .get(memory_paths::LOGS)
                .and_then(|logs| logs.get(memory_paths::ACTIONS))
                .cloned()
                .unwrap_or_else(|| json!([]));
            let info = root
                .get(memory_paths::SYSTEM)
                .and_then(|system| system.get(memory_paths::INFO))
                .cloned()
                .unwrap_or_else(|| json!({}));
            root.insert(memory_paths::LEGACY_ACTION_LOG.to_string(), actions);
            root.insert(memory_paths::LEGACY_SYSTEM_INFO.to_string(), info);
        }
        Value::Object(root)
    }

    /// Flat `action_log` / `system_info` at the top level without `logs` / `system`
    pub fn is_legacy_document(document: &Value) -> bool {
        let Some(map) = document.as_object() else {
            return false;
        };
        let has_legacy = map.contains_key(memory_paths::LEGACY_ACTION_LOG)
            || map.contains_key(memory_paths::LEGACY_SYSTEM_INFO);
        let has_current =
            map.contains_key(memory_paths::LOGS) || map.contains_key(memory_paths::SYSTEM);
        has_legacy && !has_current
    }

    fn lookup(&self, path: &MemoryPath) -> Option<&Value> {
        let Some((first, rest)) = path.segments().split_first() else {
            return None;
        };
        let mut node = self.root.get(first)?;
        for segment in rest {
            node = match node {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Move legacy mirrors into the canonical locations. Canonical data wins.
    fn absorb_legacy_fields(&mut self) {
        if let Some(legacy_log) = self.root.remove(memory_paths::LEGACY_ACTION_LOG) {
            let canonical_empty = self.action_count() == 0;
            if canonical_empty && let Value::Array(items) = legacy_log {
                if !items.is_empty() {
                    debug!(entries = items.len(), "upgrading legacy action_log");
                }
                self.with_actions(|actions| *actions = items);
            }
        }

        if let Some(legacy_info) = self.root.remove(memory_paths::LEGACY_SYSTEM_INFO) {
            let canonical_empty = self
                .root
                .get(memory_paths::SYSTEM)
                .and_then(|system| system.get(memory_paths::INFO))
                .is_none_or(|info| info.as_object().is_some_and(Map::is_empty) || info.is_null());
            if canonical_empty {
                self.with_system(|system| {
                    system.insert(memory_paths::INFO.to_string(), legacy_info);
                });
            }
        }
    }

    fn ensure_reserved_structure(&mut self) {
        self.with_system(|system| {
            system
                .entry(memory_paths::INFO.to_string())
                .or_insert_with(|| json!({}));
        });
        self.with_actions(|_| {});
        let notes = self
            .root
            .entry(memory_paths::NOTES.to_string())
            .or_insert_with(|| json!(""));
        if notes.is_null() {
            *notes = json!("");
        }
    }

    fn with_system(&mut self, update: impl FnOnce(&mut Map<String, Value>)) {
        if let Value::Object(system) = object_child(&mut self.root, memory_paths::SYSTEM) {
            update(system);
        }
    }

    /// Run `update` on the action list, repairing `logs.actions` first
    fn with_actions(&mut self, update: impl FnOnce(&mut Vec<Value>)) {
        let Value::Object(logs) = object_child(&mut self.root, memory_paths::LOGS) else {
            return;
        };
        let actions = logs
            .entry(memory_paths::ACTIONS.to_string())
            .or_insert_with(|| json!([]));
        if !actions.is_array() {
            warn!("logs.actions was not a list, resetting it");
            *actions = json!([]);
        }
        if let Value::Array(items) = actions {
            update(items);
        }
    }
}

/// Child under `key`, replaced by an empty object when it is anything else
fn object_child<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Value {
    let child = map.entry(key.to_string()).or_insert_with(|| json!({}));
    if !child.is_object() {
        *child = json!({});
    }
    child
}

fn keep_most_recent(actions: &mut Vec<Value>, max_actions: usize) {
    if actions.len() > max_actions {
        let excess = actions.len() - max_actions;
        actions.drain(..excess);
    }
}

/// Step one segment down for assignment. Existing arrays accept an index up to
/// their length (appending); any other non-object is replaced by an object.
fn descend_mut<'a>(node: &'a mut Value, segment: &str) -> &'a mut Value {
    let index = match (&*node, segment.parse::<usize>()) {
        (Value::Array(items), Ok(index)) if index <= items.len() => Some(index),
        _ => None,
    };
    if index.is_none() && !node.is_object() {
        *node = Value::Object(Map::new());
    }

    match node {
        Value::Array(items) => {
            let index = index.unwrap_or(items.len());
            if index == items.len() {
                items.push(Value::Null);
            }
            &mut items[index]
        }
        Value::Object(map) => map.entry(segment.to_string()).or_insert(Value::Null),
        other => other,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_lists_no_keys() {
        let store = MemoryStore::from_document(json!({}), 30);
        assert!(store.get_keys("").unwrap().is_empty());
        assert!(store.get_keys("/").unwrap().is_empty());
        assert!(store.get_keys("root").unwrap().is_empty());
    }

    #[test]
    fn persisted_document_carries_reserved_structure() {
        let store = MemoryStore::new(30);
        let saved = store.to_document(false);
        assert_eq!(saved, json!({"system": {"info": {}}, "logs": {"actions": []}, "notes": ""}));
    }

    #[test]
    fn set_then_list_nested_keys() {
        let mut store = MemoryStore::new(30);
        store.set_value("system/info/os", json!("linux")).unwrap();
        assert_eq!(store.get_keys("system/info").unwrap(), vec!["os"]);
    }

    #[test]
    fn slash_and_dot_paths_address_the_same_value() {
        let mut store = MemoryStore::new(30);
        store.set_value("a/b/c", json!(42)).unwrap();
        assert_eq!(store.get_value("a.b.c").unwrap(), &json!(42));

        store.set_value("x.y", json!({"z": true})).unwrap();
        assert_eq!(store.get_value("x/y/z").unwrap(), &json!(true));
    }

    #[test]
    fn set_overwrites_and_replaces_scalar_intermediates() {
        let mut store = MemoryStore::new(30);
        store.set_value("services", json!("unknown")).unwrap();
        store.set_value("services/nginx/state", json!("running")).unwrap();
        assert_eq!(
            store.get_value("services").unwrap(),
            &json!({"nginx": {"state": "running"}})
        );
    }

    #[test]
    fn arrays_are_indexable() {
        let mut store = MemoryStore::new(30);
        store.set_value("disks", json!(["sda"])).unwrap();
        store.set_value("disks/1", json!("sdb")).unwrap();
        assert_eq!(store.get_value("disks/1").unwrap(), &json!("sdb"));
        assert_eq!(store.get_keys("disks").unwrap(), vec!["0", "1"]);
    }

    #[test]
    fn missing_and_scalar_paths() {
        let mut store = MemoryStore::new(30);
        assert_eq!(store.get_keys("nope/deeper").unwrap(), Vec::<String>::new());
        assert_eq!(
            store.get_value("nope"),
            Err(MemoryError::PathNotFound("nope".to_string()))
        );

        store.set_value("notes", json!("remember")).unwrap();
        assert_eq!(
            store.get_keys("notes"),
            Err(MemoryError::PathNotObject("notes".to_string()))
        );
        assert_eq!(store.set_value("/", json!(1)), Err(MemoryError::EmptyPath));
        assert_eq!(store.get_value(""), Err(MemoryError::EmptyPath));
    }

    #[test]
    fn action_log_keeps_the_most_recent_entries() {
        let cap = 30;
        for calls in [1usize, 29, 30, 31, 75] {
            let mut store = MemoryStore::new(cap);
            for i in 0..calls {
                store.record_action("Command", &format!("cmd-{i}"), ActionStatus::Success, None);
            }
            let log = store.action_log();
            assert_eq!(log.len(), calls.min(cap));
            let first_kept = calls.saturating_sub(cap);
            assert_eq!(log[0].target, format!("cmd-{first_kept}"));
            assert_eq!(log.last().unwrap().target, format!("cmd-{}", calls - 1));
        }
    }

    #[test]
    fn record_action_repairs_clobbered_log() {
        let mut store = MemoryStore::new(5);
        store.set_value("logs/actions", json!("oops")).unwrap();
        store.record_action("Command", "ls", ActionStatus::Failure, Some("boom"));
        let log = store.action_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].error_msg.as_deref(), Some("boom"));
    }

    #[test]
    fn clobbered_reserved_objects_are_rebuilt() {
        let mut store = MemoryStore::new(5);
        store.set_value("logs", json!(7)).unwrap();
        store.set_value("system", json!([1, 2])).unwrap();
        store.record_action("Command", "ls", ActionStatus::Success, None);
        assert_eq!(store.action_count(), 1);

        let saved = store.to_document(false);
        assert_eq!(saved["system"], json!({"info": {}}));
        assert_eq!(saved["logs"]["actions"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn legacy_document_is_upgraded_on_load() {
        let legacy = json!({
            "action_log": [{
                "timestamp": "2024-05-01T10:20:30.123Z",
                "actionType": "Command",
                "target": "uname -a",
                "status": "Success"
            }],
            "system_info": {"os": "debian"},
            "notes": "",
            "custom": {"k": 1}
        });
        assert!(MemoryStore::is_legacy_document(&legacy));

        let store = MemoryStore::from_document(legacy, 30);
        assert_eq!(store.action_log().len(), 1);
        assert_eq!(store.get_value("system/info/os").unwrap(), &json!("debian"));
        assert_eq!(store.get_value("custom/k").unwrap(), &json!(1));

        let saved = store.to_document(false);
        assert!(saved.get("action_log").is_none());
        assert!(saved.get("system_info").is_none());
        assert!(!MemoryStore::is_legacy_document(&saved));
    }

    #[test]
    fn canonical_data_wins_over_stale_mirrors() {
        let document = json!({
            "logs": {"actions": []},
            "system": {"info": {"os": "arch"}},
            "notes": "n",
            "action_log": [],
            "system_info": {"os": "stale"}
        });
        let store = MemoryStore::from_document(document, 30);
        assert_eq!(store.get_value("system/info/os").unwrap(), &json!("arch"));
        assert!(store.get_value("system_info").is_err());
    }

    #[test]
    fn mirrors_are_derived_when_requested() {
        let mut store = MemoryStore::new(30);
        store.set_value("system/info/kernel", json!("6.1")).unwrap();
        store.record_action("Command", "uname -r", ActionStatus::Success, None);

        let saved = store.to_document(true);
        assert_eq!(saved["system_info"]["kernel"], "6.1");
        assert_eq!(saved["action_log"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn oversized_persisted_log_is_trimmed_on_load() {
        let entries: Vec<Value> = (0..10)
            .map(|i| {
                json!({
                    "timestamp": "2024-05-01T10:20:30Z",
                    "actionType": "Command",
                    "target": format!("cmd-{i}"),
                    "status": "Success"
                })
            })
            .collect();
        let store = MemoryStore::from_document(json!({"logs": {"actions": entries}}), 4);
        let log = store.action_log();
        assert_eq!(log.len(), 4);
        assert_eq!(log[0].target, "cmd-6");
    }

    #[test]
    fn summary_content_detection() {
        let mut store = MemoryStore::new(30);
        assert!(!store.has_summary_content());
        store.set_value("notes", json!("prefers apt")).unwrap();
        assert!(store.has_summary_content());

        let mut store = MemoryStore::new(30);
        store.set_value("system/info/os", json!("linux")).unwrap();
        assert!(store.has_summary_content());
    }
}
