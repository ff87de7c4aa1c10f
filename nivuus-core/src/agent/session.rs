//! Process-wide conversation state shared by the loop and the tools

use crate::config::core::{MemoryConfig, StorageConfig};
use crate::llm::provider::Message;
use crate::memory::{ActionStatus, MemoryStore};
use crate::tools::registry::ConfirmationFlag;
use crate::utils::persistence::{JsonStore, StorageKey};
use anyhow::Result;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

const EMERGENCY_LOCK_TIMEOUT: Duration = Duration::from_millis(500);

/// Transcript and memory document, always mutated together under one lock
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub transcript: Vec<Message>,
    pub memory: MemoryStore,
}

/// Outcome of a best-effort synchronous save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushReport {
    pub lock_acquired: bool,
    pub transcript_saved: bool,
    pub memory_saved: bool,
    /// A confirmation-gated tool call was in flight
    pub risky_action_in_flight: bool,
}

impl FlushReport {
    pub fn is_complete(&self) -> bool {
        self.transcript_saved && self.memory_saved
    }
}

/// Cheap handle to the shared state; clones refer to the same session
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
    store: JsonStore,
    legacy_mirrors: bool,
    confirmation: ConfirmationFlag,
}

impl Session {
    pub fn new(state: SessionState, store: JsonStore, legacy_mirrors: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            store,
            legacy_mirrors,
            confirmation: ConfirmationFlag::default(),
        }
    }

    /// Load both documents from the configured locations, tolerating absent or corrupt files
    pub fn load(storage: &StorageConfig, memory: &MemoryConfig) -> Self {
        let store = JsonStore::new(storage.history_path(), storage.memory_path());
        let transcript: Vec<Message> = store.load(StorageKey::Transcript, Vec::new());
        let document: Value = store.load(StorageKey::Memory, Value::Null);
        let memory_store = MemoryStore::from_document(document, memory.max_action_log_entries);
        debug!(
            messages = transcript.len(),
            actions = memory_store.action_count(),
            "session loaded"
        );

        Self::new(
            SessionState {
                transcript,
                memory: memory_store,
            },
            store,
            memory.write_legacy_mirrors,
        )
    }

    /// Run `f` with exclusive access. Never hold the guard across an await.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.state.lock();
        f(&mut state)
    }

    pub fn with_memory<R>(&self, f: impl FnOnce(&mut MemoryStore) -> R) -> R {
        self.with_state(|state| f(&mut state.memory))
    }

    pub fn record_action(
        &self,
        action_type: &str,
        target: &str,
        status: ActionStatus,
        error_msg: Option<&str>,
    ) {
        self.with_memory(|memory| memory.record_action(action_type, target, status, error_msg));
    }

    pub fn transcript(&self) -> Vec<Message> {
        self.with_state(|state| state.transcript.clone())
    }

    pub fn push_message(&self, message: Message) {
        self.with_state(|state| state.transcript.push(message));
    }

    pub fn replace_transcript(&self, transcript: Vec<Message>) {
        self.with_state(|state| state.transcript = transcript);
    }

    pub fn confirmation_flag(&self) -> ConfirmationFlag {
        self.confirmation.clone()
    }

    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    /// Persist both documents. The lock is released before any file I/O.
    pub fn save(&self) -> Result<()> {
        let (transcript, memory) = self.with_state(|state| {
            (
                state.transcript.clone(),
                state.memory.to_document(self.legacy_mirrors),
            )
        });
        self.store.save(StorageKey::Transcript, &transcript)?;
        self.store.save(StorageKey::Memory, &memory)?;
        debug!(messages = transcript.len(), "session saved");
        Ok(())
    }

    /// Synchronous best-effort save for panic hooks, fatal errors and signals.
    /// Waits a bounded time for the lock so a stuck holder cannot block exit.
    pub fn emergency_flush(&self) -> FlushReport {
        let mut report = FlushReport {
            risky_action_in_flight: self.confirmation.is_pending(),
            ..FlushReport::default()
        };

        let Some(state) = self.state.try_lock_for(EMERGENCY_LOCK_TIMEOUT) else {
            error!("Emergency flush could not acquire session lock, nothing saved");
            return report;
        };
        report.lock_acquired = true;
        let transcript = state.transcript.clone();
        let memory = state.memory.to_document(self.legacy_mirrors);
        drop(state);

        match self.store.save(StorageKey::Transcript, &transcript) {
            Ok(()) => report.transcript_saved = true,
            Err(err) => error!("Emergency save of transcript failed: {err:#}"),
        }
        match self.store.save(StorageKey::Memory, &memory) {
            Ok(()) => report.memory_saved = true,
            Err(err) => error!("Emergency save of memory failed: {err:#}"),
        }

        if report.risky_action_in_flight {
            warn!("Emergency flush happened while a confirmed tool call was running");
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn session_in(dir: &TempDir) -> Session {
        let storage = StorageConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..StorageConfig::default()
        };
        Session::load(&storage, &MemoryConfig::default())
    }

    #[test]
    fn fresh_session_is_empty() {
        let dir = TempDir::new().unwrap();
        let session = session_in(&dir);
        assert!(session.transcript().is_empty());
        assert!(session.with_memory(|memory| memory.get_keys("").unwrap().is_empty()));
    }

    #[test]
    fn save_and_reload_round_trips_state() {
        let dir = TempDir::new().unwrap();
        let session = session_in(&dir);
        session.push_message(Message::system("prompt".to_string()));
        session.push_message(Message::user("hello".to_string()));
        session.with_memory(|memory| {
            memory.set_value("system/info/os", json!("linux")).unwrap();
        });
        session.record_action("Command", "uname", ActionStatus::Success, None);
        session.save().unwrap();

        let reloaded = session_in(&dir);
        assert_eq!(reloaded.transcript(), session.transcript());
        reloaded.with_memory(|memory| {
            assert_eq!(memory.get_value("system.info.os").unwrap(), &json!("linux"));
            assert_eq!(memory.action_log().len(), 1);
        });

        let raw = std::fs::read_to_string(dir.path().join("agent_memory.json")).unwrap();
        assert!(!raw.contains("action_log"));
    }

    #[test]
    fn emergency_flush_writes_both_documents() {
        let dir = TempDir::new().unwrap();
        let session = session_in(&dir);
        session.push_message(Message::user("pending".to_string()));

        let report = session.emergency_flush();
        assert!(report.lock_acquired);
        assert!(report.is_complete());
        assert!(!report.risky_action_in_flight);
        assert!(dir.path().join("conversation_history.json").exists());
        assert!(dir.path().join("agent_memory.json").exists());
    }

    #[test]
    fn emergency_flush_gives_up_on_a_held_lock() {
        let dir = TempDir::new().unwrap();
        let session = session_in(&dir);
        let flag = session.confirmation_flag();
        let _pending = flag.raise();

        let guard = session.state.lock();
        let report = session.emergency_flush();
        drop(guard);

        assert!(!report.lock_acquired);
        assert!(!report.is_complete());
        assert!(report.risky_action_in_flight);
    }
}
