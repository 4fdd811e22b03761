//! Persisted history of completed verification runs.

#[cfg(test)]
use std::{cell::RefCell, collections::HashMap};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::error::ReviewError;
use crate::models::Session;

pub const HISTORY_KEY: &str = "verification_history";
pub const HISTORY_CAPACITY: usize = 100;

/// A key/value slot store scoped to this application.
///
/// Each write replaces the whole value under a key.
pub trait SlotStore {
    fn read(&self, key: &str) -> io::Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> io::Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
pub struct FileSlotStore {
    dir: PathBuf,
}

impl FileSlotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl SlotStore for FileSlotStore {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    // Write to a sibling temp file, then rename over the slot.
    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp_path = self.dir.join(format!(".{}.json.tmp", key));
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(value.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);
        fs::rename(&tmp_path, &path)
    }
}

/// In-memory slots. `fail_writes` simulates a full or read-only store.
#[cfg(test)]
#[derive(Default)]
pub struct MemorySlotStore {
    slots: RefCell<HashMap<String, String>>,
    pub fail_writes: bool,
}

#[cfg(test)]
impl MemorySlotStore {
    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::default();
        store.slots.borrow_mut().insert(key.to_string(), value.to_string());
        store
    }
}

#[cfg(test)]
impl SlotStore for MemorySlotStore {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.slots.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::StorageFull, "quota exceeded"));
        }
        self.slots.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Newest-first, capacity-bounded list of sessions mirrored into one slot.
///
/// Storage problems never escape: unreadable data loads as an empty history
/// and failed writes are logged while the in-memory list carries on.
pub struct HistoryStore<S: SlotStore> {
    store: S,
    sessions: Vec<Session>,
}

impl<S: SlotStore> HistoryStore<S> {
    pub fn open(store: S) -> Self {
        let mut history = Self {
            store,
            sessions: Vec::new(),
        };
        history.load();
        history
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn load(&mut self) -> &[Session] {
        self.sessions = match self.read_slot() {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::warn!("{}; starting with an empty history", e);
                Vec::new()
            }
        };
        &self.sessions
    }

    pub fn insert(&mut self, session: Session) -> &[Session] {
        self.sessions.retain(|s| s.id != session.id);
        self.sessions.insert(0, session);
        self.sessions.truncate(HISTORY_CAPACITY);
        self.persist();
        &self.sessions
    }

    pub fn delete(&mut self, id: &str) -> &[Session] {
        self.sessions.retain(|s| s.id != id);
        self.persist();
        &self.sessions
    }

    pub fn clear_all(&mut self) -> &[Session] {
        self.sessions.clear();
        self.persist();
        &self.sessions
    }

    fn read_slot(&self) -> Result<Vec<Session>, ReviewError> {
        let raw = self
            .store
            .read(HISTORY_KEY)
            .map_err(|e| ReviewError::HistoryCorrupt(e.to_string()))?;
        match raw {
            Some(raw) if !raw.trim().is_empty() => {
                let mut sessions: Vec<Session> = serde_json::from_str(&raw)
                    .map_err(|e| ReviewError::HistoryCorrupt(e.to_string()))?;
                // First occurrence wins, as with insert.
                let mut seen = HashSet::new();
                sessions.retain(|s| seen.insert(s.id.clone()));
                sessions.truncate(HISTORY_CAPACITY);
                Ok(sessions)
            }
            _ => Ok(Vec::new()),
        }
    }

    fn persist(&self) {
        if let Err(e) = self.write_slot() {
            tracing::warn!("{}", e);
        }
    }

    fn write_slot(&self) -> Result<(), ReviewError> {
        let json = serde_json::to_string(&self.sessions)
            .map_err(|e| ReviewError::PersistenceWriteFailed(e.to_string()))?;
        self.store
            .write(HISTORY_KEY, &json)
            .map_err(|e| ReviewError::PersistenceWriteFailed(e.to_string()))?;
        tracing::debug!("saved {} history entries", self.sessions.len());
        Ok(())
    }
}
