//! Registration draft: the data collected across wizard steps.
//!
//! Every update is merged key by key into the current draft, published to
//! subscribers and written to durable storage under [`DRAFT_KEY`]. A stored
//! draft is adopted when the store is opened.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::Result;

/// Storage key of the draft.
pub const DRAFT_KEY: &str = "registrationDraft";

/// Field name to value. No schema is enforced.
pub type RegistrationDraft = Map<String, Value>;

/// Durable string storage keyed by name.
pub trait DraftStorage: Send + Sync {
    /// Reads the value stored under `key`, if any.
    fn load(&self, key: &str) -> io::Result<Option<String>>;

    /// Stores `contents` under `key`, replacing any previous value.
    fn save(&self, key: &str, contents: &str) -> io::Result<()>;

    /// Deletes the value stored under `key`. Missing keys are not an error.
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Uses `dir`, which is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file holding `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl DraftStorage for FileStorage {
    fn load(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&self, key: &str, contents: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), contents)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Process-local storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates storage already holding one entry.
    pub fn with_entry(key: &str, contents: &str) -> Self {
        let storage = Self::new();
        storage
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), contents.to_string());
        storage
    }
}

impl DraftStorage for MemoryStorage {
    fn load(&self, key: &str) -> io::Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, contents: &str) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), contents.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// Accumulates the draft across steps.
pub struct DraftStore {
    storage: Box<dyn DraftStorage>,
    state: watch::Sender<RegistrationDraft>,
}

impl std::fmt::Debug for DraftStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftStore")
            .field("draft", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl DraftStore {
    /// Opens the store, adopting a previously saved draft.
    ///
    /// A stored value that is not a JSON object is logged and ignored.
    pub fn open(storage: impl DraftStorage + 'static) -> Result<Self> {
        let initial = match storage.load(DRAFT_KEY)? {
            Some(contents) => match serde_json::from_str::<Value>(&contents) {
                Ok(Value::Object(draft)) => {
                    info!(fields = draft.len(), "Restored registration draft");
                    draft
                }
                Ok(other) => {
                    warn!(found = %other, "Stored draft is not an object, starting empty");
                    RegistrationDraft::new()
                }
                Err(e) => {
                    warn!(error = %e, "Stored draft is unreadable, starting empty");
                    RegistrationDraft::new()
                }
            },
            None => RegistrationDraft::new(),
        };

        let (state, _) = watch::channel(initial);
        Ok(Self {
            storage: Box::new(storage),
            state,
        })
    }

    /// Merges `partial` into the draft, publishes and persists the result.
    ///
    /// The merge is applied before persisting; a storage failure is returned
    /// but the in-memory draft keeps the update.
    pub fn update(&self, partial: RegistrationDraft) -> Result<RegistrationDraft> {
        let mut merged = RegistrationDraft::new();
        self.state.send_modify(|draft| {
            draft.extend(partial);
            merged = draft.clone();
        });

        let contents = serde_json::to_string(&merged)?;
        self.storage.save(DRAFT_KEY, &contents)?;
        info!(fields = merged.len(), "Saved registration draft");
        Ok(merged)
    }

    /// A snapshot of the current draft.
    pub fn get(&self) -> RegistrationDraft {
        self.state.borrow().clone()
    }

    /// Observes every published draft.
    pub fn subscribe(&self) -> watch::Receiver<RegistrationDraft> {
        self.state.subscribe()
    }

    /// Drops the draft from memory and storage.
    pub fn clear(&self) -> Result<()> {
        self.state.send_replace(RegistrationDraft::new());
        self.storage.remove(DRAFT_KEY)?;
        info!("Cleared registration draft");
        Ok(())
    }
}
