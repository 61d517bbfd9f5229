//! Progress Storage
//!
//! The tracker treats persistence as an opaque load/save pair. The JSON file
//! backend writes the whole store to a sibling temp file and renames it over
//! the target, so a save either lands completely or not at all.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::PersistenceError;
use crate::quest::ProgressStore;

/// Durable home for the progress store
pub trait ProgressStorage {
    /// Load saved progress; `Ok(None)` when nothing has been saved yet
    fn load(&self) -> Result<Option<ProgressStore>, PersistenceError>;

    /// Replace the saved progress with `store`
    fn save(&self, store: &ProgressStore) -> Result<(), PersistenceError>;
}

/// Saves progress as pretty-printed JSON in a single file
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "progress.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl ProgressStorage for JsonFileStorage {
    fn load(&self) -> Result<Option<ProgressStore>, PersistenceError> {
        if !self.path.exists() {
            info!("No saved progress at {:?}, starting fresh", self.path);
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        let store: ProgressStore = serde_json::from_str(&content)?;
        info!(
            "Loaded progress for {} npc(s), {} completion(s)",
            store.records().count(),
            store.completed_count()
        );
        Ok(Some(store))
    }

    fn save(&self, store: &ProgressStore) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(store)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let temp = self.temp_path();
        std::fs::write(&temp, json).map_err(|e| self.io_error(e))?;
        std::fs::rename(&temp, &self.path).map_err(|e| self.io_error(e))?;

        debug!("Saved progress to {:?}", self.path);
        Ok(())
    }
}

/// In-memory storage for embedding and tests
///
/// The tracker is single-threaded, so interior mutability is a `RefCell`.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    saved: RefCell<Option<ProgressStore>>,
    fail_saves: Cell<bool>,
    save_count: Cell<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with previously saved progress
    pub fn with_saved(store: ProgressStore) -> Self {
        Self {
            saved: RefCell::new(Some(store)),
            ..Self::default()
        }
    }

    /// Make subsequent saves fail, as a full disk would
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.set(fail);
    }

    /// Last successfully saved store
    pub fn saved(&self) -> Option<ProgressStore> {
        self.saved.borrow().clone()
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.save_count.get()
    }
}

impl ProgressStorage for MemoryStorage {
    fn load(&self) -> Result<Option<ProgressStore>, PersistenceError> {
        Ok(self.saved.borrow().clone())
    }

    fn save(&self, store: &ProgressStore) -> Result<(), PersistenceError> {
        if self.fail_saves.get() {
            return Err(PersistenceError::Unavailable("memory storage is refusing writes".to_string()));
        }
        *self.saved.borrow_mut() = Some(store.clone());
        self.save_count.set(self.save_count.get() + 1);
        Ok(())
    }
}
