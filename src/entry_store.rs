//! The storage slot: one JSON array of entries behind a pluggable backend.
//!
//! Every view holds its own `EntryStore` handle to the same slot and
//! follows the same cycle: read the full collection, transform it, write
//! the full collection back, broadcast it. There is no partial update and
//! no merge; see `sync` for the resulting ordering guarantee.

use std::path::{Path, PathBuf};
use std::sync::Arc;
#[cfg(test)]
use std::sync::Mutex;

use crate::journal_entry::{decode_entries, JournalEntry};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored entries are not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Where the serialized collection lives. Implementations must not fail
/// partially: `write` either replaces the whole slot or leaves it as-is.
pub trait StorageBackend: Send + Sync {
    fn read(&self) -> Result<Option<String>, StoreError>;
    fn write(&self, raw: &str) -> Result<(), StoreError>;
}

/// Backend for the real application: a single JSON file, replaced
/// atomically via temp file + rename.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileBackend { path: path.into() }
    }
}

impl StorageBackend for FileBackend {
    fn read(&self) -> Result<Option<String>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(&self.path)?))
    }

    fn write(&self, raw: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, raw)?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

/// In-memory slot, used by tests in place of the real file.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryBackend {
    slot: Mutex<Option<String>>,
}

#[cfg(test)]
impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend::default()
    }
}

#[cfg(test)]
impl StorageBackend for MemoryBackend {
    fn read(&self) -> Result<Option<String>, StoreError> {
        Ok(self.slot.lock().unwrap().clone())
    }

    fn write(&self, raw: &str) -> Result<(), StoreError> {
        *self.slot.lock().unwrap() = Some(raw.to_string());
        Ok(())
    }
}

#[derive(Clone)]
pub struct EntryStore {
    backend: Arc<dyn StorageBackend>,
}

impl EntryStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        EntryStore { backend }
    }

    pub fn with_file(path: &Path) -> Self {
        EntryStore::new(Arc::new(FileBackend::new(path)))
    }

    /// Read the full collection, or fail. Read-modify-write callers use
    /// this so a malformed slot aborts the mutation instead of clobbering
    /// the slot with a partial collection.
    pub fn try_load(&self) -> Result<Vec<JournalEntry>, StoreError> {
        match self.backend.read()? {
            Some(raw) => Ok(decode_entries(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Read the full collection for display. An absent slot is an empty
    /// journal; a malformed slot is logged and treated as empty without
    /// touching what is stored.
    pub fn load(&self) -> Vec<JournalEntry> {
        match self.try_load() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load journal entries, starting empty");
                Vec::new()
            }
        }
    }

    /// Serialize the full collection and overwrite the slot in one write.
    pub fn save(&self, entries: &[JournalEntry]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(entries)?;
        self.backend.write(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal_entry::Mood;

    fn sample(title: &str) -> JournalEntry {
        JournalEntry::create(
            title.into(),
            format!("{title} content"),
            3,
            2,
            Mood::Positive,
            vec!["test".into()],
            false,
        )
    }

    #[test]
    fn load_of_empty_slot_is_empty() {
        let store = EntryStore::new(Arc::new(MemoryBackend::new()));
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let store = EntryStore::new(Arc::new(MemoryBackend::new()));
        let entries = vec![sample("Flying"), sample("Falling")];
        store.save(&entries).unwrap();
        assert_eq!(store.load(), entries);
    }

    #[test]
    fn malformed_slot_loads_empty_and_is_not_cleared() {
        let backend = Arc::new(MemoryBackend::new());
        backend.write("not json at all").unwrap();
        let store = EntryStore::new(backend.clone());

        assert!(store.load().is_empty());
        assert!(store.try_load().is_err());
        // The slot still holds the original bytes.
        assert_eq!(backend.read().unwrap().as_deref(), Some("not json at all"));
    }

    #[test]
    fn file_backend_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = EntryStore::with_file(&dir.path().join("journal_entries.json"));
        let entries = vec![sample("Ocean")];
        store.save(&entries).unwrap();
        assert_eq!(store.load(), entries);
    }

    #[test]
    fn clones_share_the_same_slot() {
        let store_a = EntryStore::new(Arc::new(MemoryBackend::new()));
        let store_b = store_a.clone();
        store_a.save(&[sample("Shared")]).unwrap();
        assert_eq!(store_b.load().len(), 1);
    }
}
