//! Single-slot persistence of the last selected location.
//!
//! Only the candidate is stored, never its weather; weather is re-fetched on
//! restore.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::StoreError;
use crate::types::LocationCandidate;

/// Durable single-slot storage for the last selected location.
pub trait LocationStore: Send + Sync {
    /// Overwrite the slot. Readers never observe a partial write.
    fn save(&self, candidate: &LocationCandidate) -> Result<(), StoreError>;

    /// Read the slot. A never-written slot, or one whose contents no longer
    /// decode, reads as `None`.
    fn load(&self) -> Result<Option<LocationCandidate>, StoreError>;

    /// Empty the slot.
    fn clear(&self) -> Result<(), StoreError>;
}

/// JSON file at `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileLocationStore {
    dir: PathBuf,
    path: PathBuf,
}

impl FileLocationStore {
    pub fn new(dir: impl Into<PathBuf>, key: &str) -> Self {
        let dir = dir.into();
        let path = dir.join(format!("{}.json", key));
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LocationStore for FileLocationStore {
    fn save(&self, candidate: &LocationCandidate) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;

        let json = serde_json::to_vec_pretty(candidate)
            .map_err(|e| StoreError::persistence(format!("Failed to serialize location: {}", e)))?;

        // Write beside the target and rename over it
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::from(e.error))?;

        tracing::info!("Saved selected location {} ({})", candidate.name, candidate.id);
        Ok(())
    }

    fn load(&self) -> Result<Option<LocationCandidate>, StoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(candidate) => Ok(Some(candidate)),
            Err(e) => {
                tracing::warn!(
                    "Ignoring saved location at {:?} that no longer decodes: {}",
                    self.path,
                    e
                );
                Ok(None)
            }
        }
    }

    fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process slot. Counts saves so callers can assert on write traffic.
#[derive(Debug, Default)]
pub struct MemoryLocationStore {
    slot: Mutex<Option<LocationCandidate>>,
    saves: AtomicUsize,
}

impl MemoryLocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `candidate`, as if saved by a previous run.
    pub fn with_saved(candidate: LocationCandidate) -> Self {
        Self {
            slot: Mutex::new(Some(candidate)),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn saved(&self) -> Option<LocationCandidate> {
        self.slot.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl LocationStore for MemoryLocationStore {
    fn save(&self, candidate: &LocationCandidate) -> Result<(), StoreError> {
        *self.slot.lock() = Some(candidate.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load(&self) -> Result<Option<LocationCandidate>, StoreError> {
        Ok(self.slot.lock().clone())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.slot.lock() = None;
        Ok(())
    }
}
