//! # Durable Snapshot Store
//!
//! Whole-document persistence of the shelf, so the shelf survives restarts.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  save(state)                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  serialize {"products": [...]}                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  write ~/.products.json.tmp  →  fsync  →  rename over ~/.products.json │
//! │                                                                         │
//! │  A crash mid-write leaves the previous snapshot intact.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The trait is synchronous; callers on an async runtime run it on the
//! blocking pool.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use shelf_core::ShelfState;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

/// Default snapshot file name, placed in the user's home directory.
pub const SNAPSHOT_FILE_NAME: &str = ".products.json";

/// Whole-document shelf persistence.
pub trait SnapshotStore: Send + Sync {
    /// Reads the stored shelf. A store with nothing saved yet yields an
    /// empty shelf.
    fn load(&self) -> StoreResult<ShelfState>;

    /// Replaces the stored shelf with `state`.
    fn save(&self, state: &ShelfState) -> StoreResult<()>;
}

// =============================================================================
// JSON File Store
// =============================================================================

/// Snapshot kept as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    /// Creates a store for the snapshot file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonSnapshotStore { path: path.into() }
    }

    /// The snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling of the target named `<file name>.tmp`.
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn load(&self) -> StoreResult<ShelfState> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No snapshot yet, starting empty");
                return Ok(ShelfState::new());
            }
            Err(e) => return Err(e.into()),
        };

        let state: ShelfState =
            serde_json::from_str(&raw).map_err(|e| StoreError::corrupt(&self.path, e))?;
        state
            .validate()
            .map_err(|e| StoreError::corrupt(&self.path, e))?;

        info!(path = %self.path.display(), products = state.len(), "Snapshot loaded");
        Ok(state)
    }

    fn save(&self, state: &ShelfState) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(state)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.temp_path();
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;

        debug!(path = %self.path.display(), products = state.len(), "Snapshot saved");
        Ok(())
    }
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// Snapshot held in memory, for tests.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    state: Mutex<ShelfState>,
    saves: Mutex<usize>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `state`.
    pub fn with_state(state: ShelfState) -> Self {
        MemorySnapshotStore {
            state: Mutex::new(state),
            saves: Mutex::new(0),
        }
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }

    /// Copy of the stored shelf.
    pub fn stored(&self) -> ShelfState {
        self.state.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> StoreResult<ShelfState> {
        self.state
            .lock()
            .map(|s| s.clone())
            .map_err(|_| StoreError::Internal("snapshot lock poisoned".to_string()))
    }

    fn save(&self, state: &ShelfState) -> StoreResult<()> {
        let poisoned = || StoreError::Internal("snapshot lock poisoned".to_string());
        *self.state.lock().map_err(|_| poisoned())? = state.clone();
        *self.saves.lock().map_err(|_| poisoned())? += 1;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_core::Product;

    fn shelf() -> ShelfState {
        let mut state = ShelfState::new();
        state
            .place(Product::new("p-2", "SKU2", 1, "Milk", 1.2, "2022-03-01").with_tag("b"))
            .unwrap();
        state
            .place(
                Product::new("p-1", "SKU1", 100, "Widget", 9.99, "2030-01-01")
                    .with_tag("a")
                    .with_promo(7.5),
            )
            .unwrap();
        state
    }

    #[test]
    fn test_round_trip_preserves_order_and_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join(SNAPSHOT_FILE_NAME));

        store.save(&shelf()).unwrap();
        assert_eq!(store.load().unwrap(), shelf());

        // No temp file left behind
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_missing_file_is_empty_shelf() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("absent.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SNAPSHOT_FILE_NAME);
        fs::write(&path, "{\"products\": [").unwrap();

        let err = JsonSnapshotStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::CorruptSnapshot { .. }));
    }

    #[test]
    fn test_duplicate_tags_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SNAPSHOT_FILE_NAME);
        let product = Product::new("p-1", "SKU1", 1, "Widget", 1.0, "x").with_tag("a");
        let json = serde_json::json!({ "products": [product.clone(), product] });
        fs::write(&path, json.to_string()).unwrap();

        let err = JsonSnapshotStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::CorruptSnapshot { .. }));
    }

    #[test]
    fn test_save_creates_parent_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("nested/dir/shelf.json"));

        store.save(&shelf()).unwrap();
        store.save(&ShelfState::new()).unwrap();

        assert!(store.load().unwrap().is_empty());
        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"products\""));
    }

    #[test]
    fn test_temp_file_never_aliases_target() {
        let dir = tempfile::tempdir().unwrap();

        for name in [".products.json", "shelf.tmp", "snapshot"] {
            let store = JsonSnapshotStore::new(dir.path().join(name));
            let temp = store.temp_path();
            assert_ne!(temp, store.path());
            assert_eq!(temp.parent(), store.path().parent());

            store.save(&ShelfState::new()).unwrap();
            assert!(store.load().unwrap().is_empty());
            assert!(!temp.exists());
        }

        assert_eq!(
            JsonSnapshotStore::new(dir.path().join("shelf.tmp")).temp_path(),
            dir.path().join("shelf.tmp.tmp")
        );
    }

    #[test]
    fn test_memory_store_counts_saves() {
        let store = MemorySnapshotStore::new();
        assert!(store.load().unwrap().is_empty());

        store.save(&shelf()).unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.stored(), shelf());
    }
}
