//! # JsonStore — Inventory Snapshot Persistence
//!
//! The persistence layer for the machine's catalog: one JSON file, keyed by
//! string item id, each value `{name, price, stock}`. Loaded once at
//! startup, rewritten wholesale after every successful dispense and on
//! admin reset.
//!
//! ## Atomicity
//!
//! `save` writes to a sibling temp file and renames it over the target.
//! Either the old snapshot or the new one is on disk — never a torn file,
//! even if the process dies mid-write. A full-file rewrite per purchase is
//! fine at vending-machine throughput; a busier deployment would hide a
//! transactional store behind the same two methods.

use std::fs;
use std::path::{Path, PathBuf};

use crate::inventory::Inventory;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur while loading or saving the snapshot.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("inventory file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("inventory format error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// JsonStore
// ---------------------------------------------------------------------------

/// Handle to the inventory snapshot file.
///
/// Holds only the path; every operation opens the file fresh. Concurrency
/// control lives above this type — the machine serializes all access behind
/// one lock, so the store never sees overlapping writes.
#[derive(Debug, Clone)]
pub struct JsonStore {
    /// Location of the snapshot file.
    path: PathBuf,
}

impl JsonStore {
    /// Creates a store handle for the given snapshot path. The file is not
    /// touched until [`load`](Self::load) or [`save`](Self::save).
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// The path this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the snapshot. String keys in the JSON object become
    /// integer ids here, at the boundary — nothing downstream handles the
    /// string form.
    pub fn load(&self) -> StoreResult<Inventory> {
        let bytes = fs::read(&self.path)?;
        let inventory: Inventory = serde_json::from_slice(&bytes)?;
        tracing::debug!(
            path = %self.path.display(),
            items = inventory.len(),
            "inventory snapshot loaded"
        );
        Ok(inventory)
    }

    /// Rewrites the whole snapshot. Pretty-printed so the file stays
    /// hand-editable for operators restocking by text editor.
    pub fn save(&self, inventory: &Inventory) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(inventory)?;

        // Write-then-rename keeps the snapshot whole across crashes.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(
            path = %self.path.display(),
            items = inventory.len(),
            "inventory snapshot saved"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Item;

    fn temp_store() -> (tempfile::TempDir, JsonStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonStore::new(dir.path().join("beverages.json"));
        (dir, store)
    }

    #[test]
    fn save_then_load_roundtrip() {
        let (_dir, store) = temp_store();
        let inventory = Inventory::seed();

        store.save(&inventory).expect("save");
        let loaded = store.load().expect("load");

        assert_eq!(loaded, inventory);
    }

    #[test]
    fn load_converts_string_keys() {
        let (_dir, store) = temp_store();
        fs::write(
            store.path(),
            r#"{"7": {"name": "Ginger Ale", "price": 2, "stock": 3}}"#,
        )
        .expect("write fixture");

        let loaded = store.load().expect("load");
        assert_eq!(loaded.stock_of(7), Some(3));
    }

    #[test]
    fn saved_file_uses_string_keys() {
        let (_dir, store) = temp_store();
        let mut inventory = Inventory::new();
        inventory.insert(1, Item::new("Cola", 2, 5));
        store.save(&inventory).expect("save");

        let raw = fs::read_to_string(store.path()).expect("read back");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("parse");
        assert!(value.get("1").is_some());
        // Pretty-printed, not a single line.
        assert!(raw.contains('\n'));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let (_dir, store) = temp_store();
        let err = store.load().expect_err("no file yet");
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn load_malformed_json_is_format_error() {
        let (_dir, store) = temp_store();
        fs::write(store.path(), b"{not json").expect("write fixture");

        let err = store.load().expect_err("garbage on disk");
        assert!(matches!(err, StoreError::Json(_)));
    }

    #[test]
    fn save_overwrites_wholesale() {
        let (_dir, store) = temp_store();
        store.save(&Inventory::seed()).expect("first save");

        let mut smaller = Inventory::new();
        smaller.insert(1, Item::new("Cola", 2, 4));
        store.save(&smaller).expect("second save");

        let loaded = store.load().expect("load");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.stock_of(1), Some(4));
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let (dir, store) = temp_store();
        store.save(&Inventory::seed()).expect("save");

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
