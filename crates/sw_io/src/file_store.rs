//! File backing for `MemoryStore`: the whole dataset is written as one
//! canonical JSON document, atomically, after every mutation.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::canonical_json::write_canonical_file;
use crate::loader::{load_dataset, Dataset};
use crate::memory::{MemoryStore, Tables};
use crate::{IoError, IoResult};

pub(crate) fn persist(path: &Path, tables: &Tables) -> IoResult<()> {
    write_canonical_file(path, &tables.to_dataset())?;
    debug!(path = %path.display(), "store snapshot written");
    Ok(())
}

impl MemoryStore {
    /// Create a new store file from a seed dataset. An existing file is a conflict.
    pub fn create_file(path: impl Into<PathBuf>, mut seed: Dataset) -> IoResult<Self> {
        let path = path.into();
        if path.exists() {
            return Err(IoError::Conflict(format!("store already exists: {}", path.display())));
        }
        seed.normalize()?;
        let store = MemoryStore::with_backing(seed, path.clone())?;
        write_canonical_file(&path, &store.snapshot()?)?;
        info!(path = %path.display(), "store created");
        Ok(store)
    }

    /// Open an existing store file.
    pub fn open_file(path: impl Into<PathBuf>) -> IoResult<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(IoError::NotFound { kind: "store", id: path.display().to_string() });
        }
        let ds = load_dataset(&path)?;
        MemoryStore::with_backing(ds, path)
    }
}

#[cfg(test)]
mod tests {
    use crate::store::Store;
    use crate::{IoError, MemoryStore};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use sw_core::Session;

    fn seed() -> crate::Dataset {
        serde_json::from_value(json!({
            "surveys": [{ "id": "dengue", "title": "Dengue" }],
            "respondents": [{ "id": "r1", "name": "Ana", "email": "ana@x.org", "created_at": "2025-01-01T00:00:00Z" }]
        }))
        .unwrap()
    }

    #[test]
    fn mutations_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = MemoryStore::create_file(&path, seed()).unwrap();
        let mut s = Session::new_draft(
            "sess-1".parse().unwrap(),
            "dengue".parse().unwrap(),
            "r1".parse().unwrap(),
            "tok-1".parse().unwrap(),
            Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
        );
        s.metadata.set_skipped(&"st1".parse().unwrap(), true);
        store.insert_session(s.clone()).unwrap();
        drop(store);

        let reopened = MemoryStore::open_file(&path).unwrap();
        assert_eq!(reopened.session(&s.id).unwrap(), Some(s));
        assert_eq!(reopened.backing_path(), Some(path.as_path()));
    }

    #[test]
    fn create_refuses_existing_and_open_requires_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        MemoryStore::create_file(&path, seed()).unwrap();
        assert!(matches!(MemoryStore::create_file(&path, seed()), Err(IoError::Conflict(_))));
        assert!(matches!(
            MemoryStore::open_file(dir.path().join("missing.json")),
            Err(IoError::NotFound { .. })
        ));
    }
}
