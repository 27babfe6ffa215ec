use std::fs;
use std::path::Path;
use tracing::debug;

use super::{KeyIter, KvStore, OpenMode, StoreError, StoreResult};

/// sled-backed store; one sled database directory per store.
pub struct DiskStore {
    db: sled::Db,
}

impl DiskStore {
    pub fn open(path: &Path, mode: OpenMode) -> StoreResult<Self> {
        if mode == OpenMode::OpenExisting && !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        let db = sled::Config::new().path(path).open()?;
        if mode == OpenMode::CreateNew {
            db.clear()?;
        }
        debug!(path = %path.display(), ?mode, "opened disk store");
        Ok(Self { db })
    }

    pub fn remove(path: &Path) -> StoreResult<()> {
        if path.exists() {
            fs::remove_dir_all(path)?;
        }
        Ok(())
    }
}

impl KvStore for DiskStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.db.insert(key, value)?;
        Ok(())
    }

    fn sync(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }

    fn close(self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }

    fn keys(&self) -> KeyIter<'_> {
        Box::new(self.db.iter().keys().map(|key| key.map(|k| k.to_vec()).map_err(StoreError::from)))
    }
}
