use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{KeyIter, KvStore, OpenMode, StoreError, StoreResult};

type SharedMap = Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>;

/// Process-local namespace of in-memory stores keyed by path, so a store
/// closed by the writer can be reopened by a reader.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    stores: Arc<Mutex<HashMap<PathBuf, SharedMap>>>,
}

impl MemoryRegistry {
    pub fn open(&self, path: &Path, mode: OpenMode) -> StoreResult<MemoryStore> {
        let mut stores = self.stores.lock();
        let map = match mode {
            OpenMode::CreateNew => {
                let map = SharedMap::default();
                stores.insert(path.to_path_buf(), map.clone());
                map
            }
            OpenMode::OpenExisting => stores
                .get(path)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(path.to_path_buf()))?,
        };
        Ok(MemoryStore { map })
    }

    pub fn remove(&self, path: &Path) {
        self.stores.lock().remove(path);
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.stores.lock().contains_key(path)
    }
}

pub struct MemoryStore {
    map: SharedMap,
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.map.read().get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.map.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn sync(&self) -> StoreResult<()> { Ok(()) }

    fn close(self) -> StoreResult<()> { Ok(()) }

    fn keys(&self) -> KeyIter<'_> {
        Box::new(MemoryKeys { map: &self.map, last: None })
    }
}

/// Ascending key cursor. Each step takes the read lock and seeks past the
/// previous key, so no lock is held between steps.
struct MemoryKeys<'a> {
    map: &'a SharedMap,
    last: Option<Vec<u8>>,
}

impl Iterator for MemoryKeys<'_> {
    type Item = StoreResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let key = {
            let map = self.map.read();
            let mut range = match &self.last {
                Some(last) => map.range::<[u8], _>((Bound::Excluded(last.as_slice()), Bound::Unbounded)),
                None => map.range::<[u8], _>(..),
            };
            range.next().map(|(key, _)| key.clone())
        }?;
        self.last = Some(key.clone());
        Some(Ok(key))
    }
}
