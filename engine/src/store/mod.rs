//! Ordered key/value stores backing every index structure.
//!
//! Two backends share the [`KvStore`] contract: [`DiskStore`] (sled) for
//! real builds and [`MemoryStore`] for tests. [`Backend`] picks one at
//! construction time; [`Table`] layers typed keys and bincode values on top.

mod disk;
mod memory;

pub use disk::DiskStore;
pub use memory::{MemoryRegistry, MemoryStore};

use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::index::DocId;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Codec(#[from] bincode::Error),

    /// `OpenMode::OpenExisting` on a path with no store.
    #[error("store not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid key: {0}")]
    InvalidKey(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Start from an empty store, discarding anything already at the path.
    CreateNew,
    /// Open a store that must already exist.
    OpenExisting,
}

pub type KeyIter<'a> = Box<dyn Iterator<Item = StoreResult<Vec<u8>>> + 'a>;

/// Byte-level ordered map with an explicit durability lifecycle.
///
/// Writes are only guaranteed durable after `sync` or `close`.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;
    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()>;
    fn sync(&self) -> StoreResult<()>;
    fn close(self) -> StoreResult<()>;
    /// All keys in ascending byte order.
    fn keys(&self) -> KeyIter<'_>;
}

/// Which store implementation an index uses.
#[derive(Debug, Clone, Default)]
pub enum Backend {
    #[default]
    Disk,
    Memory(MemoryRegistry),
}

impl Backend {
    /// Fresh in-memory backend with its own registry.
    pub fn in_memory() -> Self { Backend::Memory(MemoryRegistry::default()) }

    pub fn open(&self, path: &Path, mode: OpenMode) -> StoreResult<AnyStore> {
        match self {
            Backend::Disk => Ok(AnyStore::Disk(DiskStore::open(path, mode)?)),
            Backend::Memory(registry) => Ok(AnyStore::Memory(registry.open(path, mode)?)),
        }
    }

    pub fn exists(&self, path: &Path) -> bool {
        match self {
            Backend::Disk => path.exists(),
            Backend::Memory(registry) => registry.contains(path),
        }
    }

    /// Delete the store at `path`. Missing stores are ignored.
    pub fn remove(&self, path: &Path) -> StoreResult<()> {
        match self {
            Backend::Disk => DiskStore::remove(path),
            Backend::Memory(registry) => {
                registry.remove(path);
                Ok(())
            }
        }
    }
}

pub enum AnyStore {
    Disk(DiskStore),
    Memory(MemoryStore),
}

impl KvStore for AnyStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        match self {
            AnyStore::Disk(s) => s.get(key),
            AnyStore::Memory(s) => s.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        match self {
            AnyStore::Disk(s) => s.set(key, value),
            AnyStore::Memory(s) => s.set(key, value),
        }
    }

    fn sync(&self) -> StoreResult<()> {
        match self {
            AnyStore::Disk(s) => s.sync(),
            AnyStore::Memory(s) => s.sync(),
        }
    }

    fn close(self) -> StoreResult<()> {
        match self {
            AnyStore::Disk(s) => s.close(),
            AnyStore::Memory(s) => s.close(),
        }
    }

    fn keys(&self) -> KeyIter<'_> {
        match self {
            AnyStore::Disk(s) => s.keys(),
            AnyStore::Memory(s) => s.keys(),
        }
    }
}

/// Key types with an order-preserving byte encoding.
pub trait StoreKey: Sized {
    fn encode(&self) -> Vec<u8>;
    fn decode(bytes: &[u8]) -> StoreResult<Self>;
}

impl StoreKey for DocId {
    fn encode(&self) -> Vec<u8> { self.to_be_bytes().to_vec() }

    fn decode(bytes: &[u8]) -> StoreResult<Self> {
        let arr: [u8; 4] = bytes
            .try_into()
            .map_err(|_| StoreError::InvalidKey(format!("expected 4 bytes, got {}", bytes.len())))?;
        Ok(u32::from_be_bytes(arr))
    }
}

impl StoreKey for String {
    fn encode(&self) -> Vec<u8> { self.as_bytes().to_vec() }

    fn decode(bytes: &[u8]) -> StoreResult<Self> {
        String::from_utf8(bytes.to_vec()).map_err(|e| StoreError::InvalidKey(e.to_string()))
    }
}

/// Typed view over a store: `K` keys, bincode-encoded `V` values.
pub struct Table<K, V> {
    store: AnyStore,
    _marker: PhantomData<(K, V)>,
}

impl<K: StoreKey, V: Serialize + DeserializeOwned> Table<K, V> {
    pub fn open(backend: &Backend, path: &Path, mode: OpenMode) -> StoreResult<Self> {
        Ok(Self { store: backend.open(path, mode)?, _marker: PhantomData })
    }

    pub fn get(&self, key: &K) -> StoreResult<Option<V>> {
        match self.store.get(&key.encode())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, key: &K) -> StoreResult<bool> {
        Ok(self.store.get(&key.encode())?.is_some())
    }

    pub fn set(&mut self, key: &K, value: &V) -> StoreResult<()> {
        let bytes = bincode::serialize(value)?;
        self.store.set(&key.encode(), &bytes)
    }

    pub fn sync(&self) -> StoreResult<()> { self.store.sync() }

    pub fn close(self) -> StoreResult<()> { self.store.close() }

    pub fn keys(&self) -> impl Iterator<Item = StoreResult<K>> + '_ {
        self.store.keys().map(|key| key.and_then(|bytes| K::decode(&bytes)))
    }
}
