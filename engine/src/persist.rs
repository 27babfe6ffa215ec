use std::path::{Path, PathBuf};

use crate::index::IndexMeta;
use crate::store::{Backend, OpenMode, StoreResult, Table};

pub const META_VERSION: u32 = 1;
const META_KEY: &str = "index";

/// Locations of every store that makes up an index directory.
#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn forward_index(&self) -> PathBuf { self.root.join("forward_index") }
    pub fn url_to_id(&self) -> PathBuf { self.root.join("url_to_id") }
    pub fn id_to_url(&self) -> PathBuf { self.root.join("id_to_url") }
    pub fn inverted_index(&self) -> PathBuf { self.root.join("inverted_index") }
    pub fn block(&self, n: u32) -> PathBuf { self.root.join(format!("inverted_index_block{n}")) }
    pub fn meta(&self) -> PathBuf { self.root.join("meta") }
}

pub fn save_meta(backend: &Backend, paths: &IndexPaths, meta: &IndexMeta) -> StoreResult<()> {
    let mut table: Table<String, IndexMeta> = Table::open(backend, &paths.meta(), OpenMode::CreateNew)?;
    table.set(&META_KEY.to_string(), meta)?;
    table.close()
}

/// Load the statistics of a finalized index. Fails if the index was never finalized.
pub fn load_meta(backend: &Backend, paths: &IndexPaths) -> StoreResult<IndexMeta> {
    let table: Table<String, IndexMeta> = Table::open(backend, &paths.meta(), OpenMode::OpenExisting)?;
    let meta = table.get(&META_KEY.to_string())?;
    table.close()?;
    meta.ok_or_else(|| crate::store::StoreError::NotFound(paths.meta()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_paths_are_numbered() {
        let paths = IndexPaths::new("/idx");
        assert_eq!(paths.block(0), PathBuf::from("/idx/inverted_index_block0"));
        assert_eq!(paths.block(12), PathBuf::from("/idx/inverted_index_block12"));
    }

    #[test]
    fn meta_round_trips_through_backend() {
        let backend = Backend::in_memory();
        let paths = IndexPaths::new("/idx");
        assert!(load_meta(&backend, &paths).is_err());
        let meta = IndexMeta {
            doc_count: 3,
            total_terms: 12,
            average_doclen: 4.0,
            block_count: 2,
            created_at: "2024-01-01T00:00:00Z".into(),
            version: META_VERSION,
        };
        save_meta(&backend, &paths, &meta).unwrap();
        assert_eq!(load_meta(&backend, &paths).unwrap(), meta);
    }
}
