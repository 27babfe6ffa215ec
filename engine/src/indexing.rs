//! Append-only indexing sessions.
//!
//! Postings are written to a fresh segment store every `block_size`
//! documents so the working set of the inverted index stays bounded during a
//! large build. [`IndexWriter::finalize`] merges the segments into the final
//! inverted index by reading them one key at a time.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::index::{DocId, Document, IndexMeta, Position, Posting};
use crate::persist::{save_meta, IndexPaths, META_VERSION};
use crate::store::{Backend, OpenMode, Table};

pub const DEFAULT_BLOCK_SIZE: u32 = 2000;

#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Documents per inverted-index segment.
    pub block_size: u32,
    pub backend: Backend,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { block_size: DEFAULT_BLOCK_SIZE, backend: Backend::Disk }
    }
}

impl IndexConfig {
    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }
}

type Segment = Table<String, Vec<Posting>>;

/// Writer side of an index directory. Consumed by [`IndexWriter::finalize`];
/// a finalized index is never reopened for writing.
pub struct IndexWriter {
    paths: IndexPaths,
    config: IndexConfig,
    forward: Table<DocId, Document>,
    url_to_id: Table<String, DocId>,
    id_to_url: Table<DocId, String>,
    segment: Option<Segment>,
    doc_count: u32,
    block_count: u32,
    total_terms: u64,
}

impl IndexWriter {
    /// Begin a session in `index_dir`, discarding any index already there.
    pub fn start_indexing<P: AsRef<Path>>(index_dir: P, mut config: IndexConfig) -> Result<Self> {
        config.block_size = config.block_size.max(1);
        let paths = IndexPaths::new(index_dir);
        let backend = &config.backend;
        clear_previous_build(backend, &paths)?;
        let forward = Table::open(backend, &paths.forward_index(), OpenMode::CreateNew)?;
        let url_to_id = Table::open(backend, &paths.url_to_id(), OpenMode::CreateNew)?;
        let id_to_url = Table::open(backend, &paths.id_to_url(), OpenMode::CreateNew)?;
        info!(index_dir = %paths.root.display(), block_size = config.block_size, "indexing started");
        Ok(Self {
            paths,
            config,
            forward,
            url_to_id,
            id_to_url,
            segment: None,
            doc_count: 0,
            block_count: 0,
            total_terms: 0,
        })
    }

    pub fn doc_count(&self) -> u32 { self.doc_count }

    pub fn block_count(&self) -> u32 { self.block_count }

    /// Add one document and return its id. Fails with [`Error::DuplicateUrl`]
    /// without touching any state if `url` was already added.
    pub fn add_document(&mut self, url: &str, document: Document) -> Result<DocId> {
        let url_key = url.to_string();
        if self.url_to_id.contains(&url_key)? {
            return Err(Error::DuplicateUrl(url_key));
        }
        let doc_id = self.doc_count + 1;

        // Group by stem so each segment list is read and written once per document.
        let mut by_stem: HashMap<&str, Vec<Posting>> = HashMap::new();
        for (position, term) in document.terms.iter().enumerate() {
            by_stem.entry(term.stem.as_str()).or_default().push(Posting {
                doc_id,
                position: position as Position,
                score: document.score,
            });
        }
        let segment = self.current_segment()?;
        for (stem, postings) in by_stem {
            let key = stem.to_string();
            let mut list = segment.get(&key)?.unwrap_or_default();
            list.extend(postings);
            segment.set(&key, &list)?;
        }

        self.url_to_id.set(&url_key, &doc_id)?;
        self.id_to_url.set(&doc_id, &url_key)?;
        self.total_terms += document.terms.len() as u64;
        self.forward.set(&doc_id, &document)?;
        self.doc_count = doc_id;
        Ok(doc_id)
    }

    /// Segment the next document goes to, opening a new one every
    /// `block_size` documents.
    fn current_segment(&mut self) -> Result<&mut Segment> {
        match self.segment.take() {
            Some(segment) if self.doc_count % self.config.block_size != 0 => Ok(self.segment.insert(segment)),
            previous => {
                if let Some(previous) = previous {
                    previous.close()?;
                }
                let path = self.paths.block(self.block_count);
                let next = Table::open(&self.config.backend, &path, OpenMode::CreateNew)?;
                self.block_count += 1;
                debug!(block = self.block_count - 1, doc_count = self.doc_count, "opened segment");
                Ok(self.segment.insert(next))
            }
        }
    }

    /// Checkpoint everything written so far without closing.
    pub fn sync(&self) -> Result<()> {
        self.forward.sync()?;
        self.url_to_id.sync()?;
        self.id_to_url.sync()?;
        if let Some(segment) = &self.segment {
            segment.sync()?;
        }
        debug!(doc_count = self.doc_count, "index synced");
        Ok(())
    }

    /// Close the session: merge all segments into the final inverted index,
    /// persist the corpus statistics, and remove the segments.
    pub fn finalize(self) -> Result<IndexMeta> {
        let IndexWriter { paths, config, forward, url_to_id, id_to_url, segment, doc_count, block_count, total_terms } = self;
        forward.close()?;
        url_to_id.close()?;
        id_to_url.close()?;
        if let Some(segment) = segment {
            segment.close()?;
        }

        merge_segments(&config.backend, &paths, block_count)?;

        let average_doclen = if doc_count == 0 { 0.0 } else { total_terms as f64 / doc_count as f64 };
        let meta = IndexMeta {
            doc_count,
            total_terms,
            average_doclen,
            block_count,
            created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
            version: META_VERSION,
        };
        save_meta(&config.backend, &paths, &meta)?;

        for n in 0..block_count {
            config.backend.remove(&paths.block(n))?;
        }
        info!(doc_count, block_count, average_doclen, "index finalized");
        Ok(meta)
    }
}

/// Remove every store a previous build in `paths` may have left, the meta
/// store first so a half-cleared directory never opens as finalized.
fn clear_previous_build(backend: &Backend, paths: &IndexPaths) -> Result<()> {
    backend.remove(&paths.meta())?;
    backend.remove(&paths.inverted_index())?;
    let mut n = 0;
    while backend.exists(&paths.block(n)) {
        backend.remove(&paths.block(n))?;
        n += 1;
    }
    if n > 0 {
        debug!(segments = n, "removed stale segments");
    }
    Ok(())
}

/// Per-key union of segment posting lists, in segment order. Only the key
/// set and the list being assembled are held in memory.
fn merge_segments(backend: &Backend, paths: &IndexPaths, block_count: u32) -> Result<()> {
    let segments: Vec<Segment> = (0..block_count)
        .map(|n| Table::open(backend, &paths.block(n), OpenMode::OpenExisting))
        .collect::<std::result::Result<_, _>>()?;

    let mut keys = BTreeSet::new();
    for segment in &segments {
        for key in segment.keys() {
            keys.insert(key?);
        }
    }
    info!(segments = segments.len(), terms = keys.len(), "merging segments");

    let mut inverted: Segment = Table::open(backend, &paths.inverted_index(), OpenMode::CreateNew)?;
    for key in &keys {
        let mut merged = Vec::new();
        for segment in &segments {
            if let Some(postings) = segment.get(key)? {
                merged.extend(postings);
            }
        }
        inverted.set(key, &merged)?;
    }
    inverted.close()?;
    for segment in segments {
        segment.close()?;
    }
    Ok(())
}
