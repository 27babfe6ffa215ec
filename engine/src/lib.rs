//! Indexing and retrieval engine: forward/inverted index construction with
//! bounded-size segments, boolean and ranked retrieval, snippet extraction.

pub mod analysis;
pub mod bm25;
pub mod error;
pub mod index;
pub mod indexing;
pub mod pagination;
pub mod persist;
pub mod results;
pub mod search;
pub mod snippet;
pub mod store;

pub use error::{Error, Result};
pub use index::{DocId, Document, IndexMeta, Position, Posting, Score, Term};
pub use indexing::{IndexConfig, IndexWriter, DEFAULT_BLOCK_SIZE};
pub use pagination::{PageLink, SerpPagination};
pub use results::{Hit, SearchResults};
pub use search::Searcher;
pub use snippet::{Snippet, SnippetTerm};
pub use store::{Backend, MemoryRegistry, OpenMode, StoreError};
