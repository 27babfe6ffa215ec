//! Engine error types.

use thiserror::Error;

use crate::index::DocId;
use crate::store::StoreError;

/// Errors surfaced by indexing and query operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A document with this URL was already added in the current session.
    #[error("duplicate url: {0}")]
    DuplicateUrl(String),

    /// Opening, reading, writing or syncing a store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A lookup referenced a doc id absent from the forward index.
    #[error("document {0} missing from forward index")]
    MissingDocument(DocId),

    /// Snippet requested for a document containing none of the query terms.
    #[error("no query term occurs in the document")]
    EmptyWindow,
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
