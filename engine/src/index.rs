use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

pub type DocId = u32;
pub type Position = u32;
/// Externally supplied popularity signal (e.g. upvotes).
pub type Score = i64;

/// A normalized token. Equality and hashing look only at `stem`;
/// `full_word` is kept for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Term {
    pub full_word: String,
    pub stem: String,
}

impl Term {
    pub fn new(full_word: impl Into<String>, stem: impl Into<String>) -> Self {
        Self { full_word: full_word.into(), stem: stem.into() }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool { self.stem == other.stem }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) { self.stem.hash(state); }
}

/// Forward-index value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Terms in document order; a term's position is its index.
    pub terms: Vec<Term>,
    pub score: Score,
    pub title: String,
}

impl Document {
    pub fn new(terms: Vec<Term>, score: Score, title: impl Into<String>) -> Self {
        Self { terms, score, title: title.into() }
    }

    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub position: Position,
    pub score: Score, // copy of the owning document's score
}

/// Statistics written once a build is finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub doc_count: u32,
    pub total_terms: u64,
    pub average_doclen: f64,
    pub block_count: u32,
    pub created_at: String,
    pub version: u32,
}
