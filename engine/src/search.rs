//! Read-only queries over a finalized index.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

use crate::bm25;
use crate::error::{Error, Result};
use crate::index::{DocId, Document, IndexMeta, Posting, Score, Term};
use crate::persist::{load_meta, IndexPaths};
use crate::results::{Hit, SearchResults};
use crate::snippet::{generate_snippet, Snippet};
use crate::store::{Backend, OpenMode, Table};

/// Handle on a finalized index. Construct once with [`Searcher::open`] and
/// share it; no method mutates the index.
pub struct Searcher {
    forward: Table<DocId, Document>,
    inverted: Table<String, Vec<Posting>>,
    url_to_id: Table<String, DocId>,
    id_to_url: Table<DocId, String>,
    meta: IndexMeta,
}

fn distinct_stems(terms: &[Term]) -> BTreeSet<&str> {
    terms.iter().map(|t| t.stem.as_str()).collect()
}

impl Searcher {
    pub fn open<P: AsRef<Path>>(index_dir: P, backend: &Backend) -> Result<Self> {
        let paths = IndexPaths::new(index_dir);
        let meta = load_meta(backend, &paths)?;
        let searcher = Self {
            forward: Table::open(backend, &paths.forward_index(), OpenMode::OpenExisting)?,
            inverted: Table::open(backend, &paths.inverted_index(), OpenMode::OpenExisting)?,
            url_to_id: Table::open(backend, &paths.url_to_id(), OpenMode::OpenExisting)?,
            id_to_url: Table::open(backend, &paths.id_to_url(), OpenMode::OpenExisting)?,
            meta,
        };
        info!(
            index_dir = %paths.root.display(),
            doc_count = searcher.meta.doc_count,
            average_doclen = searcher.meta.average_doclen,
            "index opened"
        );
        Ok(searcher)
    }

    pub fn meta(&self) -> &IndexMeta { &self.meta }

    pub fn total_doc_count(&self) -> u32 { self.meta.doc_count }

    pub fn average_doclen(&self) -> f64 { self.meta.average_doclen }

    /// Posting list of `stem`; unknown stems have none.
    pub fn postings(&self, stem: &str) -> Result<Vec<Posting>> {
        Ok(self.inverted.get(&stem.to_string())?.unwrap_or_default())
    }

    pub fn get_document(&self, doc_id: DocId) -> Result<Document> {
        self.forward.get(&doc_id)?.ok_or(Error::MissingDocument(doc_id))
    }

    pub fn get_document_text(&self, doc_id: DocId) -> Result<Vec<Term>> {
        Ok(self.get_document(doc_id)?.terms)
    }

    pub fn get_title(&self, doc_id: DocId) -> Result<String> {
        Ok(self.get_document(doc_id)?.title)
    }

    pub fn get_url(&self, doc_id: DocId) -> Result<String> {
        self.id_to_url.get(&doc_id)?.ok_or(Error::MissingDocument(doc_id))
    }

    pub fn get_doc_id(&self, url: &str) -> Result<Option<DocId>> {
        Ok(self.url_to_id.get(&url.to_string())?)
    }

    /// Documents containing every distinct query stem. An empty query matches nothing.
    pub fn find_documents_and(&self, query: &[Term]) -> Result<Vec<DocId>> {
        let stems = distinct_stems(query);
        if stems.is_empty() {
            return Ok(Vec::new());
        }
        let mut coverage: HashMap<DocId, usize> = HashMap::new();
        for stem in &stems {
            let docs: HashSet<DocId> = self.postings(stem)?.iter().map(|p| p.doc_id).collect();
            for doc_id in docs {
                *coverage.entry(doc_id).or_insert(0) += 1;
            }
        }
        let mut matched: Vec<DocId> = coverage
            .into_iter()
            .filter(|(_, covered)| *covered == stems.len())
            .map(|(doc_id, _)| doc_id)
            .collect();
        matched.sort_unstable();
        Ok(matched)
    }

    /// Documents containing any query stem, ascending by id.
    pub fn find_documents_or(&self, query: &[Term]) -> Result<Vec<DocId>> {
        Ok(self.matching_scores(query)?.into_keys().collect::<BTreeSet<_>>().into_iter().collect())
    }

    fn matching_scores(&self, query: &[Term]) -> Result<HashMap<DocId, Score>> {
        let mut matched = HashMap::new();
        for stem in distinct_stems(query) {
            for posting in self.postings(stem)? {
                matched.insert(posting.doc_id, posting.score);
            }
        }
        Ok(matched)
    }

    /// Union of matches ordered by popularity score, highest first.
    pub fn find_documents_ranked_by_score(&self, query: &[Term]) -> Result<Vec<(DocId, Score)>> {
        let mut ranked: Vec<(DocId, Score)> = self.matching_scores(query)?.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        Ok(ranked)
    }

    /// Union of matches ordered by BM25 score, highest first.
    pub fn find_documents_ranked_by_bm25(&self, query: &[Term]) -> Result<Vec<(DocId, f64)>> {
        let n = self.meta.doc_count;
        let avgdl = self.meta.average_doclen;
        let mut doc_lens: HashMap<DocId, usize> = HashMap::new();
        let mut scores: HashMap<DocId, f64> = HashMap::new();

        for stem in distinct_stems(query) {
            let postings = self.postings(stem)?;
            if postings.is_empty() {
                continue;
            }
            let idf = bm25::idf(n, postings.len());
            let mut occurrences: HashMap<DocId, usize> = HashMap::new();
            for posting in &postings {
                *occurrences.entry(posting.doc_id).or_insert(0) += 1;
            }
            for (doc_id, count) in occurrences {
                let doc_len = match doc_lens.get(&doc_id) {
                    Some(len) => *len,
                    None => {
                        let len = self.get_document(doc_id)?.len();
                        doc_lens.insert(doc_id, len);
                        len
                    }
                };
                let tf = count as f64 / doc_len.max(1) as f64;
                *scores.entry(doc_id).or_insert(0.0) += bm25::term_score(idf, tf, doc_len, avgdl);
            }
        }

        let mut ranked: Vec<(DocId, f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        debug!(hits = ranked.len(), "bm25 ranking done");
        Ok(ranked)
    }

    pub fn search_and(&self, query: &[Term]) -> Result<Vec<DocId>> {
        self.find_documents_and(query)
    }

    pub fn search_or(&self, query: &[Term]) -> Result<SearchResults> {
        let hits = self
            .find_documents_ranked_by_score(query)?
            .into_iter()
            .map(|(doc_id, score)| Hit { doc_id, score: score as f64 })
            .collect();
        Ok(SearchResults::new(hits))
    }

    pub fn search_bm25(&self, query: &[Term]) -> Result<SearchResults> {
        let hits = self
            .find_documents_ranked_by_bm25(query)?
            .into_iter()
            .map(|(doc_id, score)| Hit { doc_id, score })
            .collect();
        Ok(SearchResults::new(hits))
    }

    /// Snippet of `doc_id` for `query`. Only valid for documents the same
    /// query matched.
    pub fn generate_snippet(&self, query: &[Term], doc_id: DocId) -> Result<Snippet> {
        let terms = self.get_document_text(doc_id)?;
        generate_snippet(&terms, query)
    }
}
