use serde::Serialize;

use crate::index::DocId;
use crate::pagination::SerpPagination;

/// A matched document and the value it was ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Hit {
    pub doc_id: DocId,
    pub score: f64,
}

/// Ordered result list of one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResults {
    hits: Vec<Hit>,
}

impl SearchResults {
    /// `hits` must already be in rank order.
    pub fn new(hits: Vec<Hit>) -> Self { Self { hits } }

    /// Results with no ranking signal, kept in the given order.
    pub fn unranked(doc_ids: Vec<DocId>) -> Self {
        Self { hits: doc_ids.into_iter().map(|doc_id| Hit { doc_id, score: 0.0 }).collect() }
    }

    pub fn total_hits(&self) -> usize { self.hits.len() }

    pub fn is_empty(&self) -> bool { self.hits.is_empty() }

    pub fn hits(&self) -> &[Hit] { &self.hits }

    pub fn doc_ids(&self) -> Vec<DocId> { self.hits.iter().map(|h| h.doc_id).collect() }

    /// Hits on 1-based `page`. Out-of-range pages are empty.
    pub fn page_hits(&self, page: usize, page_size: usize) -> &[Hit] {
        if page == 0 || page_size == 0 {
            return &[];
        }
        let start = (page - 1).saturating_mul(page_size);
        if start >= self.hits.len() {
            return &[];
        }
        let end = start.saturating_add(page_size).min(self.hits.len());
        &self.hits[start..end]
    }

    pub fn get_page(&self, page: usize, page_size: usize) -> Vec<DocId> {
        self.page_hits(page, page_size).iter().map(|h| h.doc_id).collect()
    }

    pub fn pagination(&self, page: usize, page_size: usize) -> SerpPagination {
        SerpPagination::new(page, page_size, self.total_hits())
    }
}
