use serde::Serialize;

/// Pages listed individually before the current page before collapsing into a gap.
const MAX_LEADING_PAGES: usize = 6;
/// Neighbours shown on each side of the current page.
const NEIGHBOURS: usize = 4;

/// One entry of the page-number strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageLink {
    Page(usize),
    Gap,
}

/// Pagination state of a results page. Pages are numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerpPagination {
    current_page: usize,
    page_size: usize,
    total_hits: usize,
    total_pages: usize,
}

impl SerpPagination {
    pub fn new(current_page: usize, page_size: usize, total_hits: usize) -> Self {
        let page_size = page_size.max(1);
        Self { current_page: current_page.max(1), page_size, total_hits, total_pages: total_hits / page_size + 1 }
    }

    pub fn current_page(&self) -> usize { self.current_page }

    pub fn page_size(&self) -> usize { self.page_size }

    pub fn total_hits(&self) -> usize { self.total_hits }

    pub fn total_pages(&self) -> usize { self.total_pages }

    /// Page-number strip around the current page. A current page past the
    /// end is drawn as the last page.
    pub fn strip(&self) -> Vec<PageLink> {
        let current = self.current_page.min(self.total_pages);
        let mut links = Vec::new();
        if current.saturating_sub(1) <= MAX_LEADING_PAGES {
            links.extend((1..current).map(PageLink::Page));
        } else {
            links.push(PageLink::Page(1));
            links.push(PageLink::Gap);
            links.extend((current - NEIGHBOURS..current).map(PageLink::Page));
        }
        let last = self.total_pages.min(current + NEIGHBOURS);
        links.extend((current..=last).map(PageLink::Page));
        if last < self.total_pages {
            links.push(PageLink::Gap);
        }
        links
    }
}
