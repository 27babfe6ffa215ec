//! Query-relevant excerpts: the shortest run of terms covering the most
//! distinct query terms, padded with context.

use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{Error, Result};
use crate::index::Term;

/// Terms of context added on each side of the best window.
pub const CONTEXT_TERMS: usize = 8;
pub const MAX_SNIPPET_TERMS: usize = 50;
pub const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnippetTerm {
    pub text: String,
    pub is_query_term: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snippet {
    pub terms: Vec<SnippetTerm>,
    /// First and last document position of the best window, before padding.
    pub window_start: usize,
    pub window_end: usize,
}

impl Snippet {
    pub fn to_plain(&self) -> String {
        self.terms.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" ")
    }

    /// Space-joined, HTML-escaped text with query terms wrapped in `<em>`.
    pub fn to_html(&self) -> String {
        self.terms
            .iter()
            .map(|t| {
                let text = escape_html(&t.text);
                if t.is_query_term { format!("<em>{text}</em>") } else { text }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, Copy)]
struct Window {
    start: usize,
    end: usize,
    distinct: usize,
}

impl Window {
    fn len(&self) -> usize { self.end - self.start + 1 }

    fn beats(&self, other: &Window) -> bool {
        self.distinct > other.distinct || (self.distinct == other.distinct && self.len() < other.len())
    }
}

/// Build the snippet of `doc` for `query`. Fails with [`Error::EmptyWindow`]
/// when no query term occurs in the document.
pub fn generate_snippet(doc: &[Term], query: &[Term]) -> Result<Snippet> {
    let query_stems: HashSet<&str> = query.iter().map(|t| t.stem.as_str()).collect();

    let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut best: Option<Window> = None;

    for (pos, term) in doc.iter().enumerate() {
        let stem = term.stem.as_str();
        if !query_stems.contains(stem) {
            continue;
        }
        queue.push_back((stem, pos));
        *counts.entry(stem).or_insert(0) += 1;

        // A repeat of the leftmost term makes the leftmost occurrence redundant.
        if queue.len() > 1 && queue.front().map(|(s, _)| *s) == Some(stem) {
            if let Some((dropped, _)) = queue.pop_front() {
                if let Some(n) = counts.get_mut(dropped) {
                    *n -= 1;
                    if *n == 0 {
                        counts.remove(dropped);
                    }
                }
            }
        }

        let start = queue.front().map_or(pos, |(_, p)| *p);
        let candidate = Window { start, end: pos, distinct: counts.len() };
        if best.map_or(true, |b| candidate.beats(&b)) {
            best = Some(candidate);
        }
    }

    let best = best.ok_or(Error::EmptyWindow)?;
    let start = best.start.saturating_sub(CONTEXT_TERMS);
    let end = (best.end + CONTEXT_TERMS).min(doc.len() - 1);

    let render = |terms: &[Term]| -> Vec<SnippetTerm> {
        terms
            .iter()
            .map(|t| SnippetTerm { text: t.full_word.clone(), is_query_term: query_stems.contains(t.stem.as_str()) })
            .collect()
    };

    let terms = if end - start + 1 > MAX_SNIPPET_TERMS {
        let half = MAX_SNIPPET_TERMS / 2;
        let mut terms = render(&doc[start..start + half]);
        terms.push(SnippetTerm { text: ELLIPSIS.to_string(), is_query_term: false });
        terms.extend(render(&doc[end + 1 - half..=end]));
        terms
    } else {
        render(&doc[start..=end])
    };

    Ok(Snippet { terms, window_start: best.start, window_end: best.end })
}
