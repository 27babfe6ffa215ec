use engine::analysis::{doc_terms, query_terms};
use engine::{Backend, DocId, Document, Error, IndexConfig, IndexWriter, Posting, Searcher, Term};
use std::collections::HashMap;
use tempfile::tempdir;

fn terms(words: &[&str]) -> Vec<Term> {
    words.iter().map(|w| Term::new(*w, *w)).collect()
}

fn build(backend: &Backend, dir: &str, block_size: u32, docs: &[(&str, &[&str], i64)]) -> Searcher {
    let config = IndexConfig::default().with_backend(backend.clone()).with_block_size(block_size);
    let mut writer = IndexWriter::start_indexing(dir, config).unwrap();
    for (url, words, score) in docs {
        writer.add_document(url, Document::new(terms(words), *score, format!("title of {url}"))).unwrap();
    }
    writer.finalize().unwrap();
    Searcher::open(dir, backend).unwrap()
}

const CORPUS: &[(&str, &[&str], i64)] = &[
    ("a", &["the", "quick", "brown", "fox"], 10),
    ("b", &["quick", "fox", "jumps"], 5),
    ("c", &["lazy", "dog", "sleeps", "dog"], 7),
    ("d", &["fox", "and", "dog", "fox", "fox"], 1),
    ("e", &["brown", "bread"], 3),
];

const SCENARIO: &[(&str, &[&str], i64)] = &[
    ("A", &["the", "quick", "brown", "fox"], 10),
    ("B", &["quick", "fox", "jumps"], 5),
];

const FILLER_LONG: &[&str] = &["filler", "words", "only"];
const FILLER_SHORT: &[&str] = &["more", "filler"];

#[test]
fn two_document_scenario() {
    let backend = Backend::in_memory();
    let searcher = build(&backend, "/scenario", 2000, SCENARIO);
    let query = terms(&["quick", "fox"]);
    assert_eq!(searcher.find_documents_and(&query).unwrap(), vec![1, 2]);
    let ranked = searcher.find_documents_ranked_by_score(&query).unwrap();
    assert_eq!(ranked, vec![(1, 10), (2, 5)]);
    assert_eq!(searcher.search_or(&query).unwrap().doc_ids(), vec![1, 2]);

    let snippet = searcher.generate_snippet(&query, 2).unwrap();
    assert_eq!((snippet.window_start, snippet.window_end), (0, 1));
    assert_eq!(searcher.get_url(1).unwrap(), "A");
    assert_eq!(searcher.get_title(2).unwrap(), "title of B");
    assert_eq!(searcher.get_doc_id("B").unwrap(), Some(2));
    assert_eq!(searcher.get_doc_id("Z").unwrap(), None);
}

#[test]
fn doc_ids_are_dense_from_one() {
    let backend = Backend::in_memory();
    let searcher = build(&backend, "/dense", 2, CORPUS);
    assert_eq!(searcher.total_doc_count(), 5);
    for doc_id in 1..=5 {
        assert!(searcher.get_document(doc_id).is_ok());
        let url = searcher.get_url(doc_id).unwrap();
        assert_eq!(searcher.get_doc_id(&url).unwrap(), Some(doc_id));
    }
    assert!(matches!(searcher.get_document(6), Err(Error::MissingDocument(6))));
    assert!(matches!(searcher.get_url(0), Err(Error::MissingDocument(0))));
}

#[test]
fn average_doclen_is_persisted() {
    let backend = Backend::in_memory();
    let searcher = build(&backend, "/avg", 2000, CORPUS);
    // 4 + 3 + 4 + 5 + 2 terms over 5 documents
    assert!((searcher.average_doclen() - 18.0 / 5.0).abs() < 1e-12);
    assert_eq!(searcher.meta().total_terms, 18);
}

#[test]
fn duplicate_url_fails_and_keeps_count() {
    let config = IndexConfig::default().with_backend(Backend::in_memory());
    let mut writer = IndexWriter::start_indexing("/dup", config).unwrap();
    writer.add_document("x", Document::new(terms(&["a"]), 1, "x")).unwrap();
    let err = writer.add_document("x", Document::new(terms(&["b"]), 1, "x")).unwrap_err();
    assert!(matches!(err, Error::DuplicateUrl(_)));
    assert_eq!(writer.doc_count(), 1);
}

fn posting_multisets(searcher: &Searcher, stems: &[&str]) -> HashMap<String, Vec<Posting>> {
    stems
        .iter()
        .map(|stem| {
            let mut postings = searcher.postings(stem).unwrap();
            postings.sort_by_key(|p| (p.doc_id, p.position));
            (stem.to_string(), postings)
        })
        .collect()
}

#[test]
fn merge_is_independent_of_block_size() {
    let stems = ["the", "quick", "brown", "fox", "jumps", "lazy", "dog", "sleeps", "and", "bread", "missing"];
    let backend = Backend::in_memory();
    let one = posting_multisets(&build(&backend, "/b1", 1, CORPUS), &stems);
    let two = posting_multisets(&build(&backend, "/b2", 2, CORPUS), &stems);
    let all = posting_multisets(&build(&backend, "/bn", 2000, CORPUS), &stems);
    assert_eq!(one, all);
    assert_eq!(two, all);
    assert_eq!(all["fox"].len(), 5);
    assert!(all["missing"].is_empty());
}

#[test]
fn postings_keep_indexing_order() {
    let backend = Backend::in_memory();
    let searcher = build(&backend, "/order", 1, CORPUS);
    let fox: Vec<(DocId, u32)> = searcher.postings("fox").unwrap().iter().map(|p| (p.doc_id, p.position)).collect();
    assert_eq!(fox, vec![(1, 3), (2, 1), (4, 0), (4, 3), (4, 4)]);
    assert!(searcher.postings("fox").unwrap().iter().filter(|p| p.doc_id == 4).all(|p| p.score == 1));
}

#[test]
fn and_is_subset_of_or() {
    let backend = Backend::in_memory();
    let searcher = build(&backend, "/andor", 2, CORPUS);
    let queries: Vec<Vec<Term>> = vec![
        terms(&["fox"]),
        terms(&["fox", "dog"]),
        terms(&["brown", "fox", "quick"]),
        terms(&["fox", "unknown"]),
        terms(&["dog", "dog"]),
    ];
    for q in &queries {
        let and = searcher.find_documents_and(q).unwrap();
        let or = searcher.find_documents_or(q).unwrap();
        assert!(and.iter().all(|d| or.contains(d)), "{and:?} not within {or:?}");
    }
    assert_eq!(searcher.find_documents_and(&terms(&["fox", "dog"])).unwrap(), vec![4]);
    assert!(searcher.find_documents_and(&terms(&["fox", "unknown"])).unwrap().is_empty());
    // repeated query terms count once
    assert_eq!(searcher.find_documents_and(&terms(&["dog", "dog"])).unwrap(), vec![3, 4]);
    assert!(searcher.find_documents_and(&[]).unwrap().is_empty());
    assert!(searcher.find_documents_or(&[]).unwrap().is_empty());
}

#[test]
fn bm25_prefers_denser_matches() {
    let backend = Backend::in_memory();
    let mut docs = CORPUS.to_vec();
    for (i, url) in ["f", "g", "h", "i", "j", "k"].into_iter().enumerate() {
        docs.push((url, if i % 2 == 0 { FILLER_LONG } else { FILLER_SHORT }, 0));
    }
    let searcher = build(&backend, "/bm25", 3, &docs);
    let ranked = searcher.find_documents_ranked_by_bm25(&terms(&["dog"])).unwrap();
    // "dog" is 2 of 4 terms in c and 1 of 5 in d
    assert_eq!(ranked.iter().map(|(d, _)| *d).collect::<Vec<_>>(), vec![3, 4]);
    assert!(ranked[0].1 > ranked[1].1);

    let results = searcher.search_bm25(&terms(&["fox", "quick"])).unwrap();
    assert_eq!(results.total_hits(), 3);
    let scores: Vec<f64> = results.hits().iter().map(|h| h.score).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

const FREQUENT: &[(&str, &[&str], i64)] = &[
    ("r1", &["rust", "rust", "rust", "tips"], 1),
    ("r2", &["rust", "go"], 1),
    ("r3", &["garden"], 1),
];

#[test]
fn bm25_stays_finite_when_postings_outnumber_documents() {
    let backend = Backend::in_memory();
    let searcher = build(&backend, "/frequent", 2, FREQUENT);
    assert_eq!(searcher.postings("rust").unwrap().len(), 4);

    let ranked = searcher.find_documents_ranked_by_bm25(&terms(&["rust"])).unwrap();
    let mut ids: Vec<DocId> = ranked.iter().map(|(d, _)| *d).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2]);
    assert!(ranked.iter().all(|(_, s)| s.is_finite() && *s > 0.0));
    assert!(ranked[0].1 >= ranked[1].1);

    let results = searcher.search_bm25(&terms(&["rust", "garden"])).unwrap();
    assert_eq!(results.total_hits(), 3);
    assert!(results.hits().iter().all(|h| h.score.is_finite()));
    assert!(results.hits().windows(2).all(|w| w[0].score >= w[1].score));
}

const FILLER_SIX: &[&str] = &["filler", "text", "for", "the", "corpus", "here"];
const OTHER_DOG: &[&str] = &["dog", "runs", "far", "away", "from", "home"];

#[test]
fn extra_occurrence_never_lowers_bm25_score() {
    let urls: Vec<String> = (0..38).map(|i| format!("filler{i}")).collect();
    let base = ["dog", "sits", "in", "the", "warm", "sun"];
    let mut previous = 0.0;
    for extra in 0..3 {
        let mut target: Vec<&str> = base.to_vec();
        target.extend(std::iter::repeat("dog").take(extra));

        let mut docs: Vec<(&str, &[&str], i64)> = urls.iter().map(|u| (u.as_str(), FILLER_SIX, 0)).collect();
        docs.push(("other", OTHER_DOG, 0));
        docs.push(("target", target.as_slice(), 0));

        let backend = Backend::in_memory();
        let searcher = build(&backend, "/mono", 16, &docs);
        let target_id = searcher.get_doc_id("target").unwrap().unwrap();
        let ranked = searcher.find_documents_ranked_by_bm25(&terms(&["dog"])).unwrap();
        let score = ranked.iter().find(|(d, _)| *d == target_id).map(|(_, s)| *s).unwrap();
        assert!(score >= previous, "{extra} extra occurrences scored {score} < {previous}");
        previous = score;
    }
}

#[test]
fn snippets_only_flag_query_terms() {
    let backend = Backend::in_memory();
    let searcher = build(&backend, "/snip", 2, CORPUS);
    let query = terms(&["fox", "dog"]);
    for doc_id in searcher.find_documents_or(&query).unwrap() {
        let snippet = searcher.generate_snippet(&query, doc_id).unwrap();
        for t in snippet.terms.iter().filter(|t| t.is_query_term) {
            assert!(t.text == "fox" || t.text == "dog");
        }
    }
    assert!(matches!(searcher.generate_snippet(&query, 5), Err(Error::EmptyWindow)));
}

#[test]
fn disk_index_round_trip() {
    let dir = tempdir().unwrap();
    let index_dir = dir.path().join("index");
    let texts = [
        ("http://example.com/1", "Learning Rust ownership and borrowing", 12),
        ("http://example.com/2", "Borrowing rules in Rust explained", 30),
        ("http://example.com/3", "Python decorators for beginners", 4),
    ];
    {
        let config = IndexConfig::default().with_block_size(2);
        let mut writer = IndexWriter::start_indexing(&index_dir, config).unwrap();
        for (url, text, score) in texts {
            writer.add_document(url, Document::new(doc_terms(text), score, text)).unwrap();
            writer.sync().unwrap();
        }
        let meta = writer.finalize().unwrap();
        assert_eq!(meta.block_count, 2);
    }
    assert!(!index_dir.join("inverted_index_block0").exists());
    assert!(index_dir.join("inverted_index").exists());

    let searcher = Searcher::open(&index_dir, &Backend::Disk).unwrap();
    let query = query_terms("rust borrowing");
    let results = searcher.search_or(&query).unwrap();
    assert_eq!(results.doc_ids(), vec![2, 1]);
    assert_eq!(searcher.search_and(&query).unwrap(), vec![1, 2]);
    let snippet = searcher.generate_snippet(&query, 1).unwrap();
    assert!(snippet.to_html().contains("<em>Rust</em>"));
}

#[test]
fn restarted_build_is_not_mistaken_for_finished() {
    let dir = tempdir().unwrap();
    let index_dir = dir.path().join("index");
    let fox: Vec<Term> = terms(&["fox"]);
    {
        let config = IndexConfig::default().with_block_size(2);
        let mut writer = IndexWriter::start_indexing(&index_dir, config).unwrap();
        for i in 0..5 {
            writer.add_document(&format!("http://f/{i}"), Document::new(fox.clone(), 1, "fox")).unwrap();
        }
        writer.finalize().unwrap();
    }
    assert!(Searcher::open(&index_dir, &Backend::Disk).is_ok());
    {
        let mut writer = IndexWriter::start_indexing(&index_dir, IndexConfig::default()).unwrap();
        writer.add_document("http://f/new", Document::new(fox.clone(), 1, "fox")).unwrap();
        writer.sync().unwrap();
    }
    assert!(!index_dir.join("inverted_index").exists());
    assert!(matches!(Searcher::open(&index_dir, &Backend::Disk), Err(Error::Store(_))));

    let writer = IndexWriter::start_indexing(&index_dir, IndexConfig::default()).unwrap();
    writer.finalize().unwrap();
    let searcher = Searcher::open(&index_dir, &Backend::Disk).unwrap();
    assert_eq!(searcher.total_doc_count(), 0);
    assert!(searcher.find_documents_or(&fox).unwrap().is_empty());
}

#[test]
fn unfinalized_index_cannot_be_opened() {
    let backend = Backend::in_memory();
    let config = IndexConfig::default().with_backend(backend.clone());
    let mut writer = IndexWriter::start_indexing("/partial", config).unwrap();
    writer.add_document("u", Document::new(terms(&["x"]), 1, "u")).unwrap();
    writer.sync().unwrap();
    assert!(matches!(Searcher::open("/partial", &backend), Err(Error::Store(_))));
}
