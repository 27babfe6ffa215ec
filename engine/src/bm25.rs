/// BM25 parameter k1 (term frequency saturation).
pub const K1: f64 = 1.5;
/// BM25 parameter b (document length normalization).
pub const B: f64 = 0.75;

/// Floor for [`idf`]. Keeps every matching term's contribution positive, so
/// an extra occurrence cannot push a score down through a negative weight.
pub const MIN_IDF: f64 = f64::EPSILON;

/// `ln((N - n + 0.5) / (n + 0.5))`, floored at [`MIN_IDF`]. `n` is the
/// posting-list length of the term, so repeated occurrences within one
/// document count more than once and `n` can exceed `N`.
pub fn idf(doc_count: u32, postings_len: usize) -> f64 {
    let big_n = doc_count as f64;
    let n = postings_len as f64;
    let ratio = (big_n - n + 0.5) / (n + 0.5);
    if ratio <= 1.0 {
        return MIN_IDF;
    }
    ratio.ln()
}

/// Contribution of one query term to a document's score. `tf` is the
/// occurrence count divided by the document length.
pub fn term_score(idf: f64, tf: f64, doc_len: usize, avg_doc_len: f64) -> f64 {
    let len_ratio = if avg_doc_len > 0.0 { doc_len as f64 / avg_doc_len } else { 1.0 };
    idf * tf * (K1 + 1.0) / (tf + K1 * (1.0 - B + B * len_ratio))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rare_terms_weigh_more() {
        assert!(idf(100, 1) > idf(100, 40));
        assert!(idf(100, 1) > 0.0);
    }

    #[test]
    fn common_terms_are_floored() {
        assert_eq!(idf(10, 9), MIN_IDF);
        // more postings than documents
        assert_eq!(idf(3, 4), MIN_IDF);
        assert_eq!(idf(0, 1), MIN_IDF);
        assert!(idf(10, 4) > MIN_IDF);
    }

    #[test]
    fn higher_tf_scores_higher() {
        let w = idf(100, 5);
        let low = term_score(w, 1.0 / 20.0, 20, 20.0);
        let high = term_score(w, 4.0 / 20.0, 20, 20.0);
        assert!(high > low);
    }

    #[test]
    fn longer_documents_are_penalized() {
        let w = idf(100, 5);
        let short = term_score(w, 0.1, 10, 20.0);
        let long = term_score(w, 0.1, 40, 20.0);
        assert!(short > long);
    }

    #[test]
    fn known_value() {
        // N = 2, n = 1 -> ln(1.5 / 1.5) = 0, floored
        assert_eq!(idf(2, 1), MIN_IDF);
        let w = idf(10, 1);
        let expected = w * 0.5 * 2.5 / (0.5 + 1.5 * (0.25 + 0.75 * 1.0));
        assert!((term_score(w, 0.5, 4, 4.0) - expected).abs() < 1e-12);
    }
}
