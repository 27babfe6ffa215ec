//! Text normalization: turns raw text into the `Term` sequences the index
//! consumes. Punctuation never makes it into the output.

use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;

use crate::index::Term;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

fn analyze(text: &str) -> Vec<(Term, bool)> {
    let normalized = text.nfkc().collect::<String>();
    RE.find_iter(&normalized)
        .map(|mat| {
            let word = mat.as_str();
            let lower = word.to_lowercase();
            let stop = is_stopword(&lower);
            let stem = STEMMER.stem(&lower).to_string();
            (Term::new(word, stem), stop)
        })
        .collect()
}

/// Terms of a document body, in order, including stopwords so snippets read naturally.
pub fn doc_terms(text: &str) -> Vec<Term> {
    analyze(text).into_iter().map(|(term, _)| term).collect()
}

/// Terms of a user query with stopwords removed. A query made only of
/// stopwords keeps them.
pub fn query_terms(text: &str) -> Vec<Term> {
    let analyzed = analyze(text);
    if analyzed.iter().all(|(_, stop)| *stop) {
        return analyzed.into_iter().map(|(term, _)| term).collect();
    }
    analyzed.into_iter().filter(|(_, stop)| !stop).map(|(term, _)| term).collect()
}
