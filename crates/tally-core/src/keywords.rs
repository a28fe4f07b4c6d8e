//! Keyword extraction for learned categorization
//!
//! Splits a transaction description into the significant lowercase words that
//! learned patterns are keyed on. No stemming: "coffee" and "coffees" are
//! different keywords, and the bidirectional substring match in the learned
//! matcher absorbs most of the difference.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

/// Tokens shorter than this (in characters) are dropped
pub const MIN_KEYWORD_LEN: usize = 3;

/// Words that never carry category signal
pub const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "have", "his", "how", "its", "may", "now", "see", "who", "did",
    "get", "she", "too", "use", "with", "from", "this", "that", "they", "them", "their", "were",
    "been", "will", "your", "into", "onto", "upon",
];

fn non_word_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w-]").expect("valid regex"))
}

/// Whether a (lowercase) word is on the stopword list
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Extract the deduplicated set of significant lowercase keywords from a description
pub fn extract_keywords(description: &str) -> BTreeSet<String> {
    let lowered = description.to_lowercase();

    lowered
        .split_whitespace()
        .map(|token| non_word_chars().replace_all(token, "").into_owned())
        .filter(|token| token.chars().count() >= MIN_KEYWORD_LEN)
        .filter(|token| !is_stopword(token))
        .collect()
}
