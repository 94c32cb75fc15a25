//! Token preprocessing shared by every semantic backend.
//!
//! Words are split on non-alphanumeric characters, then on underscore and
//! camel-case boundaries (`HTTPServerError` -> `HTTP`, `Server`, `Error`).
//! Fragments that are not purely alphabetic (`user2`, `42`), single
//! characters and English stopwords are dropped and the rest are lower-cased
//! and Snowball-stemmed.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;

static WORD_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").unwrap());

static STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "ain", "all", "am", "an", "and", "any",
    "are", "aren", "as", "at", "be", "because", "been", "before", "being", "below", "between",
    "both", "but", "by", "can", "couldn", "d", "did", "didn", "do", "does", "doesn", "doing",
    "don", "down", "during", "each", "few", "for", "from", "further", "had", "hadn", "has",
    "hasn", "have", "haven", "having", "he", "her", "here", "hers", "herself", "him", "himself",
    "his", "how", "i", "if", "in", "into", "is", "isn", "it", "its", "itself", "just", "ll", "m",
    "ma", "me", "mightn", "more", "most", "mustn", "my", "myself", "needn", "no", "nor", "not",
    "now", "o", "of", "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves",
    "out", "over", "own", "re", "s", "same", "shan", "she", "should", "shouldn", "so", "some",
    "such", "t", "than", "that", "the", "their", "theirs", "them", "themselves", "then", "there",
    "these", "they", "this", "those", "through", "to", "too", "under", "until", "up", "ve", "very",
    "was", "wasn", "we", "were", "weren", "what", "when", "where", "which", "while", "who",
    "whom", "why", "will", "with", "won", "wouldn", "y", "you", "your", "yours", "yourself",
    "yourselves",
];

/// Reusable preprocessing pipeline.
pub struct Preprocessor {
    stemmer: Stemmer,
    stop_words: HashSet<&'static str>,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor {
    pub fn new() -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::English),
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    /// Preprocess a bag of words into stemmed terms.
    pub fn terms<'a, I>(&self, words: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        words
            .into_iter()
            .flat_map(|word| WORD_SEPARATOR.split(word))
            .flat_map(split_camel_case)
            .filter(|fragment| fragment.chars().all(char::is_alphabetic))
            .map(|fragment| fragment.to_lowercase())
            .filter(|token| token.chars().count() > 1)
            .filter(|token| !self.stop_words.contains(token.as_str()))
            .map(|token| self.stemmer.stem(&token).into_owned())
            .collect()
    }
}

/// Split an identifier on camel-case boundaries.
///
/// A boundary sits between a lower-case letter and an upper-case one, and
/// before the last capital of an acronym that is followed by a lower-case
/// letter.
pub fn split_camel_case(identifier: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = identifier.char_indices().collect();
    let mut parts = Vec::new();
    let mut start = 0;

    for w in 1..chars.len() {
        let (idx, ch) = chars[w];
        let prev = chars[w - 1].1;
        let next_is_lower = chars.get(w + 1).is_some_and(|(_, c)| c.is_lowercase());
        let boundary = ch.is_uppercase()
            && (prev.is_lowercase() || (prev.is_uppercase() && next_is_lower));
        if boundary {
            parts.push(&identifier[start..idx]);
            start = idx;
        }
    }
    if start < identifier.len() {
        parts.push(&identifier[start..]);
    }
    parts
}
