//! Approximate matching over name, tags and description.
//!
//! Each query term is scored against the words of a field with Jaro-Winkler;
//! a literal substring hit scores 1.0. A field's score is the mean over query
//! terms, so every term has to land somewhere. A record's score is its best
//! weighted field.

use std::cmp::Ordering;

use crate::model::Listing;

pub const NAME_WEIGHT: f64 = 1.0;
pub const TAGS_WEIGHT: f64 = 0.95;
pub const DESCRIPTION_WEIGHT: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Position of the record in the indexed slice.
    pub index: usize,
    pub score: f64,
}

#[derive(Debug, Clone)]
struct Field {
    weight: f64,
    text: String,
    words: Vec<String>,
}

impl Field {
    fn new(weight: f64, raw: &str) -> Self {
        let text = raw.to_lowercase();
        let words = tokenize(&text);
        Field { weight, text, words }
    }

    fn score(&self, phrase: &str, terms: &[String]) -> f64 {
        if self.text.contains(phrase) {
            return self.weight;
        }
        let total: f64 = terms.iter().map(|t| self.term_score(t)).sum();
        self.weight * total / terms.len() as f64
    }

    fn term_score(&self, term: &str) -> f64 {
        if self.text.contains(term) {
            return 1.0;
        }
        self.words
            .iter()
            .map(|w| strsim::jaro_winkler(term, w))
            .fold(0.0, f64::max)
    }
}

/// Pre-tokenized copy of a record set. Built once per dataset.
#[derive(Debug, Clone, Default)]
pub struct FuzzyIndex {
    docs: Vec<[Field; 3]>,
}

impl FuzzyIndex {
    pub fn build(listings: &[Listing]) -> Self {
        let docs = listings
            .iter()
            .map(|l| {
                [
                    Field::new(NAME_WEIGHT, &l.display_name()),
                    Field::new(TAGS_WEIGHT, &l.tag_list().join(" ")),
                    Field::new(DESCRIPTION_WEIGHT, &l.description),
                ]
            })
            .collect();
        FuzzyIndex { docs }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Hits scoring at least `threshold`, best first; equal scores keep index order.
    /// A blank query yields no hits; callers treat that as "no search".
    pub fn search(&self, query: &str, threshold: f64) -> Vec<Hit> {
        let phrase = query.trim().to_lowercase();
        let terms = tokenize(&phrase);
        if terms.is_empty() {
            return Vec::new();
        }
        let mut hits: Vec<Hit> = self
            .docs
            .iter()
            .enumerate()
            .map(|(index, fields)| Hit {
                index,
                score: fields
                    .iter()
                    .map(|f| f.score(&phrase, &terms))
                    .fold(0.0, f64::max),
            })
            .filter(|h| h.score >= threshold)
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits
    }
}

/// Whether `query` has anything to match on; punctuation alone does not.
pub fn has_terms(query: &str) -> bool {
    query.split(|c: char| !c.is_alphanumeric()).any(|w| !w.is_empty())
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}
