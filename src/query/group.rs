use std::collections::BTreeMap;
use std::fmt;

use crate::model::Listing;
use crate::text::sanitize_name;

/// First-letter bucket of a listing name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bucket {
    Letter(char),
    Other,
}

impl Bucket {
    pub fn of(name: &str) -> Bucket {
        match sanitize_name(name).chars().next() {
            Some(c) if c.is_ascii_alphabetic() => Bucket::Letter(c.to_ascii_uppercase()),
            _ => Bucket::Other,
        }
    }

    /// `A`..=`Z` then the catch-all.
    pub fn all() -> Vec<Bucket> {
        ('A'..='Z').map(Bucket::Letter).chain([Bucket::Other]).collect()
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Letter(c) => write!(f, "{}", c),
            Bucket::Other => f.write_str("#"),
        }
    }
}

/// Jump index over a visible result set: every bucket, and whether any
/// visible record falls into it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JumpIndex {
    counts: BTreeMap<Bucket, usize>,
}

impl JumpIndex {
    pub fn build<'a>(visible: impl IntoIterator<Item = &'a Listing>) -> Self {
        let mut counts = BTreeMap::new();
        for listing in visible {
            *counts.entry(Bucket::of(&listing.name)).or_insert(0) += 1;
        }
        JumpIndex { counts }
    }

    pub fn is_enabled(&self, bucket: Bucket) -> bool {
        self.counts.contains_key(&bucket)
    }

    pub fn count(&self, bucket: Bucket) -> usize {
        self.counts.get(&bucket).copied().unwrap_or(0)
    }

    pub fn enabled(&self) -> impl Iterator<Item = Bucket> + '_ {
        self.counts.keys().copied()
    }

    /// Full alphabet with enabled flags, in display order.
    pub fn entries(&self) -> Vec<(Bucket, bool)> {
        Bucket::all()
            .into_iter()
            .map(|b| (b, self.is_enabled(b)))
            .collect()
    }

    /// One-line rendering, disabled buckets shown as `.`.
    pub fn render(&self) -> String {
        self.entries()
            .into_iter()
            .map(|(b, on)| if on { b.to_string() } else { ".".to_string() })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_by_first_letter() {
        assert_eq!(Bucket::of("upwork"), Bucket::Letter('U'));
        assert_eq!(Bucket::of("\"Acme\""), Bucket::Letter('A'));
        assert_eq!(Bucket::of("99designs"), Bucket::Other);
        assert_eq!(Bucket::of("Ñandu"), Bucket::Other);
        assert_eq!(Bucket::of(""), Bucket::Other);
    }

    #[test]
    fn all_has_27_buckets_in_order() {
        let all = Bucket::all();
        assert_eq!(all.len(), 27);
        assert_eq!(all[0], Bucket::Letter('A'));
        assert_eq!(all[26], Bucket::Other);
        assert!(Bucket::Letter('Z') < Bucket::Other);
    }
}
