use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

static CAMEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([a-z])([A-Z])").unwrap());
static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s_]+").unwrap());
static INVALID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9-]").unwrap());
static HYPHENS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").unwrap());

/// Substituted when a name has no slug-able characters at all.
pub const FALLBACK_SLUG: &str = "site";

/// Kebab-case slug: camelCase split, whitespace/underscores to hyphens,
/// everything outside `[a-z0-9-]` dropped.
pub fn slugify(name: &str) -> String {
    let split = CAMEL_RE.replace_all(name.trim(), "$1-$2");
    let hyphenated = SEPARATOR_RE.replace_all(&split, "-");
    let lower = hyphenated.to_lowercase();
    let stripped = INVALID_RE.replace_all(&lower, "");
    let collapsed = HYPHENS_RE.replace_all(&stripped, "-");
    let slug = collapsed.trim_matches('-');
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// Ids handed out during one run. First claim keeps the bare slug; later
/// claims get `-1`, `-2`, ... in claim order.
#[derive(Debug, Default)]
pub struct IdAllocator {
    taken: HashSet<String>,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator::default()
    }

    pub fn assign(&mut self, name: &str) -> String {
        let base = slugify(name);
        if self.taken.insert(base.clone()) {
            return base;
        }
        let mut counter = 1usize;
        loop {
            let candidate = format!("{}-{}", base, counter);
            if self.taken.insert(candidate.clone()) {
                debug!(display_name = %name, id = %candidate, "resolved id collision");
                return candidate;
            }
            counter += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.taken.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basics() {
        assert_eq!(slugify("Hello Rache"), "hello-rache");
        assert_eq!(slugify("OnlineJobs.ph"), "online-jobsph");
        assert_eq!(slugify("Remote_Work  PH"), "remote-work-ph");
        assert_eq!(slugify("A & B"), "a-b");
        assert_eq!(slugify("  --Acme--  "), "acme");
    }

    #[test]
    fn non_latin_names_get_fallback() {
        assert_eq!(slugify("日本語"), FALLBACK_SLUG);
        assert_eq!(slugify(""), FALLBACK_SLUG);
    }

    #[test]
    fn collisions_suffix_in_claim_order() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.assign("Acme"), "acme");
        assert_eq!(ids.assign("ACME"), "acme-1");
        assert_eq!(ids.assign("acme!"), "acme-2");
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn suffix_skips_ids_taken_naturally() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.assign("acme 1"), "acme-1");
        assert_eq!(ids.assign("Acme"), "acme");
        assert_eq!(ids.assign("Acme"), "acme-2");
    }

    #[test]
    fn fallback_ids_stay_unique() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.assign("???"), "site");
        assert_eq!(ids.assign("!!!"), "site-1");
    }

    #[test]
    fn slugs_match_id_alphabet() {
        let re = Regex::new(r"^[a-z0-9-]+$").unwrap();
        for name in ["Café Bonjour", "100% Remote!", "x", "Über_Staff", "\"Quoted\""] {
            assert!(re.is_match(&slugify(name)), "bad slug for {}", name);
        }
    }
}
