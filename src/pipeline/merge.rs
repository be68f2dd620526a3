use std::collections::HashMap;

use tracing::{debug, warn};

use super::Draft;
use crate::error::{Issue, IssueKind};
use crate::text::normalize_url;

/// Joins descriptions when a source is opted into text merging.
pub const MERGE_TEXT_SEPARATOR: &str = " | ";

#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// First-seen order across all sources.
    pub records: Vec<Draft>,
    pub issues: Vec<Issue>,
}

/// Accumulates batches in precedence order; first writer per normalized URL wins.
#[derive(Debug, Default)]
pub struct Merger {
    seen: HashMap<String, usize>,
    records: Vec<Draft>,
    issues: Vec<Issue>,
}

impl Merger {
    pub fn new() -> Self {
        Merger::default()
    }

    pub fn push_batch(&mut self, batch: impl IntoIterator<Item = Draft>) {
        for draft in batch {
            self.push(draft);
        }
    }

    pub fn push(&mut self, draft: Draft) {
        // Blank URLs carry no identity; validation reports them.
        if draft.url.trim().is_empty() {
            self.records.push(draft);
            return;
        }

        let key = normalize_url(&draft.url);
        let Some(&idx) = self.seen.get(&key) else {
            self.seen.insert(key, self.records.len());
            self.records.push(draft);
            return;
        };

        let kept = &mut self.records[idx];
        let message = if draft.traits.merge_text && append_text(&mut kept.description, &draft.description) {
            debug!(url = %draft.url, into = %kept.origin, "merged duplicate description");
            format!("Duplicate URL of {}, description appended", kept.origin)
        } else {
            format!("Duplicate URL of {}, skipped", kept.origin)
        };
        warn!(source = %draft.origin.source, line = draft.origin.line, url = %draft.url, "duplicate url");
        self.issues.push(Issue::new(
            &draft.origin,
            "url",
            IssueKind::DuplicateUrl,
            message,
        ));
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn finish(self) -> MergeOutcome {
        MergeOutcome {
            records: self.records,
            issues: self.issues,
        }
    }
}

/// Merge whole batches; earlier batches take precedence.
pub fn merge(batches: impl IntoIterator<Item = Vec<Draft>>) -> MergeOutcome {
    let mut merger = Merger::new();
    for batch in batches {
        merger.push_batch(batch);
    }
    merger.finish()
}

fn append_text(existing: &mut String, extra: &str) -> bool {
    let extra = extra.trim();
    if extra.is_empty() || existing.contains(extra) {
        return false;
    }
    if existing.trim().is_empty() {
        *existing = extra.to_string();
    } else {
        existing.push_str(MERGE_TEXT_SEPARATOR);
        existing.push_str(extra);
    }
    true
}
