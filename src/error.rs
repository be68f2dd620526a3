use std::fmt;
use std::io;

use thiserror::Error;

use crate::model::Origin;

/// Fatal failures of a pipeline run.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("source '{source_name}' is unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },
    #[error("source '{source_name}' is malformed: {reason}")]
    MalformedSource { source_name: String, reason: String },
    #[error("{count} record(s) failed schema validation")]
    SchemaViolations { count: usize },
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Settings(#[from] config::ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DirectoryError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    SchemaViolation,
    DuplicateUrl,
    CategoryOutOfEnum,
    DescriptionTruncated,
    SourceSkipped,
}

impl IssueKind {
    pub fn severity(self) -> Severity {
        match self {
            IssueKind::SchemaViolation => Severity::Error,
            IssueKind::DuplicateUrl
            | IssueKind::CategoryOutOfEnum
            | IssueKind::DescriptionTruncated
            | IssueKind::SourceSkipped => Severity::Warning,
        }
    }
}

/// One finding tied to a source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub origin: Origin,
    pub field: String,
    pub message: String,
    pub kind: IssueKind,
}

impl Issue {
    pub fn new(origin: &Origin, field: &str, kind: IssueKind, message: impl Into<String>) -> Self {
        Issue {
            origin: origin.clone(),
            field: field.to_string(),
            message: message.into(),
            kind,
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity() {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(
            f,
            "{} {}:{} [{}] {}",
            label, self.origin.source, self.origin.line, self.field, self.message
        )
    }
}

/// Every issue found during one run, in discovery order.
#[derive(Debug, Default, Clone)]
pub struct Report {
    issues: Vec<Issue>,
}

impl Report {
    pub fn new() -> Self {
        Report::default()
    }

    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) {
        self.issues.extend(issues);
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| !i.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(Issue::is_error)
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of distinct records with at least one error.
    pub fn failing_records(&self) -> usize {
        let mut seen: Vec<&Origin> = Vec::new();
        for issue in self.errors() {
            if !seen.contains(&&issue.origin) {
                seen.push(&issue.origin);
            }
        }
        seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(line: u64) -> Origin {
        Origin::new("jobs", line)
    }

    #[test]
    fn only_schema_violations_are_errors() {
        let mut report = Report::new();
        report.push(Issue::new(&origin(2), "url", IssueKind::DuplicateUrl, "dup"));
        report.push(Issue::new(&origin(3), "category", IssueKind::CategoryOutOfEnum, "bad"));
        assert!(!report.has_errors());
        report.push(Issue::new(&origin(4), "name", IssueKind::SchemaViolation, "empty"));
        assert!(report.has_errors());
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.warnings().count(), 2);
    }

    #[test]
    fn failing_records_counts_each_origin_once() {
        let mut report = Report::new();
        report.push(Issue::new(&origin(4), "name", IssueKind::SchemaViolation, "empty"));
        report.push(Issue::new(&origin(4), "url", IssueKind::SchemaViolation, "bad url"));
        report.push(Issue::new(&origin(7), "rating", IssueKind::SchemaViolation, "range"));
        assert_eq!(report.failing_records(), 2);
    }

    #[test]
    fn display_names_source_and_line() {
        let issue = Issue::new(&origin(9), "url", IssueKind::DuplicateUrl, "Duplicate URL");
        assert_eq!(issue.to_string(), "warning jobs:9 [url] Duplicate URL");
    }
}
