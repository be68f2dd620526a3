//! Plain-text rendering of issue reports and timings for the CLI.

use std::time::Duration;

use crate::error::{Issue, Report, Severity};

const SOURCE_WIDTH: usize = 10;
const FIELD_WIDTH: usize = 14;
const MESSAGE_WIDTH: usize = 60;

/// One row per issue, errors first, then warnings, each in discovery order.
pub fn issue_table(report: &Report) -> String {
    if report.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    out.push_str(&format!(
        "{:<7} | {:<sw$} | {:>5} | {:<fw$} | {}\n",
        "Level",
        "Source",
        "Line",
        "Field",
        "Error",
        sw = SOURCE_WIDTH,
        fw = FIELD_WIDTH
    ));
    out.push_str(&"-".repeat(7 + SOURCE_WIDTH + 5 + FIELD_WIDTH + MESSAGE_WIDTH + 12));
    out.push('\n');
    for issue in report.errors().chain(report.warnings()) {
        out.push_str(&issue_row(issue));
        out.push('\n');
    }
    out
}

fn issue_row(issue: &Issue) -> String {
    let level = match issue.severity() {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };
    let line = if issue.origin.line == 0 {
        "-".to_string()
    } else {
        issue.origin.line.to_string()
    };
    format!(
        "{:<7} | {:<sw$} | {:>5} | {:<fw$} | {}",
        level,
        truncate(&issue.origin.source, SOURCE_WIDTH),
        line,
        truncate(&issue.field, FIELD_WIDTH),
        truncate(&issue.message, MESSAGE_WIDTH),
        sw = SOURCE_WIDTH,
        fw = FIELD_WIDTH
    )
}

/// `N error(s) in M record(s), K warning(s)`.
pub fn summary(report: &Report) -> String {
    format!(
        "{} error(s) in {} record(s), {} warning(s)",
        report.error_count(),
        report.failing_records(),
        report.warnings().count()
    )
}

/// Cut to `max` characters total, the last three being `...`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IssueKind;
    use crate::model::Origin;

    #[test]
    fn errors_are_listed_before_warnings() {
        let mut report = Report::new();
        report.push(Issue::new(&Origin::new("listings", 4), "url", IssueKind::DuplicateUrl, "Duplicate URL of jobs:2, skipped"));
        report.push(Issue::new(&Origin::new("jobs", 9), "rating", IssueKind::SchemaViolation, "Rating must be between 1 and 5, got 9"));
        let table = issue_table(&report);
        let rows: Vec<&str> = table.lines().skip(2).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("error   | jobs"));
        assert!(rows[0].contains("|     9 | rating"));
        assert!(rows[1].starts_with("warning | listings"));
        assert_eq!(summary(&report), "1 error(s) in 1 record(s), 1 warning(s)");
    }

    #[test]
    fn source_level_issues_have_no_line() {
        let mut report = Report::new();
        report.push(Issue::new(&Origin::new("groups", 0), "source", IssueKind::SourceSkipped, "missing"));
        assert!(issue_table(&report).contains("|     - |"));
    }

    #[test]
    fn empty_report_renders_nothing() {
        assert!(issue_table(&Report::new()).is_empty());
    }

    #[test]
    fn truncate_and_durations() {
        assert_eq!(truncate("abcdefghij", 6), "abc...");
        assert_eq!(truncate("abc", 6), "abc");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }
}
