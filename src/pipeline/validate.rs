//! Record schema checks: every draft either becomes a [`Listing`] or yields
//! one issue per failing field. Nothing stops at the first failure.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;
use url::Url;

use super::Draft;
use crate::error::{Issue, IssueKind};
use crate::model::{HiringStatus, Listing, Pool, RemoteType};
use crate::text::{normalize_url, truncate_description};

static ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").unwrap());

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Default)]
pub struct Validated {
    /// Records that passed, in input order, tagged with their pool.
    pub records: Vec<(Pool, Listing)>,
    pub issues: Vec<Issue>,
}

impl Validated {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(Issue::is_error)
    }
}

#[derive(Debug, Clone)]
pub struct Validator {
    description_cap: usize,
    today: NaiveDate,
}

impl Validator {
    pub fn new(description_cap: usize, today: NaiveDate) -> Self {
        Validator {
            description_cap,
            today,
        }
    }

    pub fn validate_all(&self, drafts: Vec<Draft>) -> Validated {
        let mut out = Validated::default();
        let mut ids = HashSet::new();
        let mut urls = HashSet::new();

        for draft in drafts {
            let origin = draft.origin.clone();
            let pool = draft.traits.pool;
            let key = normalize_url(&draft.url);
            let id = draft.id.clone();

            if !key.is_empty() && urls.contains(&key) {
                out.issues.push(Issue::new(
                    &origin,
                    "url",
                    IssueKind::DuplicateUrl,
                    "Duplicate URL, skipped",
                ));
                continue;
            }
            let unique_id = ids.insert(id.clone());
            if !unique_id {
                out.issues.push(Issue::new(
                    &origin,
                    "id",
                    IssueKind::SchemaViolation,
                    format!("Duplicate id '{}'", id),
                ));
            }

            match self.check(draft, &mut out.issues) {
                Some(listing) if unique_id => {
                    urls.insert(key);
                    out.records.push((pool, listing));
                }
                _ => {}
            }
        }
        out
    }

    /// Convert one draft, pushing an issue per failing field.
    pub fn check(&self, draft: Draft, issues: &mut Vec<Issue>) -> Option<Listing> {
        let origin = draft.origin;
        let before = issues.iter().filter(|i| i.is_error()).count();
        let mut violation = |field: &str, message: String| {
            issues.push(Issue::new(&origin, field, IssueKind::SchemaViolation, message));
        };

        if !ID_RE.is_match(&draft.id) {
            violation("id", format!("'{}' must be kebab-case", draft.id));
        }

        let name = draft.name.trim().to_string();
        if name.is_empty() {
            violation("name", "Name is required".into());
        }

        if let Err(message) = check_url(&draft.url) {
            violation("url", message);
        }

        let remote_type = match draft.remote_type.as_deref() {
            None => RemoteType::FullyRemote,
            Some(raw) => raw.parse::<RemoteType>().unwrap_or_else(|e| {
                violation("remote_type", e);
                RemoteType::FullyRemote
            }),
        };

        let hiring_status = match draft.hiring_status.as_deref() {
            None => HiringStatus::Active,
            Some(raw) => raw.parse::<HiringStatus>().unwrap_or_else(|e| {
                violation("hiring_status", e);
                HiringStatus::Active
            }),
        };

        let rating = match draft.rating.as_deref() {
            None => None,
            Some(raw) => match parse_rating(raw) {
                Ok(r) => Some(r),
                Err(message) => {
                    violation("rating", message);
                    None
                }
            },
        };

        let last_verified = match draft.last_verified.as_deref() {
            None => self.today,
            Some(raw) => NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).unwrap_or_else(|_| {
                violation("last_verified", format!("'{}' is not a YYYY-MM-DD date", raw));
                self.today
            }),
        };

        let (description, truncated) = truncate_description(&draft.description, self.description_cap);
        if truncated {
            debug!(source = %origin.source, line = origin.line, cap = self.description_cap, "description truncated");
            issues.push(Issue::new(
                &origin,
                "description",
                IssueKind::DescriptionTruncated,
                format!("Over {} characters, truncated", self.description_cap),
            ));
        }

        let failed = issues.iter().filter(|i| i.is_error()).count() > before;
        if failed {
            return None;
        }

        Some(Listing {
            id: draft.id,
            name,
            url: draft.url,
            category: draft.category,
            tags: draft.tags,
            remote_type,
            rating,
            last_verified,
            description,
            hiring_status,
        })
    }
}

fn check_url(raw: &str) -> Result<(), String> {
    if raw.trim().is_empty() {
        return Err("URL is required".into());
    }
    let parsed = Url::parse(raw).map_err(|e| format!("Invalid URL: {}", e))?;
    if parsed.scheme() != "https" {
        return Err(format!("URL must use https, got {}", parsed.scheme()));
    }
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err("URL has no host".into()),
    }
}

fn parse_rating(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", raw.trim()))?;
    if (1.0..=5.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("Rating must be between 1 and 5, got {}", value))
    }
}
