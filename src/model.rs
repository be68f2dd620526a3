use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::text;

/// Where a row came from: source name and 1-based file line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    pub source: String,
    pub line: u64,
}

impl Origin {
    pub fn new(source: &str, line: u64) -> Self {
        Origin {
            source: source.to_string(),
            line,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.line)
    }
}

/// Which listing collection a record is published into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pool {
    #[default]
    Primary,
    Community,
}

/// A category label that is known to be a member of the configured set.
///
/// Only [`CategorySet::resolve`] hands these out during a build; at runtime
/// the canonical dataset is trusted because the build already checked it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human label used by listing views.
    pub fn display_label(&self) -> String {
        match self.0.as_str() {
            "ph-freelance-groups" | "ph-freelancing" => "PH Freelance".to_string(),
            "hiring-filipino-vas" => "Pinoy VA".to_string(),
            other => {
                let spaced = other.replace('-', " ");
                let mut chars = spaced.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The closed, enumerable set of category labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySet {
    labels: Vec<String>,
}

impl CategorySet {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for label in labels {
            let label = label.as_ref().trim().to_lowercase();
            if !label.is_empty() && !out.contains(&label) {
                out.push(label);
            }
        }
        CategorySet { labels: out }
    }

    /// Case-insensitive membership check returning the canonical label.
    pub fn resolve(&self, raw: &str) -> Option<Category> {
        let wanted = raw.trim().to_lowercase();
        self.labels
            .iter()
            .find(|l| **l == wanted)
            .map(|l| Category(l.clone()))
    }

    pub fn contains(&self, raw: &str) -> bool {
        self.resolve(raw).is_some()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemoteType {
    FullyRemote,
    Hybrid,
    RemoteFriendly,
    Unknown,
    /// Legacy spelling kept in stored data; presented as fully remote.
    Remote,
}

impl RemoteType {
    pub const ALL: [RemoteType; 5] = [
        RemoteType::FullyRemote,
        RemoteType::Hybrid,
        RemoteType::RemoteFriendly,
        RemoteType::Unknown,
        RemoteType::Remote,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RemoteType::FullyRemote => "fully-remote",
            RemoteType::Hybrid => "hybrid",
            RemoteType::RemoteFriendly => "remote-friendly",
            RemoteType::Unknown => "unknown",
            RemoteType::Remote => "remote",
        }
    }

    /// Synonyms collapse only at presentation time, never in storage.
    pub fn presented(self) -> RemoteType {
        match self {
            RemoteType::Unknown => RemoteType::RemoteFriendly,
            RemoteType::Remote => RemoteType::FullyRemote,
            other => other,
        }
    }
}

impl fmt::Display for RemoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RemoteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        RemoteType::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "'{}' is not one of fully-remote, hybrid, remote-friendly, unknown, remote",
                    s.trim()
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HiringStatus {
    Active,
    Slow,
    Unknown,
}

impl HiringStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HiringStatus::Active => "active",
            HiringStatus::Slow => "slow",
            HiringStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HiringStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HiringStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(HiringStatus::Active),
            "slow" => Ok(HiringStatus::Slow),
            "unknown" => Ok(HiringStatus::Unknown),
            _ => Err(format!("'{}' is not one of active, slow, unknown", s.trim())),
        }
    }
}

/// One canonical directory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub name: String,
    pub url: String,
    pub category: Category,
    pub tags: String,
    pub remote_type: RemoteType,
    pub rating: Option<f64>,
    pub last_verified: NaiveDate,
    pub description: String,
    pub hiring_status: HiringStatus,
}

impl Listing {
    pub fn tag_list(&self) -> Vec<String> {
        text::split_tags(&self.tags)
    }

    /// Name with stray source quoting removed.
    pub fn display_name(&self) -> String {
        text::sanitize_name(&self.name)
    }

    pub fn normalized_url(&self) -> String {
        text::normalize_url(&self.url)
    }
}

/// Search-only projection of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: String,
    pub category: Category,
}

impl From<&Listing> for SearchEntry {
    fn from(l: &Listing) -> Self {
        SearchEntry {
            id: l.id.clone(),
            name: l.name.clone(),
            description: l.description.clone(),
            tags: l.tags.clone(),
            category: l.category.clone(),
        }
    }
}
