use csv::StringRecord;

use crate::settings::ColumnAliases;

const NAME: &[&str] = &["name", "remote work website", "group name", "company"];
const URL: &[&str] = &["url", "links", "link", "facebook link", "website"];
const DESCRIPTION: &[&str] = &["description", "about"];
const CATEGORY: &[&str] = &["category"];
const TAGS: &[&str] = &["tags"];
const REMOTE_TYPE: &[&str] = &["remote_type", "remote type"];
const RATING: &[&str] = &["rating"];
const LAST_VERIFIED: &[&str] = &["last_verified", "last verified"];
const HIRING_STATUS: &[&str] = &["hiring_status", "hiring status"];

/// Header positions of every field this source provides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub name: Option<usize>,
    pub url: Option<usize>,
    pub description: Option<usize>,
    pub category: Option<usize>,
    pub tags: Option<usize>,
    pub remote_type: Option<usize>,
    pub rating: Option<usize>,
    pub last_verified: Option<usize>,
    pub hiring_status: Option<usize>,
}

impl ColumnMap {
    /// Resolve headers case-insensitively; source-specific aliases win over built-ins.
    pub fn resolve(headers: &StringRecord, extra: &ColumnAliases) -> Self {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_lowercase())
            .collect();
        let find = |extra: &[String], builtin: &[&str]| -> Option<usize> {
            extra
                .iter()
                .map(|a| a.trim().to_lowercase())
                .chain(builtin.iter().map(|a| a.to_string()))
                .find_map(|alias| normalized.iter().position(|h| *h == alias))
        };

        ColumnMap {
            name: find(&extra.name, NAME),
            url: find(&extra.url, URL),
            description: find(&extra.description, DESCRIPTION),
            category: find(&extra.category, CATEGORY),
            tags: find(&extra.tags, TAGS),
            remote_type: find(&extra.remote_type, REMOTE_TYPE),
            rating: find(&extra.rating, RATING),
            last_verified: find(&extra.last_verified, LAST_VERIFIED),
            hiring_status: find(&extra.hiring_status, HIRING_STATUS),
        }
    }

    /// Required columns that could not be found.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.is_none() {
            missing.push("name");
        }
        if self.url.is_none() {
            missing.push("url");
        }
        missing
    }
}

/// Trimmed cell value, `None` for absent columns and blank cells.
pub fn cell(record: &StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| record.get(i))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_spreadsheet_headers() {
        let headers = StringRecord::from(vec!["Remote Work Website", "Links", "About", "Category"]);
        let map = ColumnMap::resolve(&headers, &ColumnAliases::default());
        assert_eq!(map.name, Some(0));
        assert_eq!(map.url, Some(1));
        assert_eq!(map.description, Some(2));
        assert_eq!(map.category, Some(3));
        assert_eq!(map.tags, None);
        assert!(map.missing_required().is_empty());
    }

    #[test]
    fn resolves_canonical_headers_with_bom() {
        let headers = StringRecord::from(vec!["\u{feff}name", "url", "remote_type", "hiring_status"]);
        let map = ColumnMap::resolve(&headers, &ColumnAliases::default());
        assert_eq!(map.name, Some(0));
        assert_eq!(map.remote_type, Some(2));
        assert_eq!(map.hiring_status, Some(3));
    }

    #[test]
    fn extra_aliases_take_priority() {
        let headers = StringRecord::from(vec!["Name", "Page"]);
        let extra = ColumnAliases {
            url: vec!["Page".into()],
            ..ColumnAliases::default()
        };
        let map = ColumnMap::resolve(&headers, &extra);
        assert_eq!(map.url, Some(1));
    }

    #[test]
    fn reports_missing_required() {
        let headers = StringRecord::from(vec!["Group Name", "Members"]);
        let map = ColumnMap::resolve(&headers, &ColumnAliases::default());
        assert_eq!(map.missing_required(), vec!["url"]);
    }
}
