//! Display-side projections. Nothing here is persisted.

use std::collections::HashMap;

use itertools::Itertools;

use crate::model::{Listing, Pool, RemoteType};
use crate::text::normalize_name;

/// Joins descriptions of records that collapse into one browse row.
pub const BROWSE_SEPARATOR: &str = " | ";

#[derive(Debug, Clone, PartialEq)]
pub struct ListingView {
    pub id: String,
    pub name: String,
    pub url: String,
    pub category_label: String,
    pub remote_type: RemoteType,
    pub tags: Vec<String>,
    pub description: String,
    pub pool: Pool,
}

impl ListingView {
    pub fn new(listing: &Listing, pool: Pool) -> Self {
        ListingView {
            id: listing.id.clone(),
            name: listing.display_name(),
            url: listing.url.clone(),
            category_label: listing.category.display_label(),
            remote_type: listing.remote_type.presented(),
            tags: listing.tag_list(),
            description: listing.description.clone(),
            pool,
        }
    }

    /// `name  [label, remote-type]  url` plus the description on a second line.
    pub fn render(&self) -> String {
        let mut out = format!(
            "{}  [{}, {}]  {}",
            self.name, self.category_label, self.remote_type, self.url
        );
        if !self.tags.is_empty() {
            out.push_str(&format!("  #{}", self.tags.iter().join(" #")));
        }
        if !self.description.is_empty() {
            out.push_str("\n    ");
            out.push_str(&self.description);
        }
        out
    }
}

/// Both pools merged into one list, keyed by normalized display name.
/// The first record for a name keeps its place; later ones only contribute
/// a description when it differs.
pub fn browse<'a>(records: impl IntoIterator<Item = (&'a Listing, Pool)>) -> Vec<ListingView> {
    let mut out: Vec<ListingView> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();
    for (listing, pool) in records {
        let key = normalize_name(&listing.name);
        match by_name.get(&key) {
            Some(&idx) => {
                let kept = &mut out[idx];
                let extra = listing.description.trim();
                if !extra.is_empty() && !kept.description.contains(extra) {
                    if kept.description.is_empty() {
                        kept.description = extra.to_string();
                    } else {
                        kept.description = format!("{}{}{}", kept.description, BROWSE_SEPARATOR, extra);
                    }
                }
            }
            None => {
                by_name.insert(key, out.len());
                out.push(ListingView::new(listing, pool));
            }
        }
    }
    out
}

pub fn results_message(count: usize) -> String {
    format!("{} result{} found.", count, if count == 1 { "" } else { "s" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategorySet, HiringStatus};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn listing(name: &str, category: &str, remote: RemoteType, description: &str) -> Listing {
        Listing {
            id: normalize_name(name).replace(' ', "-"),
            name: name.into(),
            url: "https://example.ph".into(),
            category: CategorySet::new([category]).resolve(category).unwrap(),
            tags: "va; ops".into(),
            remote_type: remote,
            rating: None,
            last_verified: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            description: description.into(),
            hiring_status: HiringStatus::Active,
        }
    }

    #[test]
    fn view_uses_presentation_labels() {
        let l = listing("\"Pinoy Hub\"", "hiring-filipino-vas", RemoteType::Unknown, "d");
        let v = ListingView::new(&l, Pool::Primary);
        assert_eq!(v.name, "Pinoy Hub");
        assert_eq!(v.category_label, "Pinoy VA");
        assert_eq!(v.remote_type, RemoteType::RemoteFriendly);
        assert_eq!(v.tags, vec!["va", "ops"]);
        assert!(v.render().starts_with("Pinoy Hub  [Pinoy VA, remote-friendly]"));
    }

    #[test]
    fn browse_dedups_by_name_and_joins_descriptions() {
        let a = listing("Acme", "agency", RemoteType::FullyRemote, "Staffing agency");
        let b = listing("Zed", "gig", RemoteType::Hybrid, "Gigs");
        let a2 = listing("ACME ", "ph-freelance-groups", RemoteType::Remote, "Facebook group");
        let a3 = listing("acme", "gig", RemoteType::Remote, "Staffing agency");
        let rows = browse([
            (&a, Pool::Primary),
            (&b, Pool::Primary),
            (&a2, Pool::Community),
            (&a3, Pool::Community),
        ]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Acme");
        assert_eq!(rows[0].pool, Pool::Primary);
        assert_eq!(rows[0].description, "Staffing agency | Facebook group");
        assert_eq!(rows[1].name, "Zed");
    }

    #[test]
    fn message_pluralizes() {
        assert_eq!(results_message(0), "0 results found.");
        assert_eq!(results_message(1), "1 result found.");
        assert_eq!(results_message(12), "12 results found.");
    }
}
