//! In-memory query engine over the built dataset.
//!
//! Text input is debounced; filter and sort changes recompute at once. The
//! fuzzy index for each pool is rebuilt only when a different record set is
//! handed in.

pub mod debounce;
pub mod fuzzy;
pub mod group;
pub mod present;

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::model::{Listing, Pool, RemoteType};
use crate::settings::SearchSettings;

use debounce::Debouncer;
use fuzzy::FuzzyIndex;
use group::JumpIndex;
use present::ListingView;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SortMode {
    /// Best match first while searching; dataset order otherwise.
    #[default]
    Relevance,
    Name,
    /// Members of the category first, each partition alphabetical.
    CategoryFirst(String),
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "relevance" => Ok(SortMode::Relevance),
            "name" => Ok(SortMode::Name),
            lower => match lower.strip_prefix("first:") {
                Some(cat) if !cat.trim().is_empty() => Ok(SortMode::CategoryFirst(cat.trim().to_string())),
                _ => Err(format!("'{}' is not one of relevance, name, first:<category>", s)),
            },
        }
    }
}

/// Applied query. `text` is the debounced value, not the latest keystroke.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    pub text: String,
    pub categories: BTreeSet<String>,
    /// Stored as presented values.
    pub remote_types: BTreeSet<RemoteType>,
    pub sort: SortMode,
}

impl QueryState {
    pub fn has_filters(&self) -> bool {
        !self.categories.is_empty() || !self.remote_types.is_empty()
    }

    fn admits(&self, listing: &Listing) -> bool {
        (self.categories.is_empty() || self.categories.contains(listing.category.as_str()))
            && (self.remote_types.is_empty()
                || self.remote_types.contains(&listing.remote_type.presented()))
    }
}

/// Visible records as indices into their pools, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub primary: Vec<usize>,
    pub secondary: Vec<usize>,
    pub secondary_visible: bool,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.primary.len() + self.secondary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Memo {
    source: Arc<Vec<Listing>>,
    index: FuzzyIndex,
}

pub struct QueryEngine {
    primary: Arc<Vec<Listing>>,
    community: Arc<Vec<Listing>>,
    primary_memo: Option<Memo>,
    community_memo: Option<Memo>,
    state: QueryState,
    typed: String,
    debouncer: Debouncer<String>,
    threshold: f64,
    result: QueryResult,
    index_builds: usize,
    recomputations: usize,
}

impl QueryEngine {
    pub fn new(threshold: f64, debounce: Duration) -> Self {
        QueryEngine {
            primary: Arc::new(Vec::new()),
            community: Arc::new(Vec::new()),
            primary_memo: None,
            community_memo: None,
            state: QueryState::default(),
            typed: String::new(),
            debouncer: Debouncer::new(debounce),
            threshold,
            result: QueryResult::default(),
            index_builds: 0,
            recomputations: 0,
        }
    }

    pub fn from_settings(settings: &SearchSettings) -> Self {
        QueryEngine::new(settings.threshold, settings.debounce())
    }

    pub fn set_pools(&mut self, primary: Arc<Vec<Listing>>, community: Arc<Vec<Listing>>) {
        self.primary = primary;
        self.community = community;
        self.recompute();
    }

    /// Record a keystroke. Results change only once input has been quiet
    /// for the debounce interval and [`tick`](Self::tick) observes it.
    pub fn input_query(&mut self, text: &str, now: Instant) {
        self.typed = text.to_string();
        self.debouncer.push(self.typed.clone(), now);
    }

    /// Apply a due query change. Returns whether results were recomputed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.debouncer.poll(now) {
            Some(text) => {
                self.state.text = text;
                self.recompute();
                true
            }
            None => false,
        }
    }

    /// Apply the latest keystroke without waiting.
    pub fn flush_query(&mut self) {
        if let Some(text) = self.debouncer.flush() {
            self.state.text = text;
            self.recompute();
        }
    }

    pub fn set_categories<I, S>(&mut self, categories: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.state.categories = categories
            .into_iter()
            .map(|c| c.as_ref().trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        self.recompute();
    }

    pub fn toggle_category(&mut self, category: &str) {
        let key = category.trim().to_lowercase();
        if !self.state.categories.remove(&key) {
            self.state.categories.insert(key);
        }
        self.recompute();
    }

    pub fn set_remote_types(&mut self, remote_types: impl IntoIterator<Item = RemoteType>) {
        self.state.remote_types = remote_types.into_iter().map(RemoteType::presented).collect();
        self.recompute();
    }

    pub fn toggle_remote_type(&mut self, remote_type: RemoteType) {
        let key = remote_type.presented();
        if !self.state.remote_types.remove(&key) {
            self.state.remote_types.insert(key);
        }
        self.recompute();
    }

    pub fn set_sort(&mut self, sort: SortMode) {
        self.state.sort = sort;
        self.recompute();
    }

    /// Drop text, filters and any pending keystroke in one step.
    pub fn clear(&mut self) {
        self.debouncer.cancel();
        self.typed.clear();
        self.state.text.clear();
        self.state.categories.clear();
        self.state.remote_types.clear();
        self.recompute();
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Latest keystroke, which may not be applied yet.
    pub fn typed_query(&self) -> &str {
        &self.typed
    }

    pub fn result(&self) -> &QueryResult {
        &self.result
    }

    pub fn visible_primary(&self) -> Vec<&Listing> {
        self.result.primary.iter().map(|&i| &self.primary[i]).collect()
    }

    pub fn visible_secondary(&self) -> Vec<&Listing> {
        self.result.secondary.iter().map(|&i| &self.community[i]).collect()
    }

    /// Buckets over everything currently visible in either pool.
    pub fn jump_index(&self) -> JumpIndex {
        JumpIndex::build(self.visible_primary().into_iter().chain(self.visible_secondary()))
    }

    /// Both visible pools as one list, deduplicated by name.
    pub fn browse(&self) -> Vec<ListingView> {
        let primary = self.visible_primary().into_iter().map(|l| (l, Pool::Primary));
        let secondary = self.visible_secondary().into_iter().map(|l| (l, Pool::Community));
        present::browse(primary.chain(secondary))
    }

    pub fn results_message(&self) -> String {
        present::results_message(self.result.len())
    }

    pub fn index_builds(&self) -> usize {
        self.index_builds
    }

    pub fn recomputations(&self) -> usize {
        self.recomputations
    }

    fn recompute(&mut self) {
        let primary = Arc::clone(&self.primary);
        let community = Arc::clone(&self.community);

        let primary_hits = self.select(&primary, Pool::Primary);
        let secondary_visible = !self.state.has_filters();
        let secondary_hits = if secondary_visible {
            self.select(&community, Pool::Community)
        } else {
            Vec::new()
        };

        self.result = QueryResult {
            primary: primary_hits,
            secondary: secondary_hits,
            secondary_visible,
        };
        self.recomputations += 1;
        debug!(
            query = %self.state.text,
            primary = self.result.primary.len(),
            secondary = self.result.secondary.len(),
            "recomputed results"
        );
    }

    /// Search, filter and sort one pool.
    fn select(&mut self, data: &Arc<Vec<Listing>>, pool: Pool) -> Vec<usize> {
        let candidates: Vec<usize> = if !fuzzy::has_terms(&self.state.text) {
            (0..data.len()).collect()
        } else {
            let threshold = self.threshold;
            let text = self.state.text.clone();
            self.index_for(data, pool)
                .search(&text, threshold)
                .into_iter()
                .map(|h| h.index)
                .collect()
        };
        let mut visible: Vec<usize> = candidates
            .into_iter()
            .filter(|&i| self.state.admits(&data[i]))
            .collect();
        sort_indices(&mut visible, data, &self.state.sort);
        visible
    }

    fn index_for(&mut self, data: &Arc<Vec<Listing>>, pool: Pool) -> &FuzzyIndex {
        let memo = match pool {
            Pool::Primary => &mut self.primary_memo,
            Pool::Community => &mut self.community_memo,
        };
        if memo.as_ref().is_some_and(|m| !Arc::ptr_eq(&m.source, data)) {
            *memo = None;
        }
        let builds = &mut self.index_builds;
        &memo
            .get_or_insert_with(|| {
                *builds += 1;
                debug!(pool = ?pool, records = data.len(), "building fuzzy index");
                Memo {
                    source: Arc::clone(data),
                    index: FuzzyIndex::build(data),
                }
            })
            .index
    }
}

fn sort_indices(indices: &mut [usize], data: &[Listing], sort: &SortMode) {
    match sort {
        SortMode::Relevance => {}
        SortMode::Name => indices.sort_by_cached_key(|&i| data[i].display_name().to_lowercase()),
        SortMode::CategoryFirst(cat) => {
            let cat = cat.to_lowercase();
            indices.sort_by_cached_key(|&i| {
                (
                    data[i].category.as_str() != cat,
                    data[i].display_name().to_lowercase(),
                )
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategorySet, HiringStatus};
    use chrono::NaiveDate;
    use group::Bucket;
    use pretty_assertions::assert_eq;

    const MS: Duration = Duration::from_millis(1);

    fn listing(name: &str, category: &str, remote: RemoteType, description: &str) -> Listing {
        let set = CategorySet::new(["gig", "agency", "freelance", "ph-freelance-groups"]);
        Listing {
            id: name.to_lowercase().replace(' ', "-"),
            name: name.into(),
            url: format!("https://{}.ph", name.to_lowercase().replace(' ', "")),
            category: set.resolve(category).unwrap(),
            tags: category.into(),
            remote_type: remote,
            rating: None,
            last_verified: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            description: description.into(),
            hiring_status: HiringStatus::Active,
        }
    }

    fn pools() -> (Arc<Vec<Listing>>, Arc<Vec<Listing>>) {
        let primary = vec![
            listing("Zed Staffing", "agency", RemoteType::FullyRemote, "Staffing agency"),
            listing("Upwork", "freelance", RemoteType::Remote, "Freelance marketplace"),
            listing("Tasky", "gig", RemoteType::Hybrid, "Errands and tasks"),
            listing("Acme", "agency", RemoteType::Unknown, "Outsourcing"),
            listing("99 Gigs", "gig", RemoteType::RemoteFriendly, "Micro gigs"),
        ];
        let community = vec![
            listing("PH Freelancers", "ph-freelance-groups", RemoteType::FullyRemote, "Facebook group"),
            listing("Gig Pinoys", "gig", RemoteType::FullyRemote, "Gig group"),
        ];
        (Arc::new(primary), Arc::new(community))
    }

    fn engine() -> QueryEngine {
        let mut e = QueryEngine::new(0.8, 300 * MS);
        let (p, c) = pools();
        e.set_pools(p, c);
        e
    }

    fn names(listings: Vec<&Listing>) -> Vec<&str> {
        listings.into_iter().map(|l| l.name.as_str()).collect()
    }

    #[test]
    fn empty_query_keeps_dataset_order() {
        let e = engine();
        assert_eq!(
            names(e.visible_primary()),
            vec!["Zed Staffing", "Upwork", "Tasky", "Acme", "99 Gigs"]
        );
        assert_eq!(e.result().secondary, vec![0, 1]);
        assert!(e.result().secondary_visible);
        assert_eq!(e.results_message(), "7 results found.");
    }

    #[test]
    fn filters_and_across_facets_or_within() {
        let mut e = engine();
        e.set_categories(["agency", "gig"]);
        e.set_remote_types([RemoteType::FullyRemote]);
        assert_eq!(names(e.visible_primary()), vec!["Zed Staffing"]);

        // presented synonyms: unknown shows as remote-friendly
        e.set_remote_types([RemoteType::RemoteFriendly]);
        assert_eq!(names(e.visible_primary()), vec!["Acme", "99 Gigs"]);

        e.set_categories(Vec::<String>::new());
        e.set_remote_types(Vec::new());
        assert_eq!(e.visible_primary().len(), 5);
    }

    #[test]
    fn legacy_remote_matches_fully_remote_filter() {
        let mut e = engine();
        e.toggle_remote_type(RemoteType::FullyRemote);
        assert_eq!(names(e.visible_primary()), vec!["Zed Staffing", "Upwork"]);
    }

    #[test]
    fn any_filter_hides_secondary_pool() {
        let mut e = engine();
        e.toggle_category("gig");
        assert!(!e.result().secondary_visible);
        assert!(e.visible_secondary().is_empty());
        e.toggle_category("gig");
        assert!(e.result().secondary_visible);
        assert_eq!(e.visible_secondary().len(), 2);
    }

    #[test]
    fn keystroke_burst_recomputes_once_with_last_value() {
        let mut e = engine();
        let start = e.recomputations();
        let t0 = Instant::now();
        e.input_query("u", t0);
        e.input_query("up", t0 + 50 * MS);
        e.input_query("upwork", t0 + 120 * MS);
        assert!(!e.tick(t0 + 200 * MS));
        assert_eq!(e.recomputations(), start);
        assert_eq!(e.typed_query(), "upwork");
        assert_eq!(e.state().text, "");

        assert!(e.tick(t0 + 420 * MS));
        assert_eq!(e.recomputations(), start + 1);
        assert_eq!(e.state().text, "upwork");
        assert_eq!(names(e.visible_primary()), vec!["Upwork"]);
        assert!(!e.tick(t0 + 1000 * MS));
    }

    #[test]
    fn punctuation_only_query_shows_everything() {
        let mut e = engine();
        e.input_query("--", Instant::now());
        e.flush_query();
        assert_eq!(e.state().text, "--");
        assert_eq!(e.visible_primary().len(), 5);
        assert_eq!(e.visible_secondary().len(), 2);
        assert_eq!(e.index_builds(), 0);
    }

    #[test]
    fn filter_changes_recompute_immediately() {
        let mut e = engine();
        let start = e.recomputations();
        e.toggle_category("agency");
        e.set_sort(SortMode::Name);
        assert_eq!(e.recomputations(), start + 2);
    }

    #[test]
    fn fuzzy_index_is_memoized_per_dataset() {
        let mut e = engine();
        assert_eq!(e.index_builds(), 0);
        e.input_query("tasky", Instant::now());
        e.flush_query();
        assert_eq!(e.index_builds(), 2);
        e.input_query("acme", Instant::now());
        e.flush_query();
        e.toggle_category("agency");
        assert_eq!(e.index_builds(), 2);

        let (p, c) = (Arc::clone(&e.primary), Arc::clone(&e.community));
        e.set_pools(p, c);
        assert_eq!(e.index_builds(), 2);

        let (p, c) = pools();
        e.set_pools(p, c);
        assert_eq!(e.index_builds(), 3);
    }

    #[test]
    fn sort_modes() {
        let mut e = engine();
        e.set_sort(SortMode::Name);
        assert_eq!(
            names(e.visible_primary()),
            vec!["99 Gigs", "Acme", "Tasky", "Upwork", "Zed Staffing"]
        );
        e.set_sort("first:agency".parse().unwrap());
        assert_eq!(
            names(e.visible_primary()),
            vec!["Acme", "Zed Staffing", "99 Gigs", "Tasky", "Upwork"]
        );
        assert!("newest".parse::<SortMode>().is_err());
    }

    #[test]
    fn jump_index_tracks_visible_records() {
        let mut e = engine();
        e.toggle_category("gig");
        let index = e.jump_index();
        assert!(index.is_enabled(Bucket::Letter('T')));
        assert!(index.is_enabled(Bucket::Other));
        assert!(!index.is_enabled(Bucket::Letter('U')));
        // community "Gig Pinoys" is hidden while filtering
        assert!(!index.is_enabled(Bucket::Letter('G')));
    }

    #[test]
    fn clear_resets_everything() {
        let mut e = engine();
        e.toggle_category("gig");
        e.input_query("tas", Instant::now());
        e.clear();
        assert!(!e.state().has_filters());
        assert_eq!(e.result().len(), 7);
        assert!(!e.tick(Instant::now() + 1000 * MS));
    }
}
