//! Category assignment: manual overrides first, then an ordered rule cascade.

use std::path::Path;

use config::{Config, File};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Issue, IssueKind, Result};
use crate::model::{Category, CategorySet};
use crate::settings::SourceKind;
use crate::source::SourceRow;

/// Known entity whose category and description are fixed by hand.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OverrideEntry {
    /// Matched as a case-insensitive substring of the row name.
    pub key: String,
    pub category: String,
    pub about: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OverrideTable {
    #[serde(default)]
    pub overrides: Vec<OverrideEntry>,
}

impl OverrideTable {
    pub fn new(overrides: Vec<OverrideEntry>) -> Self {
        OverrideTable { overrides }
    }

    /// Load the table once; a missing file means no overrides.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no override table, continuing without overrides");
            return Ok(OverrideTable::default());
        }
        let table: OverrideTable = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;
        debug!(path = %path.display(), entries = table.overrides.len(), "loaded override table");
        Ok(table)
    }

    /// First entry (in table order) whose key occurs in `name`.
    pub fn find(&self, name: &str) -> Option<&OverrideEntry> {
        let lower = name.to_lowercase();
        self.overrides
            .iter()
            .find(|o| !o.key.trim().is_empty() && lower.contains(&o.key.trim().to_lowercase()))
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

/// Priority band of a rule. Lower bands are evaluated first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Topical,
    Geographic,
    Community,
    Arrangement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Name,
    About,
    Url,
}

#[derive(Debug, Clone)]
pub enum Matcher {
    /// Any keyword, on word boundaries, in any of the fields.
    Keywords { fields: Vec<TextField>, pattern: Regex },
    Source(SourceKind),
}

impl Matcher {
    pub fn keywords(fields: &[TextField], keywords: &[&str]) -> Self {
        Matcher::Keywords {
            fields: fields.to_vec(),
            pattern: keyword_pattern(keywords),
        }
    }

    fn matches(&self, row: &SourceRow) -> bool {
        match self {
            Matcher::Keywords { fields, pattern } => fields.iter().any(|f| {
                let text = match f {
                    TextField::Name => row.name.as_str(),
                    TextField::About => row.about.as_str(),
                    TextField::Url => row.url.as_str(),
                };
                pattern.is_match(text)
            }),
            Matcher::Source(kind) => row.traits.kind == *kind,
        }
    }
}

/// Case-insensitive alternation; word boundaries only next to word characters,
/// so `.com.au` and `u.s.` still match inside URLs and prose.
fn keyword_pattern(keywords: &[&str]) -> Regex {
    let alternatives: Vec<String> = keywords
        .iter()
        .filter(|k| !k.is_empty())
        .map(|k| {
            let lead = if k.starts_with(|c: char| c.is_alphanumeric()) { r"\b" } else { "" };
            let tail = if k.ends_with(|c: char| c.is_alphanumeric()) { r"\b" } else { "" };
            format!("{}{}{}", lead, regex::escape(k), tail)
        })
        .collect();
    let source = if alternatives.is_empty() {
        // never matches
        r"\b\B".to_string()
    } else {
        format!("(?i)(?:{})", alternatives.join("|"))
    };
    Regex::new(&source).expect("escaped keyword alternation is a valid regex")
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub tier: Tier,
    pub category: String,
    pub matcher: Matcher,
}

impl Rule {
    pub fn new(name: &str, tier: Tier, category: &str, matcher: Matcher) -> Self {
        Rule {
            name: name.to_string(),
            tier,
            category: category.to_string(),
            matcher,
        }
    }
}

/// Built-in cascade. Topical beats geographic: an Australian agency that
/// recruits Filipino VAs is filed under `hiring-filipino-vas`.
pub fn default_rules() -> Vec<Rule> {
    use TextField::*;
    vec![
        Rule::new(
            "filipino-va-hiring",
            Tier::Topical,
            "hiring-filipino-vas",
            Matcher::keywords(
                &[Name, About],
                &[
                    "filipino virtual assistant",
                    "filipino virtual assistants",
                    "filipino va",
                    "filipino vas",
                    "pinoy va",
                    "pinoy vas",
                    "hire filipino",
                    "hire filipinos",
                    "hiring filipino",
                    "hiring filipinos",
                    "philippine virtual assistant",
                    "philippine virtual assistants",
                    "philippine-based virtual assistant",
                ],
            ),
        ),
        Rule::new(
            "australia",
            Tier::Geographic,
            "australia",
            Matcher::keywords(
                &[Name, About, Url],
                &["australia", "australian", "aussie", ".com.au", ".org.au", ".net.au"],
            ),
        ),
        Rule::new(
            "usa",
            Tier::Geographic,
            "usa",
            Matcher::keywords(&[About], &["u.s.", "usa", "united states", "american"]),
        ),
        Rule::new(
            "usa-domain",
            Tier::Geographic,
            "usa",
            Matcher::keywords(&[Url], &[".us/"]),
        ),
        Rule::new(
            "community-group",
            Tier::Community,
            "ph-freelance-groups",
            Matcher::Source(SourceKind::Groups),
        ),
        Rule::new(
            "marketplace",
            Tier::Arrangement,
            "freelance",
            Matcher::keywords(
                &[About],
                &["marketplace", "direct hiring", "direct hire", "market", "platform for finding"],
            ),
        ),
        Rule::new(
            "full-time",
            Tier::Arrangement,
            "full-time",
            Matcher::keywords(
                &[About],
                &["full-time", "full time", "career", "careers", "stable", "long-term"],
            ),
        ),
        Rule::new(
            "part-time",
            Tier::Arrangement,
            "part-time",
            Matcher::keywords(&[About], &["part-time", "part time", "flexible", "boutique"]),
        ),
        Rule::new(
            "gig",
            Tier::Arrangement,
            "gig",
            Matcher::keywords(
                &[About],
                &["task", "tasks", "project-based", "gig", "gigs", "hourly"],
            ),
        ),
        Rule::new(
            "agency",
            Tier::Arrangement,
            "agency",
            Matcher::keywords(&[About], &["agency", "staffing", "outsourcing", "bpo"]),
        ),
    ]
}

/// Which step of the cascade decided a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Override(String),
    Hint,
    Rule(String),
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Categorized {
    pub category: Category,
    /// Replacement description from a manual override.
    pub about: Option<String>,
    pub decision: Decision,
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone)]
pub struct Categorizer {
    set: CategorySet,
    fallback: Category,
    overrides: OverrideTable,
    rules: Vec<Rule>,
}

impl Categorizer {
    /// `fallback` must already be a member of `set`.
    pub fn new(set: CategorySet, fallback: Category, overrides: OverrideTable) -> Self {
        Categorizer::with_rules(set, fallback, overrides, default_rules())
    }

    pub fn with_rules(
        set: CategorySet,
        fallback: Category,
        overrides: OverrideTable,
        mut rules: Vec<Rule>,
    ) -> Self {
        rules.sort_by_key(|r| r.tier);
        Categorizer {
            set,
            fallback,
            overrides,
            rules,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn categorize(&self, row: &SourceRow) -> Categorized {
        let mut issues = Vec::new();

        if let Some(entry) = self.overrides.find(&row.name) {
            let category = self.guard(&entry.category, row, &mut issues);
            return Categorized {
                category,
                about: Some(entry.about.clone()),
                decision: Decision::Override(entry.key.clone()),
                issues,
            };
        }

        if row.traits.trust_category_hint {
            if let Some(hint) = &row.category_hint {
                match self.set.resolve(hint) {
                    Some(category) => {
                        return Categorized {
                            category,
                            about: None,
                            decision: Decision::Hint,
                            issues,
                        }
                    }
                    None => issues.push(self.out_of_enum(
                        row,
                        hint,
                        "unknown category hint, classified by rules instead",
                    )),
                }
            }
        }

        let (label, decision) = match self.rules.iter().find(|r| r.matcher.matches(row)) {
            Some(rule) => (rule.category.clone(), Decision::Rule(rule.name.clone())),
            None => (self.fallback.as_str().to_string(), Decision::Fallback),
        };
        let category = self.guard(&label, row, &mut issues);
        debug!(source = %row.origin.source, line = row.origin.line, category = %category, decision = ?decision, "categorized");
        Categorized {
            category,
            about: None,
            decision,
            issues,
        }
    }

    /// Never emit a label outside the closed set.
    fn guard(&self, label: &str, row: &SourceRow, issues: &mut Vec<Issue>) -> Category {
        match self.set.resolve(label) {
            Some(category) => category,
            None => {
                issues.push(self.out_of_enum(row, label, "not a known category"));
                self.fallback.clone()
            }
        }
    }

    fn out_of_enum(&self, row: &SourceRow, label: &str, why: &str) -> Issue {
        warn!(source = %row.origin.source, line = row.origin.line, category = label, fallback = %self.fallback, "category out of set");
        Issue::new(
            &row.origin,
            "category",
            IssueKind::CategoryOutOfEnum,
            format!("'{}' {} (using '{}')", label, why, self.fallback),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Origin, Pool};
    use crate::source::SourceTraits;

    fn set() -> CategorySet {
        CategorySet::new([
            "freelance",
            "full-time",
            "part-time",
            "gig",
            "agency",
            "usa",
            "australia",
            "ph-freelance-groups",
            "hiring-filipino-vas",
        ])
    }

    fn categorizer(overrides: Vec<OverrideEntry>) -> Categorizer {
        let s = set();
        let fallback = s.resolve("agency").unwrap();
        Categorizer::new(s, fallback, OverrideTable::new(overrides))
    }

    fn row(name: &str, url: &str, about: &str) -> SourceRow {
        SourceRow {
            origin: Origin::new("jobs", 2),
            traits: SourceTraits {
                kind: SourceKind::Primary,
                pool: Pool::Primary,
                merge_text: false,
                trust_category_hint: false,
            },
            name: name.into(),
            url: url.into(),
            about: about.into(),
            category_hint: None,
            tags: "General".into(),
            remote_type: None,
            rating: None,
            last_verified: None,
            hiring_status: None,
        }
    }

    fn upwork_override() -> OverrideEntry {
        OverrideEntry {
            key: "Upwork".into(),
            category: "freelance".into(),
            about: "The largest freelance platform.".into(),
        }
    }

    #[test]
    fn override_wins_over_keywords() {
        let c = categorizer(vec![upwork_override()]);
        let out = c.categorize(&row(
            "UPWORK Philippines",
            "https://upwork.com",
            "Hire Filipino virtual assistants from Australia, agency, gig tasks",
        ));
        assert_eq!(out.category.as_str(), "freelance");
        assert_eq!(out.about.as_deref(), Some("The largest freelance platform."));
        assert_eq!(out.decision, Decision::Override("Upwork".into()));
        assert!(out.issues.is_empty());
    }

    #[test]
    fn first_override_in_table_order_wins() {
        let c = categorizer(vec![
            OverrideEntry {
                key: "Staff".into(),
                category: "agency".into(),
                about: "first".into(),
            },
            OverrideEntry {
                key: "VirtualStaff".into(),
                category: "freelance".into(),
                about: "second".into(),
            },
        ]);
        let out = c.categorize(&row("VirtualStaff.ph", "https://virtualstaff.ph", ""));
        assert_eq!(out.about.as_deref(), Some("first"));
    }

    #[test]
    fn topical_beats_geographic() {
        let c = categorizer(vec![]);
        let out = c.categorize(&row(
            "Sunny VA",
            "https://sunnyva.com.au",
            "Australia-based agency helping clients hire Filipino virtual assistants.",
        ));
        assert_eq!(out.category.as_str(), "hiring-filipino-vas");
        assert_eq!(out.decision, Decision::Rule("filipino-va-hiring".into()));
    }

    #[test]
    fn geographic_beats_arrangement() {
        let c = categorizer(vec![]);
        let au = c.categorize(&row("Outsource Co", "https://outsource.com.au", "staffing agency"));
        assert_eq!(au.category.as_str(), "australia");
        let us = c.categorize(&row("Staffers", "https://staffers.com", "Staffing for United States firms"));
        assert_eq!(us.category.as_str(), "usa");
    }

    #[test]
    fn usa_keyword_needs_word_boundary() {
        let c = categorizer(vec![]);
        let out = c.categorize(&row("Metered", "https://metered.io", "Pay by usage, hourly billing"));
        assert_eq!(out.category.as_str(), "gig");
    }

    #[test]
    fn groups_source_is_community() {
        let c = categorizer(vec![]);
        let mut r = row("PH Freelancers", "https://facebook.com/groups/phf", "career support");
        r.traits.kind = SourceKind::Groups;
        assert_eq!(c.categorize(&r).category.as_str(), "ph-freelance-groups");
    }

    #[test]
    fn arrangement_rules_follow_listed_order() {
        let c = categorizer(vec![]);
        let out = c.categorize(&row("X", "https://x.io", "A marketplace for full-time roles"));
        assert_eq!(out.category.as_str(), "freelance");
        let out = c.categorize(&row("Y", "https://y.io", "Stable careers in BPO"));
        assert_eq!(out.category.as_str(), "full-time");
    }

    #[test]
    fn nothing_matches_uses_fallback() {
        let c = categorizer(vec![]);
        let out = c.categorize(&row("Z", "https://z.io", "We make software."));
        assert_eq!(out.category.as_str(), "agency");
        assert_eq!(out.decision, Decision::Fallback);
    }

    #[test]
    fn out_of_set_override_falls_back_with_warning() {
        let c = categorizer(vec![OverrideEntry {
            key: "Athena".into(),
            category: "executive".into(),
            about: "EA placements.".into(),
        }]);
        let out = c.categorize(&row("Athena", "https://athena.com", ""));
        assert_eq!(out.category.as_str(), "agency");
        assert_eq!(out.about.as_deref(), Some("EA placements."));
        assert_eq!(out.issues.len(), 1);
        assert_eq!(out.issues[0].kind, IssueKind::CategoryOutOfEnum);
    }

    #[test]
    fn trusted_hint_is_kept_when_known() {
        let c = categorizer(vec![]);
        let mut r = row("Tasky", "https://tasky.io", "hourly tasks");
        r.traits.trust_category_hint = true;
        r.category_hint = Some("Full-Time".into());
        let out = c.categorize(&r);
        assert_eq!(out.category.as_str(), "full-time");
        assert_eq!(out.decision, Decision::Hint);

        r.category_hint = Some("remote-jobs".into());
        let out = c.categorize(&r);
        assert_eq!(out.category.as_str(), "gig");
        assert_eq!(out.issues.len(), 1);
    }

    #[test]
    fn untrusted_hint_is_ignored() {
        let c = categorizer(vec![]);
        let mut r = row("Tasky", "https://tasky.io", "hourly tasks");
        r.category_hint = Some("usa".into());
        assert_eq!(c.categorize(&r).category.as_str(), "gig");
    }

    #[test]
    fn rules_are_sorted_by_tier() {
        let s = set();
        let fallback = s.resolve("agency").unwrap();
        let rules = vec![
            Rule::new("gig", Tier::Arrangement, "gig", Matcher::keywords(&[TextField::About], &["task"])),
            Rule::new("au", Tier::Geographic, "australia", Matcher::keywords(&[TextField::About], &["sydney"])),
        ];
        let c = Categorizer::with_rules(s, fallback, OverrideTable::default(), rules);
        assert_eq!(c.rules()[0].name, "au");
        let out = c.categorize(&row("T", "https://t.io", "task work in Sydney"));
        assert_eq!(out.category.as_str(), "australia");
    }

    #[test]
    fn loads_override_table_from_toml() {
        let table = OverrideTable::load(Path::new("tests/fixtures/overrides.toml")).unwrap();
        assert!(table.len() >= 2);
        assert!(table.find("upwork philippines").is_some());
        assert!(OverrideTable::load(Path::new("tests/fixtures/none.toml")).unwrap().is_empty());
    }
}
