//! Build pipeline: sources -> categorize -> assign ids -> merge -> validate.

pub mod categorize;
pub mod merge;
pub mod metrics;
pub mod slug;
pub mod validate;
pub mod writer;

use chrono::{Local, NaiveDate};
use itertools::Itertools;
use tracing::{info, warn};

use crate::error::{DirectoryError, Issue, IssueKind, Report, Result};
use crate::model::{Category, Listing, Origin, Pool, SearchEntry};
use crate::settings::{Settings, SourceConfig};
use crate::source::{adapters_for, CsvSource, SourceAdapter, SourceRow, SourceTraits};
use crate::text::{normalize_url, secure_url};

use categorize::{Categorizer, OverrideTable};
use merge::Merger;
use metrics::{new_run_id, StageTracker};
use slug::IdAllocator;
use validate::Validator;

/// A row that has a category and an id but has not been schema-checked yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub origin: Origin,
    pub traits: SourceTraits,
    pub id: String,
    pub name: String,
    pub url: String,
    pub category: Category,
    pub tags: String,
    pub description: String,
    pub remote_type: Option<String>,
    pub rating: Option<String>,
    pub last_verified: Option<String>,
    pub hiring_status: Option<String>,
}

/// The validated output of one build, split by pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub primary: Vec<Listing>,
    pub community: Vec<Listing>,
}

impl Dataset {
    pub fn from_pooled(records: Vec<(Pool, Listing)>) -> Self {
        let (primary, community): (Vec<_>, Vec<_>) =
            records.into_iter().partition_map(|(pool, listing)| match pool {
                Pool::Primary => itertools::Either::Left(listing),
                Pool::Community => itertools::Either::Right(listing),
            });
        Dataset { primary, community }
    }

    pub fn len(&self) -> usize {
        self.primary.len() + self.community.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Both pools, primary first.
    pub fn all(&self) -> impl Iterator<Item = &Listing> {
        self.primary.iter().chain(self.community.iter())
    }

    pub fn search_index(&self) -> Vec<SearchEntry> {
        self.all().map(SearchEntry::from).collect()
    }

    pub fn sort_by_name(&mut self) {
        for pool in [&mut self.primary, &mut self.community] {
            pool.sort_by_cached_key(|l| l.display_name().to_lowercase());
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    /// Default for rows without a verification date.
    pub today: NaiveDate,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            today: Local::now().date_naive(),
        }
    }
}

#[derive(Debug)]
pub struct Outcome {
    pub dataset: Dataset,
    /// Merged rows before schema checks: source text as written, no defaults.
    pub merged: Vec<Draft>,
    pub report: Report,
    pub stages: StageTracker,
}

impl Outcome {
    pub fn is_publishable(&self) -> bool {
        !self.report.has_errors()
    }

    /// `SchemaViolations` when any record failed validation.
    pub fn ensure_publishable(&self) -> Result<()> {
        if self.is_publishable() {
            Ok(())
        } else {
            Err(DirectoryError::SchemaViolations {
                count: self.report.failing_records(),
            })
        }
    }
}

pub struct Pipeline<'a> {
    settings: &'a Settings,
    categorizer: Categorizer,
    options: BuildOptions,
}

impl<'a> Pipeline<'a> {
    /// Loads the override table once for the lifetime of the pipeline.
    pub fn new(settings: &'a Settings, options: BuildOptions) -> Result<Self> {
        let overrides = OverrideTable::load(&settings.overrides_path)?;
        Pipeline::with_overrides(settings, options, overrides)
    }

    pub fn with_overrides(
        settings: &'a Settings,
        options: BuildOptions,
        overrides: OverrideTable,
    ) -> Result<Self> {
        let set = settings.category_set();
        let fallback = set.resolve(&settings.fallback_category).ok_or_else(|| {
            DirectoryError::Config(format!(
                "fallback category '{}' is not in the category set",
                settings.fallback_category
            ))
        })?;
        Ok(Pipeline {
            settings,
            categorizer: Categorizer::new(set, fallback, overrides),
            options,
        })
    }

    pub fn categorizer(&self) -> &Categorizer {
        &self.categorizer
    }

    /// Every configured source, in precedence order.
    pub fn run(&self) -> Result<Outcome> {
        self.run_adapters(&adapters_for(&self.settings.sources))
    }

    /// Only the named sources, still in configured precedence order.
    pub fn run_sources(&self, names: &[String]) -> Result<Outcome> {
        for name in names {
            if self.settings.source(name).is_none() {
                return Err(DirectoryError::Config(format!("unknown source '{}'", name)));
            }
        }
        let selected: Vec<SourceConfig> = self
            .settings
            .sources
            .iter()
            .filter(|s| names.is_empty() || names.contains(&s.name))
            .cloned()
            .collect();
        self.run_adapters(&adapters_for(&selected))
    }

    pub fn run_adapters<A: SourceAdapter>(&self, adapters: &[A]) -> Result<Outcome> {
        let mut report = Report::new();
        let mut batches = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            match adapter.read() {
                Ok(rows) => batches.push(rows),
                Err(err) if !adapter.required() => {
                    warn!(source = adapter.name(), error = %err, "skipping optional source");
                    report.push(Issue::new(
                        &Origin::new(adapter.name(), 0),
                        "source",
                        IssueKind::SourceSkipped,
                        err.to_string(),
                    ));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(self.process(batches, report))
    }

    /// Run the in-memory stages over already-read batches.
    pub fn process(&self, batches: Vec<Vec<SourceRow>>, mut report: Report) -> Outcome {
        let mut stages = StageTracker::new(new_run_id());
        let read: usize = batches.iter().map(Vec::len).sum();
        stages.record("read", 0, read);

        // one allocator per run, shared by all sources in precedence order
        let mut ids = IdAllocator::new();
        let mut merger = Merger::new();
        for batch in batches {
            for row in batch {
                let draft = self.draft(row, &mut ids, &mut report);
                merger.push(draft);
            }
        }
        let merged = merger.finish();
        stages.record("merge", read, merged.records.len());
        report.extend(merged.issues);

        let validator = Validator::new(self.settings.description_cap, self.options.today);
        let before = merged.records.len();
        let validated = validator.validate_all(merged.records.clone());
        stages.record("validate", before, validated.records.len());
        report.extend(validated.issues);

        let mut dataset = Dataset::from_pooled(validated.records);
        if self.settings.sort_output_by_name {
            dataset.sort_by_name();
        }
        info!(
            run_id = stages.run_id(),
            primary = dataset.primary.len(),
            community = dataset.community.len(),
            errors = report.error_count(),
            "pipeline finished"
        );
        Outcome {
            dataset,
            merged: merged.records,
            report,
            stages,
        }
    }

    fn draft(&self, row: SourceRow, ids: &mut IdAllocator, report: &mut Report) -> Draft {
        let categorized = self.categorizer.categorize(&row);
        report.extend(categorized.issues);
        let id = ids.assign(&row.name);
        Draft {
            origin: row.origin,
            traits: row.traits,
            id,
            name: row.name,
            url: row.url,
            category: categorized.category,
            tags: row.tags,
            description: categorized.about.unwrap_or(row.about),
            remote_type: row.remote_type,
            rating: row.rating,
            last_verified: row.last_verified,
            hiring_status: row.hiring_status,
        }
    }
}

/// Merge the named sources and rewrite the primary source with the result.
/// The primary file is left untouched when the outcome is not publishable.
/// Rows are written as merged, so descriptions keep their full length and
/// fields the sources left blank stay blank.
pub fn merge_sources(settings: &Settings, names: &[String], options: BuildOptions) -> Result<Outcome> {
    let primary = settings
        .primary_source()
        .ok_or_else(|| DirectoryError::Config("no primary source configured".into()))?;
    let outcome = Pipeline::new(settings, options)?.run_sources(names)?;
    if outcome.is_publishable() {
        writer::write_merged_csv(&primary.path, &outcome.merged)?;
    } else {
        warn!(errors = outcome.report.error_count(), "merge has errors, primary source not rewritten");
    }
    Ok(outcome)
}

/// Fields for a listing entered by hand.
#[derive(Debug, Clone, Default)]
pub struct NewListing {
    pub name: String,
    pub url: String,
    pub category: String,
    pub tags: String,
    pub remote_type: Option<String>,
    pub rating: Option<String>,
    pub description: String,
    pub hiring_status: Option<String>,
}

/// Validate `entry` against the closed sets and the existing primary source,
/// then append it. Returns the listing as it would be built.
pub fn add_listing(settings: &Settings, entry: NewListing, options: BuildOptions) -> std::result::Result<Listing, Report> {
    let mut report = Report::new();
    let Some(primary) = settings.primary_source() else {
        report.push(source_issue("no primary source configured".into()));
        return Err(report);
    };
    let origin = Origin::new(&primary.name, 0);

    let existing = if primary.path.exists() {
        match CsvSource::new(primary.clone()).read() {
            Ok(rows) => rows,
            Err(err) => {
                report.push(source_issue(err.to_string()));
                return Err(report);
            }
        }
    } else {
        Vec::new()
    };

    let mut ids = IdAllocator::new();
    for row in &existing {
        ids.assign(&row.name);
    }
    let url = secure_url(&entry.url);
    let key = normalize_url(&url);
    // a blank URL is reported by validation, not matched against blank rows
    if let Some(dup) = existing
        .iter()
        .find(|r| !key.is_empty() && normalize_url(&r.url) == key)
    {
        report.push(Issue::new(
            &origin,
            "url",
            IssueKind::SchemaViolation,
            format!("Already listed as '{}' ({})", dup.name, dup.origin),
        ));
    }

    let Some(category) = settings.category_set().resolve(&entry.category) else {
        report.push(Issue::new(
            &origin,
            "category",
            IssueKind::SchemaViolation,
            format!(
                "'{}' is not one of {}",
                entry.category,
                settings.category_set().labels().join(", ")
            ),
        ));
        return Err(report);
    };

    let tags = if entry.tags.trim().is_empty() {
        category.to_string()
    } else {
        entry.tags.trim().to_string()
    };
    let draft = Draft {
        origin: origin.clone(),
        traits: SourceTraits::from(primary),
        id: ids.assign(&entry.name),
        name: entry.name,
        url,
        category,
        tags,
        description: entry.description.trim().to_string(),
        remote_type: entry.remote_type,
        rating: entry.rating.filter(|r| !r.trim().is_empty()),
        last_verified: None,
        hiring_status: entry.hiring_status,
    };

    let mut issues = Vec::new();
    let listing = Validator::new(settings.description_cap, options.today).check(draft, &mut issues);
    report.extend(issues);
    match listing {
        Some(listing) if !report.has_errors() => {
            if let Err(err) = writer::append_source_row(&primary.path, &listing, &primary.columns) {
                report.push(source_issue(err.to_string()));
                return Err(report);
            }
            Ok(listing)
        }
        _ => Err(report),
    }
}

fn source_issue(message: String) -> Issue {
    Issue::new(&Origin::new("add", 0), "source", IssueKind::SchemaViolation, message)
}
