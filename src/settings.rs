use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{DirectoryError, Result};
use crate::model::{CategorySet, Pool};

pub const DEFAULT_CONFIG_PATH: &str = "directory.toml";
pub const ENV_PREFIX: &str = "PHDIR";

const DEFAULT_CATEGORIES: &[&str] = &[
    "freelance",
    "full-time",
    "part-time",
    "gig",
    "agency",
    "usa",
    "australia",
    "ph-freelance-groups",
    "hiring-filipino-vas",
    "ph-freelancing",
];

/// What kind of spreadsheet a source is; drives the community signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Primary,
    Listings,
    Groups,
}

/// Extra header aliases for one source, appended to the built-in ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnAliases {
    pub name: Vec<String>,
    pub url: Vec<String>,
    pub description: Vec<String>,
    pub category: Vec<String>,
    pub tags: Vec<String>,
    pub remote_type: Vec<String>,
    pub rating: Vec<String>,
    pub last_verified: Vec<String>,
    pub hiring_status: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default)]
    pub pool: Pool,
    #[serde(default = "default_true")]
    pub required: bool,
    /// Append duplicate descriptions instead of dropping them.
    #[serde(default)]
    pub merge_text: bool,
    /// Keep the row's own category column when it names a known category.
    #[serde(default)]
    pub trust_category_hint: bool,
    /// Description used for every row of this source (e.g. group listings).
    #[serde(default)]
    pub default_about: Option<String>,
    #[serde(default)]
    pub columns: ColumnAliases,
}

impl SourceConfig {
    pub fn primary(path: impl Into<PathBuf>) -> Self {
        SourceConfig {
            name: "jobs".to_string(),
            path: path.into(),
            kind: SourceKind::Primary,
            pool: Pool::Primary,
            required: true,
            merge_text: false,
            trust_category_hint: false,
            default_about: None,
            columns: ColumnAliases::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Minimum weighted similarity (0..=1) for a fuzzy hit.
    pub threshold: f64,
    pub debounce_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            threshold: 0.8,
            debounce_ms: 300,
        }
    }
}

impl SearchSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub description_cap: usize,
    pub categories: Vec<String>,
    pub fallback_category: String,
    pub overrides_path: PathBuf,
    pub sources: Vec<SourceConfig>,
    pub sort_output_by_name: bool,
    pub search: SearchSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            output_dir: PathBuf::from("public/data"),
            description_cap: 150,
            categories: DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            fallback_category: "agency".to_string(),
            overrides_path: PathBuf::from("data/overrides.toml"),
            sources: vec![SourceConfig::primary("data/jobs.csv")],
            sort_output_by_name: false,
            search: SearchSettings::default(),
        }
    }
}

impl Settings {
    /// Layer the optional TOML file under `PHDIR__*` environment variables.
    pub fn load(path: &Path) -> Result<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let set = self.category_set();
        if set.is_empty() {
            return Err(DirectoryError::Config("category set is empty".into()));
        }
        if !set.contains(&self.fallback_category) {
            return Err(DirectoryError::Config(format!(
                "fallback category '{}' is not in the category set",
                self.fallback_category
            )));
        }
        if self.description_cap < 4 {
            return Err(DirectoryError::Config(format!(
                "description_cap must be at least 4, got {}",
                self.description_cap
            )));
        }
        if !self.sources.iter().any(|s| s.kind == SourceKind::Primary) {
            return Err(DirectoryError::Config("no primary source configured".into()));
        }
        let mut names = HashSet::new();
        for source in &self.sources {
            if !names.insert(source.name.as_str()) {
                return Err(DirectoryError::Config(format!(
                    "source name '{}' is used twice",
                    source.name
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.search.threshold) {
            return Err(DirectoryError::Config(format!(
                "search.threshold must be within 0..=1, got {}",
                self.search.threshold
            )));
        }
        Ok(())
    }

    pub fn category_set(&self) -> CategorySet {
        CategorySet::new(&self.categories)
    }

    /// First source of kind `primary`; `validate` guarantees one exists.
    pub fn primary_source(&self) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.kind == SourceKind::Primary)
    }

    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }
}

fn default_true() -> bool {
    true
}
