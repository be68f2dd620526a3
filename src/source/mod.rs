//! Source adapters: project one raw table into pre-canonical rows.

pub mod columns;
pub mod csv_source;

use crate::error::Result;
use crate::model::{Origin, Pool};
use crate::settings::{SourceConfig, SourceKind};

pub use columns::ColumnMap;
pub use csv_source::CsvSource;

/// Per-source switches carried on every row so later stages need no lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceTraits {
    pub kind: SourceKind,
    pub pool: Pool,
    pub merge_text: bool,
    pub trust_category_hint: bool,
}

impl From<&SourceConfig> for SourceTraits {
    fn from(cfg: &SourceConfig) -> Self {
        SourceTraits {
            kind: cfg.kind,
            pool: cfg.pool,
            merge_text: cfg.merge_text,
            trust_category_hint: cfg.trust_category_hint,
        }
    }
}

/// A row after column mapping, before categorization and validation.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub origin: Origin,
    pub traits: SourceTraits,
    pub name: String,
    /// Already upgraded to the secure scheme.
    pub url: String,
    pub about: String,
    pub category_hint: Option<String>,
    pub tags: String,
    pub remote_type: Option<String>,
    pub rating: Option<String>,
    pub last_verified: Option<String>,
    pub hiring_status: Option<String>,
}

/// Anything that can produce pre-canonical rows for the pipeline.
pub trait SourceAdapter {
    fn name(&self) -> &str;
    fn traits(&self) -> SourceTraits;
    /// A required source that fails aborts the run; optional ones are skipped.
    fn required(&self) -> bool {
        true
    }
    fn read(&self) -> Result<Vec<SourceRow>>;
}

/// One adapter per configured source, in configuration (precedence) order.
pub fn adapters_for(sources: &[SourceConfig]) -> Vec<CsvSource> {
    sources.iter().cloned().map(CsvSource::new).collect()
}
