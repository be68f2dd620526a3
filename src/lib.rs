//! Build pipeline and query engine for a curated directory of remote-work
//! listings aimed at Filipino workers.
//!
//! Hand-maintained spreadsheets go through [`pipeline`] to become one
//! validated, deduplicated, categorized dataset; [`query`] searches, filters
//! and sorts that dataset in memory.

pub mod error;
pub mod model;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod settings;
pub mod source;
pub mod text;

pub use error::{DirectoryError, Issue, IssueKind, Report, Result, Severity};
pub use model::{Category, CategorySet, HiringStatus, Listing, Pool, RemoteType, SearchEntry};
pub use pipeline::{BuildOptions, Dataset, Outcome, Pipeline};
pub use query::{QueryEngine, SortMode};
pub use settings::Settings;
