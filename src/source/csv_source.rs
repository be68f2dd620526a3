use std::fs::File;
use std::io::{self, Read};

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info};

use super::columns::{cell, ColumnMap};
use super::{SourceAdapter, SourceRow, SourceTraits};
use crate::error::{DirectoryError, Result};
use crate::model::Origin;
use crate::settings::SourceConfig;
use crate::text::{clean_description, secure_url};

const DEFAULT_TAG: &str = "General";

/// A hand-maintained spreadsheet exported as CSV with a header row.
#[derive(Debug, Clone)]
pub struct CsvSource {
    config: SourceConfig,
}

impl CsvSource {
    pub fn new(config: SourceConfig) -> Self {
        CsvSource { config }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Parse CSV text from any reader.
    pub fn read_from<R: Read>(&self, reader: R) -> Result<Vec<SourceRow>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| self.malformed(format!("unreadable header row: {}", e)))?
            .clone();
        let columns = ColumnMap::resolve(&headers, &self.config.columns);
        let missing = columns.missing_required();
        if !missing.is_empty() {
            return Err(self.malformed(format!(
                "no column for {} (headers: {})",
                missing.join(", "),
                headers.iter().collect::<Vec<_>>().join(", ")
            )));
        }

        let traits = self.traits();
        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| self.malformed(e.to_string()))?;
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            rows.push(self.project(&record, &columns, traits, line));
        }

        debug!(source = %self.config.name, rows = rows.len(), "source parsed");
        Ok(rows)
    }

    fn project(
        &self,
        record: &StringRecord,
        columns: &ColumnMap,
        traits: SourceTraits,
        line: u64,
    ) -> SourceRow {
        let category_hint = cell(record, columns.category);
        let tags = cell(record, columns.tags)
            .or_else(|| category_hint.clone())
            .unwrap_or_else(|| DEFAULT_TAG.to_string());
        let about = match &self.config.default_about {
            Some(fixed) => fixed.clone(),
            None => cell(record, columns.description)
                .map(|d| clean_description(&d))
                .unwrap_or_default(),
        };

        SourceRow {
            origin: Origin::new(&self.config.name, line),
            traits,
            name: cell(record, columns.name).unwrap_or_default(),
            url: cell(record, columns.url)
                .map(|u| secure_url(&u))
                .unwrap_or_default(),
            about,
            category_hint,
            tags,
            remote_type: cell(record, columns.remote_type),
            rating: cell(record, columns.rating),
            last_verified: cell(record, columns.last_verified),
            hiring_status: cell(record, columns.hiring_status),
        }
    }

    fn malformed(&self, reason: String) -> DirectoryError {
        DirectoryError::MalformedSource {
            source_name: self.config.name.clone(),
            reason,
        }
    }

    fn unavailable(&self, err: io::Error) -> DirectoryError {
        DirectoryError::SourceUnavailable {
            source_name: self.config.name.clone(),
            reason: format!("{}: {}", self.config.path.display(), err),
        }
    }
}

impl SourceAdapter for CsvSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn traits(&self) -> SourceTraits {
        SourceTraits::from(&self.config)
    }

    fn required(&self) -> bool {
        self.config.required
    }

    fn read(&self) -> Result<Vec<SourceRow>> {
        let file = File::open(&self.config.path).map_err(|e| self.unavailable(e))?;
        let rows = self.read_from(file)?;
        info!(source = %self.config.name, path = %self.config.path.display(), rows = rows.len(), "loaded source");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SourceKind;

    fn source(kind: SourceKind) -> CsvSource {
        let mut cfg = SourceConfig::primary("tests/fixtures/jobs.csv");
        cfg.kind = kind;
        CsvSource::new(cfg)
    }

    #[test]
    fn maps_spreadsheet_columns_and_defaults() {
        let csv = "Remote Work Website,Links,About,Category\n\
                   Acme,http://acme.com,remote staffing agency[1],agency\n";
        let rows = source(SourceKind::Primary).read_from(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.origin, Origin::new("jobs", 2));
        assert_eq!(row.name, "Acme");
        assert_eq!(row.url, "https://acme.com");
        assert_eq!(row.about, "Remote staffing agency");
        assert_eq!(row.category_hint.as_deref(), Some("agency"));
        assert_eq!(row.tags, "agency");
        assert_eq!(row.remote_type, None);
        assert_eq!(row.rating, None);
    }

    #[test]
    fn tolerates_ragged_rows_and_blank_lines() {
        let csv = "name,url,description\n\
                   Short,short.ph\n\
                   ,,\n\
                   Long,https://long.ph,text,extra,cells\n";
        let rows = source(SourceKind::Primary).read_from(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].about, "");
        assert_eq!(rows[0].tags, "General");
        assert_eq!(rows[1].name, "Long");
        assert_eq!(rows[1].origin.line, 4);
    }

    #[test]
    fn fixed_about_replaces_column() {
        let mut cfg = SourceConfig::primary("groups.csv");
        cfg.name = "groups".into();
        cfg.kind = SourceKind::Groups;
        cfg.default_about = Some("Community group.".into());
        let csv = "Group Name,Facebook Link,About\nPH VAs,facebook.com/groups/phva,ignored\n";
        let rows = CsvSource::new(cfg).read_from(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].about, "Community group.");
        assert_eq!(rows[0].url, "https://facebook.com/groups/phva");
        assert_eq!(rows[0].traits.kind, SourceKind::Groups);
    }

    #[test]
    fn missing_url_column_is_malformed() {
        let csv = "name,about\nAcme,x\n";
        let err = source(SourceKind::Primary).read_from(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DirectoryError::MalformedSource { .. }));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let cfg = SourceConfig::primary("tests/fixtures/does-not-exist.csv");
        let err = CsvSource::new(cfg).read().unwrap_err();
        assert!(matches!(err, DirectoryError::SourceUnavailable { .. }));
    }

    #[test]
    fn reads_fixture_file() {
        let rows = source(SourceKind::Primary).read().unwrap();
        assert!(rows.len() >= 5);
        assert!(rows.iter().all(|r| r.url.starts_with("https://") || r.url.is_empty()));
    }
}
