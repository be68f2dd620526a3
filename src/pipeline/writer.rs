//! Canonical dataset files and source CSV rewrites. Every write goes to a
//! temp file in the destination directory and is renamed into place.

use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{Dataset, Draft};
use crate::error::Result;
use crate::model::Listing;
use crate::settings::ColumnAliases;
use crate::source::columns::ColumnMap;

pub const SITES_FILE: &str = "sites.json";
pub const COMMUNITY_FILE: &str = "community.json";
pub const SEARCH_INDEX_FILE: &str = "search-index.json";

pub const CANONICAL_HEADERS: [&str; 9] = [
    "name",
    "url",
    "description",
    "category",
    "tags",
    "remote_type",
    "rating",
    "last_verified",
    "hiring_status",
];

/// Write `sites.json`, `search-index.json` and, when the community pool is
/// non-empty, `community.json`. Returns the paths written.
pub fn write_dataset(dir: &Path, dataset: &Dataset) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let sites = dir.join(SITES_FILE);
    write_json_atomic(&sites, &dataset.primary)?;
    written.push(sites);

    let community = dir.join(COMMUNITY_FILE);
    if dataset.community.is_empty() {
        // outputs are replaced wholesale; drop a stale pool from an earlier run
        if community.exists() {
            fs::remove_file(&community)?;
            debug!(path = %community.display(), "removed stale community pool");
        }
    } else {
        write_json_atomic(&community, &dataset.community)?;
        written.push(community);
    }

    let index = dir.join(SEARCH_INDEX_FILE);
    write_json_atomic(&index, &dataset.search_index())?;
    written.push(index);

    info!(dir = %dir.display(), primary = dataset.primary.len(), community = dataset.community.len(), "dataset written");
    Ok(written)
}

/// Read a previously built dataset; a missing community file means an empty pool.
pub fn load_dataset(dir: &Path) -> Result<Dataset> {
    let primary: Vec<Listing> = serde_json::from_str(&fs::read_to_string(dir.join(SITES_FILE))?)?;
    let community_path = dir.join(COMMUNITY_FILE);
    let community: Vec<Listing> = if community_path.exists() {
        serde_json::from_str(&fs::read_to_string(community_path)?)?
    } else {
        Vec::new()
    };
    Ok(Dataset { primary, community })
}

pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(parent_dir(path))?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.write_all(b"\n")?;
    tmp.persist(path).map_err(|e| e.error)?;
    debug!(path = %path.display(), "wrote json");
    Ok(())
}

/// Replace a source CSV with canonical headers and one row per listing.
pub fn write_source_csv(path: &Path, listings: &[Listing]) -> Result<()> {
    write_rows(path, listings.iter().map(canonical_row))
}

/// Replace a source CSV with merged, unvalidated rows. Values are written as
/// the sources had them; nothing is truncated or defaulted.
pub fn write_merged_csv(path: &Path, drafts: &[Draft]) -> Result<()> {
    write_rows(path, drafts.iter().map(draft_row))
}

fn write_rows(path: &Path, rows: impl Iterator<Item = [String; 9]>) -> Result<()> {
    let tmp = NamedTempFile::new_in(parent_dir(path))?;
    let mut wtr = WriterBuilder::new().from_writer(tmp);
    wtr.write_record(CANONICAL_HEADERS)?;
    let mut count = 0usize;
    for row in rows {
        wtr.write_record(row)?;
        count += 1;
    }
    wtr.flush()?;
    let tmp = wtr.into_inner().map_err(|e| e.into_error())?;
    tmp.persist(path).map_err(|e| e.error)?;
    info!(path = %path.display(), rows = count, "rewrote source");
    Ok(())
}

/// Append one listing to a source CSV, laid out under whatever headers the
/// file already uses. A missing file is created with canonical headers.
pub fn append_source_row(path: &Path, listing: &Listing, aliases: &ColumnAliases) -> Result<()> {
    if !path.exists() {
        return write_source_csv(path, std::slice::from_ref(listing));
    }

    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers = rdr.headers()?.clone();
    let columns = ColumnMap::resolve(&headers, aliases);
    let record = layout_row(&headers, &columns, listing);

    let mut file = OpenOptions::new().read(true).append(true).open(path)?;
    if !ends_with_newline(&mut file)? {
        file.write_all(b"\n")?;
    }
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(file);
    wtr.write_record(&record)?;
    wtr.flush()?;
    info!(path = %path.display(), id = %listing.id, "appended listing");
    Ok(())
}

fn canonical_row(l: &Listing) -> [String; 9] {
    [
        l.name.clone(),
        l.url.clone(),
        l.description.clone(),
        l.category.to_string(),
        l.tags.clone(),
        l.remote_type.to_string(),
        l.rating.map(|r| r.to_string()).unwrap_or_default(),
        l.last_verified.format(super::validate::DATE_FORMAT).to_string(),
        l.hiring_status.to_string(),
    ]
}

fn draft_row(d: &Draft) -> [String; 9] {
    let raw = |v: &Option<String>| v.clone().unwrap_or_default();
    [
        d.name.clone(),
        d.url.clone(),
        d.description.clone(),
        d.category.to_string(),
        d.tags.clone(),
        raw(&d.remote_type),
        raw(&d.rating),
        raw(&d.last_verified),
        raw(&d.hiring_status),
    ]
}

fn layout_row(headers: &StringRecord, columns: &ColumnMap, listing: &Listing) -> Vec<String> {
    let mut record = vec![String::new(); headers.len()];
    let values = canonical_row(listing);
    let slots = [
        columns.name,
        columns.url,
        columns.description,
        columns.category,
        columns.tags,
        columns.remote_type,
        columns.rating,
        columns.last_verified,
        columns.hiring_status,
    ];
    for (slot, value) in slots.into_iter().zip(values) {
        if let Some(idx) = slot {
            record[idx] = value;
        }
    }
    record
}

fn ends_with_newline(file: &mut fs::File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}
