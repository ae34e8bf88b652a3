//! Snapshot directory layout.
//!
//! One 6-digit `yymmdd` directory per day under the root; inside, one CSV
//! per theme named `<rank>.<title>_<metric>.csv` (rank prefix optional)
//! plus housekeeping files (`00_*`, `00.*`) that are not themes.

use crate::columns::ColumnMap;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tema_core::dates;

pub struct SnapshotStore {
    root: PathBuf,
}

/// One parsed theme CSV: resolved columns plus raw rows in file order.
pub struct ThemeTable {
    pub columns: ColumnMap,
    pub rows: Vec<BTreeMap<String, String>>,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All snapshot-day directory names, ascending.
    #[must_use]
    pub fn list_dates(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut dates: Vec<String> = entries
            .filter_map(std::result::Result::ok)
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|name| dates::is_date_dir(name))
            .collect();
        dates.sort();
        dates
    }

    #[must_use]
    pub fn latest_date(&self) -> Option<String> {
        self.list_dates().pop()
    }

    /// Theme CSV files for one day, sorted by filename so repeated calls
    /// see an identical order. Housekeeping files are not themes.
    #[must_use]
    pub fn theme_files(&self, date_dir: &str) -> Vec<PathBuf> {
        let folder = self.root.join(date_dir);
        let Ok(entries) = fs::read_dir(&folder) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
            })
            .filter(|p| {
                let name = p
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default();
                !name.starts_with("00_") && !name.starts_with("00.")
            })
            .collect();
        files.sort();
        files
    }

    /// Reads one theme CSV, tolerating a UTF-8 BOM and ragged rows.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or is not CSV at all;
    /// individual malformed cells are the consumers' problem (they coerce).
    pub fn read_table(&self, path: &Path) -> Result<ThemeTable> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot CSV: {}", path.display()))?;
        let text = text.trim_start_matches('\u{feff}');

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());
        let headers: Vec<String> = reader
            .headers()
            .with_context(|| format!("Failed to parse CSV header: {}", path.display()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let columns = ColumnMap::resolve(&headers);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.with_context(|| format!("Failed to parse CSV row: {}", path.display()))?;
            let mut row = BTreeMap::new();
            for (header, field) in headers.iter().zip(record.iter()) {
                row.insert(header.clone(), field.to_string());
            }
            rows.push(row);
        }
        Ok(ThemeTable { columns, rows })
    }
}

/// Derives a theme title from its snapshot filename.
///
/// Handles all four shapes the ingestion collaborator has produced:
/// `1.전기차_1,045,470.csv`, `전기차_1,045,470.csv`, `1.전기차.csv`, `전기차.csv`.
#[must_use]
pub fn parse_theme_title(filename: &str) -> String {
    let mut base = filename.trim();
    if base.len() >= 4
        && base.is_char_boundary(base.len() - 4)
        && base[base.len() - 4..].eq_ignore_ascii_case(".csv")
    {
        base = &base[..base.len() - 4];
    }
    let base = base.trim();

    let mut title = base;
    if let Some((prefix, rest)) = base.split_once('.') {
        let digits = prefix.len();
        if (1..=3).contains(&digits) && prefix.chars().all(|c| c.is_ascii_digit()) {
            title = rest;
        }
    }
    if let Some((head, _metric)) = title.rsplit_once('_') {
        title = head;
    }
    title.trim().to_string()
}
