//! Ledger schema migration.
//!
//! Older ledger files carry a strict subset of the current columns; they
//! are upgraded in place (missing columns appended empty, missing
//! identifiers assigned) before any read or write. A header that is NOT a
//! subset means the user edited the file by hand; it is left untouched and
//! only the recognized columns are addressed.

use crate::record::{LedgerRecord, LEDGER_COLUMNS};
use crate::store::LedgerError;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use uuid::Uuid;

/// Runs the migration check. Returns whether the file was rewritten.
/// Must be called with the ledger writer lock held.
pub(crate) fn ensure_schema(path: &Path) -> Result<bool, LedgerError> {
    if !path.exists() || fs::metadata(path)?.len() == 0 {
        return Ok(false);
    }

    let text = fs::read_to_string(path)?;
    let text = text.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let header: Vec<String> = reader
        .headers()
        .map_err(|e| LedgerError::Unreadable(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if header.iter().map(String::as_str).eq(LEDGER_COLUMNS) {
        return Ok(false);
    }
    let known: HashSet<&str> = LEDGER_COLUMNS.iter().copied().collect();
    if !header.iter().all(|h| known.contains(h.as_str())) {
        tracing::info!(
            "ledger header at {} is not a subset of the current schema; leaving it as-is",
            path.display()
        );
        return Ok(false);
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| LedgerError::Unreadable(e.to_string()))?;
        let fields: Vec<String> = row.iter().map(str::to_string).collect();
        records.push(LedgerRecord::from_fields(&header, &fields));
    }
    for record in &mut records {
        if record.id.trim().is_empty() {
            record.id = new_record_id();
        }
    }

    write_records_atomic(path, &records)?;
    tracing::info!(
        "migrated ledger at {}: {} -> {} columns across {} rows",
        path.display(),
        header.len(),
        LEDGER_COLUMNS.len(),
        records.len()
    );
    Ok(true)
}

#[must_use]
pub(crate) fn new_record_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Rewrites the whole ledger in canonical column order: temp file first,
/// then an atomic rename so readers never see a torn file.
pub(crate) fn write_records_atomic(
    path: &Path,
    records: &[LedgerRecord],
) -> Result<(), LedgerError> {
    let tmp = path.with_extension("csv.tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        // Spreadsheets expect the BOM on these files.
        file.write_all("\u{feff}".as_bytes())?;
        let mut writer = csv::Writer::from_writer(file);
        writer
            .write_record(LEDGER_COLUMNS)
            .map_err(|e| LedgerError::Write(e.to_string()))?;
        for record in records {
            writer
                .write_record(record.to_row())
                .map_err(|e| LedgerError::Write(e.to_string()))?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
