//! The durable record ledger.
//!
//! A flat CSV file behind a single writer lock. Every mutation is
//! serialized; every rewrite goes through a temp file and an atomic
//! rename, so a reader sees either the old file or the new one, never a
//! partial write.

use crate::backfill::backfill_forward_fields;
use crate::record::{LedgerRecord, LEDGER_COLUMNS};
use crate::schema::{ensure_schema, new_record_id, write_records_atomic};
use chrono::Local;
use std::cmp::Ordering;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tema_core::dates;
use tema_forward::{ForwardReturnJoiner, TradingCalendar};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Delete matched zero rows (or the ledger does not exist yet).
    #[error("record not found: {id}")]
    NotFound { id: String },

    /// A hand-edited ledger without an id column cannot serve deletes.
    #[error("ledger has no id column")]
    MissingIdColumn,

    /// The file exists but cannot be parsed as CSV at all.
    #[error("ledger unreadable: {0}")]
    Unreadable(String),

    /// A row could not be serialized.
    #[error("ledger write failed: {0}")]
    Write(String),

    #[error("ledger i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ordering for [`RecordLedger::list`], by derived date key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Lenient parser, descending unless asked otherwise.
    #[must_use]
    pub fn parse(key: &str) -> Self {
        match key.trim().to_lowercase().as_str() {
            "asc" | "up" | "1" | "true" | "yes" | "y" => Self::Asc,
            _ => Self::Desc,
        }
    }
}

pub struct RecordLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

/// A ledger file read without schema interpretation, for operations that
/// must preserve a hand-edited header verbatim.
struct RawTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RecordLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record, assigning an identifier and write timestamp
    /// when the caller did not supply them. Returns the stored record.
    ///
    /// # Errors
    /// Fails only on I/O; a missing file is created with its header.
    pub async fn append(&self, mut record: LedgerRecord) -> Result<LedgerRecord, LedgerError> {
        let _guard = self.write_lock.lock().await;
        ensure_schema(&self.path)?;

        if record.id.trim().is_empty() {
            record.id = new_record_id();
        }
        if record.recorded_at.trim().is_empty() {
            record.recorded_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let new_file = !self.path.exists() || fs::metadata(&self.path)?.len() == 0;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if new_file {
            file.write_all("\u{feff}".as_bytes())?;
        }
        let mut writer = csv::Writer::from_writer(file);
        if new_file {
            writer
                .write_record(LEDGER_COLUMNS)
                .map_err(|e| LedgerError::Write(e.to_string()))?;
        }
        writer
            .write_record(record.to_row())
            .map_err(|e| LedgerError::Write(e.to_string()))?;
        writer.flush()?;
        Ok(record)
    }

    /// All records ordered by derived date key. Records whose date parses
    /// in neither compact format sort last regardless of direction.
    ///
    /// # Errors
    /// Fails when the file exists but cannot be read; a missing ledger is
    /// just empty.
    pub async fn list(&self, order: SortOrder) -> Result<Vec<LedgerRecord>, LedgerError> {
        let _guard = self.write_lock.lock().await;
        ensure_schema(&self.path)?;
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut records = read_records(&self.path)?;
        sort_by_date_key(&mut records, order);
        Ok(records)
    }

    /// Deletes rows matching the identifier, preserving the on-disk header
    /// (including a hand-edited one) verbatim.
    ///
    /// # Errors
    /// [`LedgerError::NotFound`] when nothing matched.
    pub async fn delete(&self, id: &str) -> Result<usize, LedgerError> {
        let _guard = self.write_lock.lock().await;
        ensure_schema(&self.path)?;
        if id.trim().is_empty() || !self.path.exists() {
            return Err(LedgerError::NotFound { id: id.to_string() });
        }

        let mut table = read_raw(&self.path)?;
        let Some(id_pos) = table.header.iter().position(|h| h == "id") else {
            return Err(LedgerError::MissingIdColumn);
        };
        let before = table.rows.len();
        table
            .rows
            .retain(|row| row.get(id_pos).map(String::as_str) != Some(id));
        let removed = before - table.rows.len();
        if removed == 0 {
            return Err(LedgerError::NotFound { id: id.to_string() });
        }
        write_raw_atomic(&self.path, &table)?;
        Ok(removed)
    }

    /// Bulk correction pass: re-resolves forward fields for every record
    /// and fills the ones that are empty. Rewrites the file only when
    /// something actually changed; returns how many rows did.
    ///
    /// # Errors
    /// Fails when the file exists but cannot be read or rewritten.
    pub async fn fix_forward_fields(
        &self,
        calendar: &TradingCalendar,
        joiner: &ForwardReturnJoiner,
    ) -> Result<usize, LedgerError> {
        let _guard = self.write_lock.lock().await;
        ensure_schema(&self.path)?;
        if !self.path.exists() {
            return Ok(0);
        }

        let mut records = read_records(&self.path)?;
        let mut fixed = 0;
        for record in &mut records {
            if backfill_forward_fields(record, calendar, joiner).await {
                fixed += 1;
            }
        }
        if fixed > 0 {
            write_records_atomic(&self.path, &records)?;
            tracing::info!("ledger backfill corrected {fixed} rows");
        }
        Ok(fixed)
    }
}

fn read_records(path: &Path) -> Result<Vec<LedgerRecord>, LedgerError> {
    let table = read_raw(path)?;
    Ok(table
        .rows
        .iter()
        .map(|fields| LedgerRecord::from_fields(&table.header, fields))
        .collect())
}

fn read_raw(path: &Path) -> Result<RawTable, LedgerError> {
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
    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| LedgerError::Unreadable(e.to_string()))?;
        rows.push(row.iter().map(str::to_string).collect());
    }
    Ok(RawTable { header, rows })
}

fn write_raw_atomic(path: &Path, table: &RawTable) -> Result<(), LedgerError> {
    let tmp = path.with_extension("csv.tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all("\u{feff}".as_bytes())?;
        let mut writer = csv::Writer::from_writer(file);
        writer
            .write_record(&table.header)
            .map_err(|e| LedgerError::Write(e.to_string()))?;
        for row in &table.rows {
            writer
                .write_record(row)
                .map_err(|e| LedgerError::Write(e.to_string()))?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn sort_by_date_key(records: &mut Vec<LedgerRecord>, order: SortOrder) {
    let asc = order == SortOrder::Asc;
    let mut keyed: Vec<(Option<String>, LedgerRecord)> = records
        .drain(..)
        .map(|r| (dates::sort_key(&r.date), r))
        .collect();
    keyed.sort_by(|a, b| match (&a.0, &b.0) {
        (Some(x), Some(y)) => {
            if asc {
                x.cmp(y)
            } else {
                y.cmp(x)
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    records.extend(keyed.into_iter().map(|(_, record)| record));
}
