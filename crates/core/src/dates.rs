//! Compact market-date codes.
//!
//! Snapshot directories and ledger rows carry dates as 6-digit `yymmdd`
//! strings while the price gateway speaks 8-digit `yyyymmdd`. Two-digit
//! years pivot at 70: 00-69 map to 2000-2069, 70-99 to 1970-1999.

use chrono::NaiveDate;

/// Parses a compact date in either `yymmdd` or `yyyymmdd` form.
///
/// Dashes are tolerated (`2025-08-06`); anything else returns `None`.
#[must_use]
pub fn parse_compact(s: &str) -> Option<NaiveDate> {
    let v: String = s.trim().chars().filter(|c| *c != '-').collect();
    if !v.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (year, rest) = match v.len() {
        6 => {
            let yy: i32 = v[0..2].parse().ok()?;
            let year = if yy <= 69 { 2000 + yy } else { 1900 + yy };
            (year, &v[2..])
        }
        8 => (v[0..4].parse().ok()?, &v[4..]),
        _ => return None,
    };
    let month: u32 = rest[0..2].parse().ok()?;
    let day: u32 = rest[2..4].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[must_use]
pub fn yymmdd(date: NaiveDate) -> String {
    date.format("%y%m%d").to_string()
}

#[must_use]
pub fn yyyymmdd(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Sortable key for ledger ordering: `yyyymmdd`, or `None` when the value
/// parses in neither compact format.
#[must_use]
pub fn sort_key(s: &str) -> Option<String> {
    parse_compact(s).map(yyyymmdd)
}

/// Whether a directory name is a 6-digit snapshot-day code.
#[must_use]
pub fn is_date_dir(name: &str) -> bool {
    name.len() == 6 && name.chars().all(|c| c.is_ascii_digit())
}
