//! Instrument rows and the lossy numeric coercion the snapshot CSVs need.

use crate::columns::{Column, ColumnMap};
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::OnceLock;
use tema_core::config::DenyEntry;
use tema_core::ForwardReturn;

/// One snapshot row, normalized to the canonical vocabulary.
///
/// Field values stay verbatim strings for display; `raw` carries every
/// original column through untouched.
#[derive(Debug, Clone, Serialize)]
pub struct InstrumentRow {
    pub name: String,
    pub code: String,
    pub change_rate: String,
    pub price: String,
    pub trade_value: String,
    pub volume: String,
    pub market_cap: String,
    pub chart_url: String,
    pub raw: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward: Option<ForwardReturn>,
}

impl InstrumentRow {
    #[must_use]
    pub fn from_raw(raw: BTreeMap<String, String>, columns: &ColumnMap) -> Self {
        let pick = |column: Column| -> String {
            columns
                .header(column)
                .and_then(|h| raw.get(h))
                .cloned()
                .unwrap_or_default()
        };
        Self {
            name: pick(Column::Name),
            code: pick(Column::Code),
            change_rate: pick(Column::ChangeRate),
            price: pick(Column::Price),
            trade_value: pick(Column::TradeValue),
            volume: pick(Column::Volume),
            market_cap: pick(Column::MarketCap),
            chart_url: pick(Column::ChartUrl),
            raw,
            forward: None,
        }
    }
}

/// Whether a row names a dominant instrument on the deny-list.
#[must_use]
pub fn is_dominant(name: &str, deny: &[DenyEntry]) -> bool {
    let name = name.trim();
    if name.is_empty() {
        return false;
    }
    deny.iter().any(|entry| entry.matches(name))
}

fn num_re() -> &'static Regex {
    static NUM_RE: OnceLock<Regex> = OnceLock::new();
    NUM_RE.get_or_init(|| Regex::new(r"[-+]?\d+(?:\.\d+)?").expect("valid numeric regex"))
}

/// Extracts the first numeric token from a display value ("1,234", "+5.3%",
/// "12,345백만"). Malformed input is partial input, not an error.
#[must_use]
pub fn coerce_decimal(s: &str) -> Option<Decimal> {
    let cleaned = s.trim().replace([',', '%', '+'], "");
    if cleaned.is_empty() {
        return None;
    }
    let token = num_re().find(&cleaned)?;
    Decimal::from_str(token.as_str()).ok()
}

/// Integer coercion for sums and sort keys; malformed values become zero.
#[must_use]
pub fn coerce_i64(s: &str) -> i64 {
    coerce_decimal(s)
        .and_then(|d| d.trunc().to_i64())
        .unwrap_or(0)
}
