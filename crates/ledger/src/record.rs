//! The ledger row model.
//!
//! Every field is a verbatim string: the ledger is a user-facing CSV and
//! values round-trip exactly as written. Only `id` and `recorded_at` are
//! auto-assigned when absent at append time.

use serde::{Deserialize, Serialize};

/// Canonical column order of the ledger file.
pub const LEDGER_COLUMNS: [&str; 19] = [
    "id",
    "recorded_at",
    "date",
    "theme_title",
    "theme_rank",
    "theme_file",
    "chart_url",
    "name",
    "code",
    "market_cap",
    "trade_value",
    "change_rate",
    "alpha",
    "beta",
    "next_trade_date",
    "next_close",
    "next_high",
    "next_close_rate",
    "next_high_rate",
];

/// The five forward-return columns the backfill pass may fill in.
pub const FORWARD_COLUMNS: [&str; 5] = [
    "next_trade_date",
    "next_close",
    "next_high",
    "next_close_rate",
    "next_high_rate",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub recorded_at: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub theme_title: String,
    #[serde(default)]
    pub theme_rank: String,
    #[serde(default)]
    pub theme_file: String,
    #[serde(default)]
    pub chart_url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub market_cap: String,
    #[serde(default)]
    pub trade_value: String,
    #[serde(default)]
    pub change_rate: String,
    #[serde(default)]
    pub alpha: String,
    #[serde(default)]
    pub beta: String,
    #[serde(default)]
    pub next_trade_date: String,
    #[serde(default)]
    pub next_close: String,
    #[serde(default)]
    pub next_high: String,
    #[serde(default)]
    pub next_close_rate: String,
    #[serde(default)]
    pub next_high_rate: String,
}

impl LedgerRecord {
    /// Read access by canonical column name.
    #[must_use]
    pub fn field(&self, column: &str) -> Option<&str> {
        let value = match column {
            "id" => &self.id,
            "recorded_at" => &self.recorded_at,
            "date" => &self.date,
            "theme_title" => &self.theme_title,
            "theme_rank" => &self.theme_rank,
            "theme_file" => &self.theme_file,
            "chart_url" => &self.chart_url,
            "name" => &self.name,
            "code" => &self.code,
            "market_cap" => &self.market_cap,
            "trade_value" => &self.trade_value,
            "change_rate" => &self.change_rate,
            "alpha" => &self.alpha,
            "beta" => &self.beta,
            "next_trade_date" => &self.next_trade_date,
            "next_close" => &self.next_close,
            "next_high" => &self.next_high,
            "next_close_rate" => &self.next_close_rate,
            "next_high_rate" => &self.next_high_rate,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// Write access by canonical column name; unknown columns are ignored.
    pub fn set_field(&mut self, column: &str, value: String) {
        let slot = match column {
            "id" => &mut self.id,
            "recorded_at" => &mut self.recorded_at,
            "date" => &mut self.date,
            "theme_title" => &mut self.theme_title,
            "theme_rank" => &mut self.theme_rank,
            "theme_file" => &mut self.theme_file,
            "chart_url" => &mut self.chart_url,
            "name" => &mut self.name,
            "code" => &mut self.code,
            "market_cap" => &mut self.market_cap,
            "trade_value" => &mut self.trade_value,
            "change_rate" => &mut self.change_rate,
            "alpha" => &mut self.alpha,
            "beta" => &mut self.beta,
            "next_trade_date" => &mut self.next_trade_date,
            "next_close" => &mut self.next_close,
            "next_high" => &mut self.next_high,
            "next_close_rate" => &mut self.next_close_rate,
            "next_high_rate" => &mut self.next_high_rate,
            _ => return,
        };
        *slot = value;
    }

    /// Fields in canonical column order, for writing.
    #[must_use]
    pub fn to_row(&self) -> Vec<&str> {
        LEDGER_COLUMNS
            .iter()
            .map(|column| self.field(column).unwrap_or_default())
            .collect()
    }

    /// Builds a record from a row under an arbitrary header; columns
    /// outside the canonical schema are skipped.
    #[must_use]
    pub fn from_fields(header: &[String], fields: &[String]) -> Self {
        let mut record = Self::default();
        for (column, value) in header.iter().zip(fields.iter()) {
            record.set_field(column, value.clone());
        }
        record
    }
}
