//! Column mapping for theme snapshot CSV files.
//!
//! The ingestion collaborator writes a known column vocabulary, but header
//! spellings drift (suffixes like "(백만)" appear and disappear). Each file
//! resolves its headers against a pinned alias table exactly once; the rest
//! of the crate only speaks in [`Column`] terms.

use std::collections::HashMap;

/// Canonical columns of a theme snapshot CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Name,
    Code,
    ChangeRate,
    TradeValue,
    Volume,
    Price,
    MarketCap,
    ChartUrl,
}

const ALIASES: &[(Column, &[&str])] = &[
    (Column::Name, &["종목명", "name"]),
    (Column::Code, &["종목코드", "code"]),
    (Column::ChangeRate, &["등락률", "change_rate"]),
    (Column::TradeValue, &["거래대금", "trade_value"]),
    (Column::Volume, &["거래량", "volume"]),
    (Column::Price, &["현재가", "price"]),
    (Column::MarketCap, &["시가총액", "market_cap"]),
    (Column::ChartUrl, &["차트링크", "chart_url"]),
];

/// Markers on a trade-value header meaning "values are in millions"; the
/// correction applies to comparison keys only, never to displayed values.
const MILLIONS_MARKERS: &[&str] = &["백만", "million"];

/// Header resolution for one file.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    headers: HashMap<Column, String>,
    trade_value_in_millions: bool,
}

impl ColumnMap {
    /// Resolves a header row. Exact alias matches win over substring
    /// matches; the first matching header in file order is kept.
    #[must_use]
    pub fn resolve(headers: &[String]) -> Self {
        let mut resolved = HashMap::new();
        for (column, aliases) in ALIASES {
            let exact = headers
                .iter()
                .find(|h| aliases.iter().any(|a| h.trim() == *a));
            let hit = exact.or_else(|| {
                headers
                    .iter()
                    .find(|h| aliases.iter().any(|a| h.contains(a)))
            });
            if let Some(header) = hit {
                resolved.insert(*column, header.clone());
            }
        }
        let trade_value_in_millions = resolved
            .get(&Column::TradeValue)
            .map(|h| MILLIONS_MARKERS.iter().any(|m| h.contains(m)))
            .unwrap_or(false);
        Self {
            headers: resolved,
            trade_value_in_millions,
        }
    }

    /// The file's actual header for a canonical column, if present.
    #[must_use]
    pub fn header(&self, column: Column) -> Option<&str> {
        self.headers.get(&column).map(String::as_str)
    }

    /// Whether the trade-value column carries the millions marker.
    #[must_use]
    pub fn trade_value_in_millions(&self) -> bool {
        self.trade_value_in_millions
    }
}
