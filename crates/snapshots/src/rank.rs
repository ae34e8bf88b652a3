//! Theme aggregation and ranking.

use crate::columns::Column;
use crate::row::{coerce_decimal, is_dominant, InstrumentRow};
use crate::store::{parse_theme_title, SnapshotStore, ThemeTable};
use anyhow::Result;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tema_core::config::DenyEntry;

/// One ranked theme for a single day. Derived per request; rank depends on
/// the dominant-exclusion toggle and is never cached across it.
#[derive(Debug, Clone, Serialize)]
pub struct RankedTheme {
    pub rank: usize,
    pub title: String,
    pub trade_sum: i64,
    pub filename: String,
}

/// Secondary sort applied to a theme's rows, independent of the ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewSort {
    ChangeRate,
    TradeValue,
    Volume,
}

impl PreviewSort {
    /// Lenient parser; unknown keys fall back to change-rate like every
    /// other out-of-range parameter gets clamped instead of rejected.
    #[must_use]
    pub fn parse(key: &str) -> Self {
        match key.trim().to_lowercase().as_str() {
            "trade_value" | "tradevalue" | "trade" | "value" | "거래대금" => Self::TradeValue,
            "volume" | "거래량" => Self::Volume,
            _ => Self::ChangeRate,
        }
    }
}

/// Ranks every theme of one snapshot day by aggregate trade value.
///
/// Deny-listed rows are dropped BEFORE the sum when `exclude_dominant` is
/// set, so the toggle reshuffles the ranking, not just the row lists.
/// Ties break by title, then filename; the order is deterministic for
/// identical input files.
#[must_use]
pub fn rank_themes(
    store: &SnapshotStore,
    date_dir: &str,
    deny: &[DenyEntry],
    exclude_dominant: bool,
) -> Vec<RankedTheme> {
    let mut records: Vec<RankedTheme> = Vec::new();
    for path in store.theme_files(date_dir) {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let table = match store.read_table(&path) {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!("skipping unreadable theme CSV {filename}: {e:#}");
                continue;
            }
        };
        let trade_sum = theme_trade_sum(&table, deny, exclude_dominant);
        records.push(RankedTheme {
            rank: 0,
            title: parse_theme_title(&filename),
            trade_sum,
            filename,
        });
    }

    records.sort_by(|a, b| {
        b.trade_sum
            .cmp(&a.trade_sum)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.filename.cmp(&b.filename))
    });
    for (idx, record) in records.iter_mut().enumerate() {
        record.rank = idx + 1;
    }
    records
}

/// Sum of trade values across a theme's (possibly deny-filtered) rows.
///
/// Values are summed as written in the file, with no millions rescaling:
/// the ingestion collaborator derives its filename metrics the same way,
/// and the two must stay comparable.
fn theme_trade_sum(table: &ThemeTable, deny: &[DenyEntry], exclude_dominant: bool) -> i64 {
    let Some(trade_header) = table.columns.header(Column::TradeValue) else {
        return 0;
    };
    let name_header = table.columns.header(Column::Name);
    let mut sum = Decimal::ZERO;
    for row in &table.rows {
        if exclude_dominant {
            let name = name_header.and_then(|h| row.get(h)).map(String::as_str);
            if is_dominant(name.unwrap_or_default(), deny) {
                continue;
            }
        }
        if let Some(value) = row.get(trade_header).and_then(|v| coerce_decimal(v)) {
            sum += value;
        }
    }
    sum.trunc().to_i64().unwrap_or(0)
}

/// Loads one theme's rows with the deny filter and secondary sort applied.
///
/// The sort is stable and descending; rows whose sort key does not parse
/// sink to the bottom. A millions-marked trade-value column is corrected
/// on the comparison key only.
///
/// # Errors
/// Returns an error when the file cannot be read at all.
pub fn load_theme_rows(
    store: &SnapshotStore,
    date_dir: &str,
    filename: &str,
    deny: &[DenyEntry],
    exclude_dominant: bool,
    sort: PreviewSort,
) -> Result<Vec<InstrumentRow>> {
    let path = store.root().join(date_dir).join(filename);
    let table = store.read_table(&path)?;

    let rows: Vec<InstrumentRow> = table
        .rows
        .iter()
        .cloned()
        .map(|raw| InstrumentRow::from_raw(raw, &table.columns))
        .filter(|row| !(exclude_dominant && is_dominant(&row.name, deny)))
        .collect();

    let millions = table.columns.trade_value_in_millions();
    let mut keyed: Vec<(Option<Decimal>, InstrumentRow)> = rows
        .into_iter()
        .map(|row| {
            let key = match sort {
                PreviewSort::ChangeRate => coerce_decimal(&row.change_rate),
                PreviewSort::TradeValue => coerce_decimal(&row.trade_value).map(|v| {
                    if millions {
                        v * Decimal::from(1_000_000)
                    } else {
                        v
                    }
                }),
                PreviewSort::Volume => coerce_decimal(&row.volume),
            };
            (key, row)
        })
        .collect();
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tema_core::config::MatchKind;
    use tempfile::TempDir;

    fn deny() -> Vec<DenyEntry> {
        vec![DenyEntry {
            pattern: "MegaCorp".to_string(),
            match_kind: MatchKind::Prefix,
        }]
    }

    fn write_day(tmp: &TempDir, files: &[(&str, &str)]) {
        let day = tmp.path().join("250806");
        fs::create_dir_all(&day).unwrap();
        for (name, body) in files {
            fs::write(day.join(name), body).unwrap();
        }
    }

    #[test]
    fn equal_sums_break_ties_lexicographically() {
        let tmp = TempDir::new().unwrap();
        write_day(
            &tmp,
            &[
                (
                    "1.Batteries_500.csv",
                    "종목명,종목코드,거래대금\nCellCo,000001,500\n",
                ),
                (
                    "2.Autos_500.csv",
                    "종목명,종목코드,거래대금\nCarCo,000002,500\n",
                ),
            ],
        );
        let store = SnapshotStore::new(tmp.path());
        let ranked = rank_themes(&store, "250806", &deny(), false);
        assert_eq!(ranked[0].title, "Autos");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].title, "Batteries");
        assert_eq!(ranked[1].rank, 2);
    }

    #[test]
    fn ranking_is_idempotent_for_identical_inputs() {
        let tmp = TempDir::new().unwrap();
        write_day(
            &tmp,
            &[
                ("1.A_1.csv", "종목명,거래대금\nX,100\nY,bad\n"),
                ("2.B_1.csv", "종목명,거래대금\nZ,100\n"),
                ("3.C_1.csv", "종목명,거래대금\nW,300\n"),
            ],
        );
        let store = SnapshotStore::new(tmp.path());
        let first = rank_themes(&store, "250806", &deny(), false);
        let second = rank_themes(&store, "250806", &deny(), false);
        let as_tuples = |v: &[RankedTheme]| {
            v.iter()
                .map(|t| (t.rank, t.title.clone(), t.trade_sum, t.filename.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(as_tuples(&first), as_tuples(&second));
        assert_eq!(first[0].title, "C");
    }

    #[test]
    fn dominant_exclusion_recomputes_sums_before_ranking() {
        let tmp = TempDir::new().unwrap();
        write_day(
            &tmp,
            &[
                (
                    "1.Chips_1100.csv",
                    "종목명,종목코드,거래대금\nMegaCorp,005930,1000\nMegaCorp Preferred,005935,50\nSmallChip,000660,50\n",
                ),
                (
                    "2.Autos_200.csv",
                    "종목명,종목코드,거래대금\nCarCo,000002,200\n",
                ),
            ],
        );
        let store = SnapshotStore::new(tmp.path());

        let with_all = rank_themes(&store, "250806", &deny(), false);
        assert_eq!(with_all[0].title, "Chips");
        assert_eq!(with_all[0].trade_sum, 1100);

        let excluded = rank_themes(&store, "250806", &deny(), true);
        assert_eq!(excluded[0].title, "Autos");
        assert_eq!(excluded[0].trade_sum, 200);
        assert_eq!(excluded[1].title, "Chips");
        assert_eq!(excluded[1].trade_sum, 50);
    }

    #[test]
    fn malformed_trade_values_coerce_to_zero() {
        let tmp = TempDir::new().unwrap();
        write_day(
            &tmp,
            &[("1.A_1.csv", "종목명,거래대금\nX,100\nY,n/a\nZ,\n")],
        );
        let store = SnapshotStore::new(tmp.path());
        let ranked = rank_themes(&store, "250806", &[], false);
        assert_eq!(ranked[0].trade_sum, 100);
    }

    #[test]
    fn preview_sort_is_independent_and_sinks_unparseable_keys() {
        let tmp = TempDir::new().unwrap();
        write_day(
            &tmp,
            &[(
                "1.A_1.csv",
                "종목명,등락률,거래대금,거래량\nLow,+1.0%,900,5\nHigh,+9.0%,100,1\nBad,,500,3\n",
            )],
        );
        let store = SnapshotStore::new(tmp.path());

        let by_change = load_theme_rows(
            &store,
            "250806",
            "1.A_1.csv",
            &[],
            false,
            PreviewSort::ChangeRate,
        )
        .unwrap();
        let names: Vec<&str> = by_change.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["High", "Low", "Bad"]);

        let by_trade = load_theme_rows(
            &store,
            "250806",
            "1.A_1.csv",
            &[],
            false,
            PreviewSort::TradeValue,
        )
        .unwrap();
        let names: Vec<&str> = by_trade.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Low", "Bad", "High"]);
    }

    #[test]
    fn millions_marker_rescales_comparison_keys_only() {
        let tmp = TempDir::new().unwrap();
        write_day(
            &tmp,
            &[(
                "1.A_1.csv",
                "종목명,거래대금(백만)\nBig,2\nSmall,1\n",
            )],
        );
        let store = SnapshotStore::new(tmp.path());
        let rows = load_theme_rows(
            &store,
            "250806",
            "1.A_1.csv",
            &[],
            false,
            PreviewSort::TradeValue,
        )
        .unwrap();
        assert_eq!(rows[0].name, "Big");
        // Displayed value stays as written.
        assert_eq!(rows[0].trade_value, "2");
    }

    #[test]
    fn sort_keys_parse_leniently() {
        assert_eq!(PreviewSort::parse("trade_value"), PreviewSort::TradeValue);
        assert_eq!(PreviewSort::parse("거래량"), PreviewSort::Volume);
        assert_eq!(PreviewSort::parse("changerate"), PreviewSort::ChangeRate);
        assert_eq!(PreviewSort::parse("garbage"), PreviewSort::ChangeRate);
    }
}
