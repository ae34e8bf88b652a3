//! Historical momentum analytics over ranked snapshot days.

use crate::rank::rank_themes;
use crate::store::SnapshotStore;
use serde::Serialize;
use std::collections::HashMap;
use tema_core::config::DenyEntry;

const HOTTEST_LIMIT: usize = 20;
const RISING_LIMIT: usize = 20;

/// A theme's appearance on one day of the lookback window.
#[derive(Debug, Clone)]
struct Appearance {
    date: String,
    rank: usize,
    trade_sum: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HotTheme {
    pub title: String,
    /// Days the theme appeared in the top-N.
    pub freq: usize,
    pub avg_rank: f64,
    pub avg_trade_sum: i64,
    /// Recency-weighted placement score; newer appearances weigh more.
    pub momentum_score: f64,
    pub last_seen: String,
    pub last_rank: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RisingTheme {
    pub title: String,
    /// Average-rank improvement from the older half to the newer half;
    /// positive means climbing toward rank 1.
    pub improvement: f64,
    pub older_avg_rank: f64,
    pub newer_avg_rank: f64,
    pub newer_freq: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsightsSummary {
    pub dates: Vec<String>,
    pub hottest: Vec<HotTheme>,
    pub rising: Vec<RisingTheme>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThemeHistoryEntry {
    pub date: String,
    pub title: String,
    pub rank: usize,
    pub trade_sum: i64,
    pub filename: String,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Hottest and rising themes over the most recent `lookback` snapshot days,
/// considering only top-`top_n` placements per day.
#[must_use]
pub fn summarize(
    store: &SnapshotStore,
    deny: &[DenyEntry],
    lookback: usize,
    top_n: usize,
    exclude_dominant: bool,
) -> InsightsSummary {
    let dates = store.list_dates();
    if dates.is_empty() {
        return InsightsSummary {
            dates: Vec::new(),
            hottest: Vec::new(),
            rising: Vec::new(),
        };
    }
    let lookback = lookback.max(1);
    let top_n = top_n.max(1);
    let use_dates: Vec<String> = dates
        .into_iter()
        .rev()
        .take(lookback)
        .rev()
        .collect();

    let mut history: HashMap<String, Vec<Appearance>> = HashMap::new();
    for date in &use_dates {
        for theme in rank_themes(store, date, deny, exclude_dominant)
            .into_iter()
            .take(top_n)
        {
            if theme.title.is_empty() {
                continue;
            }
            history.entry(theme.title.clone()).or_default().push(Appearance {
                date: date.clone(),
                rank: theme.rank,
                trade_sum: theme.trade_sum,
            });
        }
    }

    let window_len = use_dates.len();
    let day_index: HashMap<&str, usize> = use_dates
        .iter()
        .enumerate()
        .map(|(i, d)| (d.as_str(), i))
        .collect();

    let mut hottest: Vec<HotTheme> = history
        .iter()
        .map(|(title, rows)| {
            let freq = rows.len();
            let avg_rank = rows.iter().map(|a| a.rank as f64).sum::<f64>() / freq.max(1) as f64;
            let avg_trade =
                rows.iter().map(|a| a.trade_sum as f64).sum::<f64>() / freq.max(1) as f64;
            let momentum = rows
                .iter()
                .map(|a| {
                    let weight =
                        (day_index[a.date.as_str()] + 1) as f64 / window_len as f64;
                    weight * (top_n + 1 - a.rank.min(top_n + 1)) as f64
                })
                .sum::<f64>();
            let last = rows.last().expect("non-empty appearance list");
            HotTheme {
                title: title.clone(),
                freq,
                avg_rank: round2(avg_rank),
                avg_trade_sum: avg_trade as i64,
                momentum_score: round2(momentum),
                last_seen: last.date.clone(),
                last_rank: last.rank,
            }
        })
        .collect();
    hottest.sort_by(|a, b| {
        b.freq
            .cmp(&a.freq)
            .then_with(|| a.avg_rank.total_cmp(&b.avg_rank))
            .then_with(|| b.momentum_score.total_cmp(&a.momentum_score))
            .then_with(|| b.avg_trade_sum.cmp(&a.avg_trade_sum))
    });
    hottest.truncate(HOTTEST_LIMIT);

    // Rising: older half vs newer half of the window. Themes absent from
    // either half carry no signal and are excluded, not zeroed.
    let split = (window_len / 2).max(1);
    let mut rising: Vec<RisingTheme> = history
        .iter()
        .filter_map(|(title, rows)| {
            let older: Vec<usize> = rows
                .iter()
                .filter(|a| day_index[a.date.as_str()] < split)
                .map(|a| a.rank)
                .collect();
            let newer: Vec<usize> = rows
                .iter()
                .filter(|a| day_index[a.date.as_str()] >= split)
                .map(|a| a.rank)
                .collect();
            if older.is_empty() || newer.is_empty() {
                return None;
            }
            let older_avg = older.iter().sum::<usize>() as f64 / older.len() as f64;
            let newer_avg = newer.iter().sum::<usize>() as f64 / newer.len() as f64;
            Some(RisingTheme {
                title: title.clone(),
                improvement: round2(older_avg - newer_avg),
                older_avg_rank: round2(older_avg),
                newer_avg_rank: round2(newer_avg),
                newer_freq: newer.len(),
            })
        })
        .collect();
    rising.sort_by(|a, b| {
        b.improvement
            .total_cmp(&a.improvement)
            .then_with(|| a.newer_avg_rank.total_cmp(&b.newer_avg_rank))
            .then_with(|| b.newer_freq.cmp(&a.newer_freq))
    });
    rising.truncate(RISING_LIMIT);

    InsightsSummary {
        dates: use_dates,
        hottest,
        rising,
    }
}

/// Per-day ranking history for themes whose title contains `needle`
/// (case-insensitive); at most one hit per day.
#[must_use]
pub fn theme_history(
    store: &SnapshotStore,
    deny: &[DenyEntry],
    needle: &str,
    lookback: usize,
    exclude_dominant: bool,
) -> Vec<ThemeHistoryEntry> {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    let dates = store.list_dates();
    let use_dates: Vec<String> = dates
        .into_iter()
        .rev()
        .take(lookback.max(1))
        .rev()
        .collect();

    let mut out = Vec::new();
    for date in use_dates {
        let ranked = rank_themes(store, &date, deny, exclude_dominant);
        if let Some(theme) = ranked
            .into_iter()
            .find(|t| t.title.to_lowercase().contains(&needle))
        {
            out.push(ThemeHistoryEntry {
                date,
                title: theme.title,
                rank: theme.rank,
                trade_sum: theme.trade_sum,
                filename: theme.filename,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Four days of snapshots; Alpha dominates early, Gamma climbs late.
    fn fixture() -> (TempDir, SnapshotStore) {
        let tmp = TempDir::new().unwrap();
        let days: &[(&str, &[(&str, i64)])] = &[
            ("250801", &[("Alpha", 900), ("Beta", 500), ("Gamma", 100)]),
            ("250802", &[("Alpha", 800), ("Beta", 400), ("Gamma", 200)]),
            ("250803", &[("Gamma", 900), ("Alpha", 700), ("Beta", 100)]),
            ("250804", &[("Gamma", 950), ("Alpha", 600), ("Beta", 50)]),
        ];
        for (day, themes) in days {
            let dir = tmp.path().join(day);
            fs::create_dir_all(&dir).unwrap();
            for (idx, (title, sum)) in themes.iter().enumerate() {
                let body = format!("종목명,종목코드,거래대금\nStock,000001,{sum}\n");
                fs::write(dir.join(format!("{}.{title}_{sum}.csv", idx + 1)), body).unwrap();
            }
        }
        let store = SnapshotStore::new(tmp.path().to_path_buf());
        (tmp, store)
    }

    #[test]
    fn hottest_orders_by_frequency_then_average_rank() {
        let (_tmp, store) = fixture();
        let summary = summarize(&store, &[], 4, 3, false);
        assert_eq!(summary.dates.len(), 4);
        // All three themes appear all four days; Alpha has the best
        // average rank (1,1,2,2) and leads.
        assert_eq!(summary.hottest[0].title, "Alpha");
        assert_eq!(summary.hottest[0].freq, 4);
        assert_eq!(summary.hottest[0].avg_rank, 1.5);
        assert_eq!(summary.hottest[0].last_seen, "250804");
        assert_eq!(summary.hottest[0].last_rank, 2);
    }

    #[test]
    fn momentum_weights_recent_days_more() {
        let (_tmp, store) = fixture();
        let summary = summarize(&store, &[], 4, 3, false);
        let gamma = summary
            .hottest
            .iter()
            .find(|t| t.title == "Gamma")
            .unwrap();
        let alpha = summary
            .hottest
            .iter()
            .find(|t| t.title == "Alpha")
            .unwrap();
        // Gamma's top placements are all recent: ranks 3,3,1,1 with weights
        // .25,.5,.75,1 and top_n=3 gives 0.25*1 + 0.5*1 + 0.75*3 + 1*3 = 6.0.
        assert_eq!(gamma.momentum_score, 6.0);
        // Alpha: ranks 1,1,2,2 -> 0.25*3 + 0.5*3 + 0.75*2 + 1*2 = 5.75.
        assert_eq!(alpha.momentum_score, 5.75);
    }

    #[test]
    fn rising_compares_window_halves() {
        let (_tmp, store) = fixture();
        let summary = summarize(&store, &[], 4, 3, false);
        let gamma = summary.rising.iter().find(|t| t.title == "Gamma").unwrap();
        // Older half ranks (3,3) -> 3.0; newer half (1,1) -> 1.0.
        assert_eq!(gamma.older_avg_rank, 3.0);
        assert_eq!(gamma.newer_avg_rank, 1.0);
        assert_eq!(gamma.improvement, 2.0);
        assert_eq!(gamma.newer_freq, 2);
        assert_eq!(summary.rising[0].title, "Gamma");
    }

    #[test]
    fn themes_missing_from_a_half_are_excluded_from_rising() {
        let (tmp, store) = fixture();
        // Delta only exists on the last day.
        let dir = tmp.path().join("250804");
        fs::write(
            dir.join("4.Delta_20.csv"),
            "종목명,종목코드,거래대금\nStock,000001,20\n",
        )
        .unwrap();
        let summary = summarize(&store, &[], 4, 10, false);
        assert!(summary.hottest.iter().any(|t| t.title == "Delta"));
        assert!(!summary.rising.iter().any(|t| t.title == "Delta"));
    }

    #[test]
    fn top_n_cut_applies_per_day() {
        let (_tmp, store) = fixture();
        // With top_n = 1 only the day's leader is retained.
        let summary = summarize(&store, &[], 4, 1, false);
        let alpha = summary.hottest.iter().find(|t| t.title == "Alpha").unwrap();
        assert_eq!(alpha.freq, 2);
        let gamma = summary.hottest.iter().find(|t| t.title == "Gamma").unwrap();
        assert_eq!(gamma.freq, 2);
        assert!(!summary.hottest.iter().any(|t| t.title == "Beta"));
    }

    #[test]
    fn history_matches_substring_case_insensitively() {
        let (_tmp, store) = fixture();
        let rows = theme_history(&store, &[], "gam", 4, false);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].date, "250801");
        assert_eq!(rows[0].rank, 3);
        assert_eq!(rows[3].date, "250804");
        assert_eq!(rows[3].rank, 1);
        assert!(theme_history(&store, &[], "", 4, false).is_empty());
    }
}
