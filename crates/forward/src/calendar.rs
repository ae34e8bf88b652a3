//! Trading-calendar resolution by probing the price source.
//!
//! There is no authoritative holiday feed; a day counts as a trading day
//! when the reference instrument produced a bar dated exactly that day.
//! The exact-date check rejects gateways that silently substitute the
//! nearest session for a holiday probe.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tema_core::DailyBarSource;
use tokio::sync::RwLock;

/// How many calendar days a probe scan may cover before giving up.
pub const PROBE_WINDOW_DAYS: u64 = 60;

pub struct TradingCalendar {
    source: Arc<dyn DailyBarSource>,
    reference_code: String,
    base_cache: RwLock<HashMap<NaiveDate, NaiveDate>>,
    next_cache: RwLock<HashMap<NaiveDate, NaiveDate>>,
}

/// The (base, next) pair a snapshot day maps to, with a human-readable
/// reason when part of it is unavailable.
#[derive(Debug, Clone, Serialize)]
pub struct ForwardWindow {
    pub base: Option<NaiveDate>,
    pub next: Option<NaiveDate>,
    pub warn: Option<String>,
}

impl ForwardWindow {
    /// Window for requests where forward data is not applicable at all.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            base: None,
            next: None,
            warn: None,
        }
    }

    /// Both days, when the window is complete enough to enrich with.
    #[must_use]
    pub fn ready(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.base?, self.next?))
    }
}

impl TradingCalendar {
    pub fn new(source: Arc<dyn DailyBarSource>, reference_code: impl Into<String>) -> Self {
        Self {
            source,
            reference_code: reference_code.into(),
            base_cache: RwLock::new(HashMap::new()),
            next_cache: RwLock::new(HashMap::new()),
        }
    }

    /// The base trading day for `day`: the most recent trading day at or
    /// before it, or `None` when nothing matched within the probe window.
    pub async fn base_trading_day(&self, day: NaiveDate) -> Option<NaiveDate> {
        if let Some(hit) = self.base_cache.read().await.get(&day) {
            return Some(*hit);
        }
        for offset in 0..PROBE_WINDOW_DAYS {
            let probe = day.checked_sub_days(Days::new(offset))?;
            if self.is_trading_day(probe).await {
                self.base_cache.write().await.insert(day, probe);
                return Some(probe);
            }
        }
        tracing::warn!("no trading day found within {PROBE_WINDOW_DAYS} days before {day}");
        None
    }

    /// The first trading day strictly after `day`, or `None` when the
    /// window is exhausted (typically: the next session has not happened).
    pub async fn next_trading_day(&self, day: NaiveDate) -> Option<NaiveDate> {
        if let Some(hit) = self.next_cache.read().await.get(&day) {
            return Some(*hit);
        }
        for offset in 1..PROBE_WINDOW_DAYS {
            let probe = day.checked_add_days(Days::new(offset))?;
            if self.is_trading_day(probe).await {
                self.next_cache.write().await.insert(day, probe);
                return Some(probe);
            }
        }
        None
    }

    /// Resolves the (base, next) pair for one snapshot day.
    pub async fn forward_window(&self, day: NaiveDate) -> ForwardWindow {
        let Some(base) = self.base_trading_day(day).await else {
            return ForwardWindow {
                base: None,
                next: None,
                warn: Some("no trading session found within the probe window".to_string()),
            };
        };
        match self.next_trading_day(base).await {
            Some(next) => ForwardWindow {
                base: Some(base),
                next: Some(next),
                warn: None,
            },
            None => ForwardWindow {
                base: Some(base),
                next: None,
                warn: Some("next trading session not yet available".to_string()),
            },
        }
    }

    async fn is_trading_day(&self, probe: NaiveDate) -> bool {
        match self
            .source
            .bar_for_instrument(probe, &self.reference_code)
            .await
        {
            // Exact-date match required: a bar dated differently is the
            // gateway substituting the nearest session.
            Ok(Some(bar)) => bar.date == probe,
            Ok(None) => false,
            Err(e) => {
                tracing::debug!("calendar probe for {probe} failed: {e:#}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tema_core::DailyBar;

    /// Fake source backed by an explicit set of trading days. When
    /// `substitute_nearest` is set it mimics gateways that answer holiday
    /// probes with the previous session's bar.
    struct FakeSource {
        trading_days: BTreeSet<NaiveDate>,
        substitute_nearest: bool,
        probes: AtomicUsize,
    }

    impl FakeSource {
        fn new(days: &[NaiveDate]) -> Self {
            Self {
                trading_days: days.iter().copied().collect(),
                substitute_nearest: false,
                probes: AtomicUsize::new(0),
            }
        }

        fn bar_on(date: NaiveDate, code: &str) -> DailyBar {
            DailyBar {
                date,
                code: code.to_string(),
                open: dec!(100),
                high: dec!(101),
                low: dec!(99),
                close: dec!(100),
                volume: 10,
            }
        }
    }

    #[async_trait]
    impl DailyBarSource for FakeSource {
        async fn bars_for_day(&self, _date: NaiveDate) -> Result<Vec<DailyBar>> {
            Ok(Vec::new())
        }

        async fn bar_for_instrument(
            &self,
            date: NaiveDate,
            code: &str,
        ) -> Result<Option<DailyBar>> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if self.trading_days.contains(&date) {
                return Ok(Some(Self::bar_on(date, code)));
            }
            if self.substitute_nearest {
                if let Some(prev) = self.trading_days.range(..date).next_back() {
                    return Ok(Some(Self::bar_on(*prev, code)));
                }
            }
            Ok(None)
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn calendar(source: FakeSource) -> TradingCalendar {
        TradingCalendar::new(Arc::new(source), "005930")
    }

    #[tokio::test]
    async fn base_falls_back_to_previous_session_over_a_weekend() {
        // Fri 2025-08-01 and Mon 2025-08-04 trade; the weekend does not.
        let cal = calendar(FakeSource::new(&[d(2025, 8, 1), d(2025, 8, 4)]));
        assert_eq!(cal.base_trading_day(d(2025, 8, 3)).await, Some(d(2025, 8, 1)));
        assert_eq!(cal.base_trading_day(d(2025, 8, 4)).await, Some(d(2025, 8, 4)));
    }

    #[tokio::test]
    async fn next_is_strictly_after_the_input() {
        let cal = calendar(FakeSource::new(&[d(2025, 8, 1), d(2025, 8, 4)]));
        assert_eq!(cal.next_trading_day(d(2025, 8, 1)).await, Some(d(2025, 8, 4)));
        assert_eq!(cal.next_trading_day(d(2025, 8, 4)).await, None);
    }

    #[tokio::test]
    async fn resolved_pairs_never_include_non_trading_days() {
        let sessions = [d(2025, 7, 28), d(2025, 7, 30), d(2025, 8, 4)];
        let cal = calendar(FakeSource::new(&sessions));
        for probe in [d(2025, 7, 29), d(2025, 8, 1), d(2025, 8, 3)] {
            let window = cal.forward_window(probe).await;
            let (base, next) = window.ready().expect("window resolves");
            assert!(sessions.contains(&base));
            assert!(sessions.contains(&next));
            assert!(next > base);
        }
    }

    #[tokio::test]
    async fn nearest_day_substitution_is_rejected() {
        let mut source = FakeSource::new(&[d(2025, 8, 1)]);
        source.substitute_nearest = true;
        let cal = calendar(source);
        // The fake answers every later probe with the 08-01 bar; only the
        // exact match may be accepted.
        assert_eq!(cal.base_trading_day(d(2025, 8, 3)).await, Some(d(2025, 8, 1)));
        assert_eq!(cal.next_trading_day(d(2025, 8, 1)).await, None);
    }

    #[tokio::test]
    async fn window_exhaustion_returns_none() {
        let cal = calendar(FakeSource::new(&[]));
        assert_eq!(cal.base_trading_day(d(2025, 8, 4)).await, None);
        let window = cal.forward_window(d(2025, 8, 4)).await;
        assert!(window.base.is_none());
        assert!(window.warn.is_some());
    }

    #[tokio::test]
    async fn successful_resolutions_are_memoized() {
        let source = Arc::new(FakeSource::new(&[d(2025, 8, 1), d(2025, 8, 4)]));
        let shared: Arc<dyn DailyBarSource> = source.clone();
        let cal = TradingCalendar::new(shared, "005930");

        cal.base_trading_day(d(2025, 8, 3)).await;
        let probes_after_first = source.probes.load(Ordering::SeqCst);

        assert_eq!(cal.base_trading_day(d(2025, 8, 3)).await, Some(d(2025, 8, 1)));
        assert_eq!(source.probes.load(Ordering::SeqCst), probes_after_first);
    }
}
