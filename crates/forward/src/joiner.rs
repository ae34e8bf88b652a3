//! Forward-return joining over an unreliable price source.
//!
//! Primary path: one bulk all-instrument fetch per day, indexed by code.
//! Fallback path: per-instrument single-day fetches for exactly the
//! (day, code) pairs the bulk result could not serve, at bounded
//! concurrency. Both caches live for the process lifetime; the facts they
//! hold are historical and immutable.

use chrono::NaiveDate;
use futures_util::stream::{self, StreamExt};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tema_core::{normalize_code, DailyBarSource, ForwardReturn};
use tokio::sync::RwLock;

const FALLBACK_CONCURRENCY: usize = 8;

/// (close, high) of one instrument on one day.
type PricePoint = (Decimal, Decimal);

pub struct ForwardReturnJoiner {
    source: Arc<dyn DailyBarSource>,
    bulk_cache: RwLock<HashMap<NaiveDate, Arc<HashMap<String, PricePoint>>>>,
    single_cache: RwLock<HashMap<(NaiveDate, String), Option<PricePoint>>>,
}

impl ForwardReturnJoiner {
    pub fn new(source: Arc<dyn DailyBarSource>) -> Self {
        Self {
            source,
            bulk_cache: RwLock::new(HashMap::new()),
            single_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Forward returns for a set of instrument codes between `base` and
    /// `next`. Keys of the result are normalized codes; codes that cannot
    /// be resolved (no data, zero base close) are simply absent.
    pub async fn returns_for(
        &self,
        codes: &[String],
        base: NaiveDate,
        next: NaiveDate,
    ) -> HashMap<String, ForwardReturn> {
        let mut wanted: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for raw in codes {
            let code = normalize_code(raw);
            if !code.is_empty() && seen.insert(code.clone()) {
                wanted.push(code);
            }
        }
        if wanted.is_empty() {
            return HashMap::new();
        }

        let bulk_base = self.bulk_for_day(base).await;
        let bulk_next = self.bulk_for_day(next).await;

        let mut base_points: HashMap<String, PricePoint> = HashMap::new();
        let mut next_points: HashMap<String, PricePoint> = HashMap::new();
        let mut missing: Vec<(NaiveDate, String)> = Vec::new();
        for code in &wanted {
            match bulk_base.as_ref().and_then(|index| index.get(code)) {
                Some(point) => {
                    base_points.insert(code.clone(), *point);
                }
                None => missing.push((base, code.clone())),
            }
            match bulk_next.as_ref().and_then(|index| index.get(code)) {
                Some(point) => {
                    next_points.insert(code.clone(), *point);
                }
                None => missing.push((next, code.clone())),
            }
        }

        let fetched: Vec<(NaiveDate, String, Option<PricePoint>)> =
            stream::iter(missing.into_iter().map(|(day, code)| async move {
                let point = self.single_point(day, &code).await;
                (day, code, point)
            }))
            .buffer_unordered(FALLBACK_CONCURRENCY)
            .collect()
            .await;
        for (day, code, point) in fetched {
            let Some(point) = point else { continue };
            if day == base {
                base_points.insert(code, point);
            } else {
                next_points.insert(code, point);
            }
        }

        let mut out = HashMap::new();
        for code in wanted {
            let Some(&(base_close, _)) = base_points.get(&code) else {
                continue;
            };
            let Some(&(next_close, next_high)) = next_points.get(&code) else {
                continue;
            };
            if let Some(fwd) = ForwardReturn::compute(next, base_close, next_close, next_high) {
                out.insert(code, fwd);
            }
        }
        out
    }

    /// Forward return for a single instrument via the per-instrument path,
    /// used by the ledger backfill where a bulk fetch would be wasteful.
    pub async fn single_return(
        &self,
        code: &str,
        base: NaiveDate,
        next: NaiveDate,
    ) -> Option<ForwardReturn> {
        let code = normalize_code(code);
        if code.is_empty() {
            return None;
        }
        let (base_close, _) = self.single_point(base, &code).await?;
        let (next_close, next_high) = self.single_point(next, &code).await?;
        ForwardReturn::compute(next, base_close, next_close, next_high)
    }

    async fn bulk_for_day(&self, day: NaiveDate) -> Option<Arc<HashMap<String, PricePoint>>> {
        if let Some(hit) = self.bulk_cache.read().await.get(&day) {
            return Some(Arc::clone(hit));
        }
        match self.source.bars_for_day(day).await {
            Ok(bars) if !bars.is_empty() => {
                let index: HashMap<String, PricePoint> = bars
                    .into_iter()
                    .map(|bar| (bar.code, (bar.close, bar.high)))
                    .collect();
                let index = Arc::new(index);
                self.bulk_cache
                    .write()
                    .await
                    .insert(day, Arc::clone(&index));
                Some(index)
            }
            Ok(_) => {
                tracing::warn!("bulk daily bars empty for {day}; falling back per instrument");
                None
            }
            Err(e) => {
                tracing::warn!("bulk daily bars failed for {day}: {e:#}; falling back per instrument");
                None
            }
        }
    }

    async fn single_point(&self, day: NaiveDate, code: &str) -> Option<PricePoint> {
        let key = (day, code.to_string());
        if let Some(hit) = self.single_cache.read().await.get(&key) {
            return *hit;
        }
        let point = match self.source.bar_for_instrument(day, code).await {
            Ok(Some(bar)) if bar.date == day => Some((bar.close, bar.high)),
            Ok(_) => None,
            Err(e) => {
                // Transport failures are transient; only definite answers
                // are memoized.
                tracing::debug!("daily bar fetch failed for {day} {code}: {e:#}");
                return None;
            }
        };
        self.single_cache.write().await.insert(key, point);
        point
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tema_core::DailyBar;

    struct FakeSource {
        /// (date, code) -> (close, high); membership also drives the bulk
        /// answer for a day.
        points: HashMap<(NaiveDate, String), PricePoint>,
        bulk_days: HashSet<NaiveDate>,
        /// Codes the bulk surface drops even on bulk-enabled days.
        bulk_exclude: HashSet<String>,
        bulk_calls: AtomicUsize,
        single_calls: AtomicUsize,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                points: HashMap::new(),
                bulk_days: HashSet::new(),
                bulk_exclude: HashSet::new(),
                bulk_calls: AtomicUsize::new(0),
                single_calls: AtomicUsize::new(0),
            }
        }

        fn with_point(mut self, day: NaiveDate, code: &str, close: Decimal, high: Decimal) -> Self {
            self.points.insert((day, code.to_string()), (close, high));
            self
        }

        fn with_bulk_day(mut self, day: NaiveDate) -> Self {
            self.bulk_days.insert(day);
            self
        }

        fn with_bulk_excluded(mut self, code: &str) -> Self {
            self.bulk_exclude.insert(code.to_string());
            self
        }
    }

    #[async_trait]
    impl DailyBarSource for FakeSource {
        async fn bars_for_day(&self, date: NaiveDate) -> Result<Vec<DailyBar>> {
            self.bulk_calls.fetch_add(1, Ordering::SeqCst);
            if !self.bulk_days.contains(&date) {
                return Ok(Vec::new());
            }
            Ok(self
                .points
                .iter()
                .filter(|((day, code), _)| *day == date && !self.bulk_exclude.contains(code))
                .map(|((_, code), (close, high))| DailyBar {
                    date,
                    code: code.clone(),
                    open: *close,
                    high: *high,
                    low: *close,
                    close: *close,
                    volume: 1,
                })
                .collect())
        }

        async fn bar_for_instrument(
            &self,
            date: NaiveDate,
            code: &str,
        ) -> Result<Option<DailyBar>> {
            self.single_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .points
                .get(&(date, code.to_string()))
                .map(|(close, high)| DailyBar {
                    date,
                    code: code.to_string(),
                    open: *close,
                    high: *high,
                    low: *close,
                    close: *close,
                    volume: 1,
                }))
        }
    }

    fn base() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 6).unwrap()
    }

    fn next() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 7).unwrap()
    }

    #[tokio::test]
    async fn bulk_path_computes_both_rates() {
        let source = FakeSource::new()
            .with_point(base(), "005930", dec!(100), dec!(105))
            .with_point(next(), "005930", dec!(110), dec!(120))
            .with_bulk_day(base())
            .with_bulk_day(next());
        let source = Arc::new(source);
        let shared: Arc<dyn DailyBarSource> = source.clone();
        let joiner = ForwardReturnJoiner::new(shared);

        let returns = joiner
            .returns_for(&["005930".to_string()], base(), next())
            .await;
        let fwd = &returns["005930"];
        assert_eq!(fwd.close_rate_pct, dec!(10.00));
        assert_eq!(fwd.high_rate_pct, dec!(20.00));
        assert_eq!(fwd.next_trade_date, next());
        // Bulk served everything; no per-instrument calls happened.
        assert_eq!(source.single_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fallback_fires_only_for_codes_the_bulk_result_lacks() {
        // 035420 trades but the bulk snapshot drops it.
        let source = Arc::new(
            FakeSource::new()
                .with_point(base(), "005930", dec!(100), dec!(100))
                .with_point(next(), "005930", dec!(110), dec!(120))
                .with_point(base(), "035420", dec!(200), dec!(200))
                .with_point(next(), "035420", dec!(210), dec!(230))
                .with_bulk_day(base())
                .with_bulk_day(next())
                .with_bulk_excluded("035420"),
        );
        let shared: Arc<dyn DailyBarSource> = source.clone();
        let joiner = ForwardReturnJoiner::new(shared);

        let returns = joiner
            .returns_for(
                &["005930".to_string(), "035420".to_string()],
                base(),
                next(),
            )
            .await;
        assert_eq!(returns["005930"].close_rate_pct, dec!(10.00));
        assert_eq!(returns["035420"].close_rate_pct, dec!(5.00));
        assert_eq!(returns["035420"].high_rate_pct, dec!(15.00));
        // Only the dropped code's two days went through the fallback.
        assert_eq!(source.single_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_bulk_falls_back_per_instrument() {
        let source = Arc::new(
            FakeSource::new()
                .with_point(base(), "005930", dec!(100), dec!(100))
                .with_point(next(), "005930", dec!(110), dec!(120)),
        );
        let shared: Arc<dyn DailyBarSource> = source.clone();
        let joiner = ForwardReturnJoiner::new(shared);

        let returns = joiner
            .returns_for(&["005930".to_string()], base(), next())
            .await;
        assert_eq!(returns["005930"].close_rate_pct, dec!(10.00));
        assert_eq!(source.bulk_calls.load(Ordering::SeqCst), 2);
        assert_eq!(source.single_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_base_close_produces_no_return() {
        let source = Arc::new(
            FakeSource::new()
                .with_point(base(), "005930", dec!(0), dec!(0))
                .with_point(next(), "005930", dec!(110), dec!(120)),
        );
        let shared: Arc<dyn DailyBarSource> = source.clone();
        let joiner = ForwardReturnJoiner::new(shared);

        let returns = joiner
            .returns_for(&["005930".to_string()], base(), next())
            .await;
        assert!(returns.is_empty());
    }

    #[tokio::test]
    async fn fallback_results_are_memoized_per_day_and_code() {
        let source = Arc::new(
            FakeSource::new()
                .with_point(base(), "005930", dec!(100), dec!(100))
                .with_point(next(), "005930", dec!(110), dec!(120)),
        );
        let shared: Arc<dyn DailyBarSource> = source.clone();
        let joiner = ForwardReturnJoiner::new(shared);

        joiner.single_return("005930", base(), next()).await;
        let calls_after_first = source.single_calls.load(Ordering::SeqCst);
        joiner.single_return("005930", base(), next()).await;
        assert_eq!(source.single_calls.load(Ordering::SeqCst), calls_after_first);

        // Negative answers are memoized too.
        joiner.single_return("000001", base(), next()).await;
        let calls_after_miss = source.single_calls.load(Ordering::SeqCst);
        joiner.single_return("000001", base(), next()).await;
        assert_eq!(source.single_calls.load(Ordering::SeqCst), calls_after_miss);
    }

    #[tokio::test]
    async fn rows_without_resolvable_codes_are_ignored() {
        let source: Arc<dyn DailyBarSource> = Arc::new(FakeSource::new());
        let joiner = ForwardReturnJoiner::new(source);
        let returns = joiner
            .returns_for(&[String::new(), "??".to_string()], base(), next())
            .await;
        assert!(returns.is_empty());
    }
}
