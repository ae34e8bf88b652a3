use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use governor::{clock::DefaultClock, state::InMemoryState, Quota, RateLimiter};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tema_core::{dates, normalize_code, DailyBar, DailyBarSource};

/// HTTP client for the daily-bar gateway.
///
/// The gateway is reliable per-instrument but flaky in bulk under load, so
/// callers treat an empty bulk answer as "fall back per instrument" rather
/// than an error.
pub struct KrxClient {
    http_client: Client,
    base_url: String,
    markets: Vec<String>,
    rate_limiter: Arc<RateLimiter<governor::state::direct::NotKeyed, InMemoryState, DefaultClock>>,
}

/// Bar row as the gateway serializes it; dates arrive as compact strings.
#[derive(Debug, Deserialize)]
struct WireBar {
    date: String,
    code: String,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: i64,
}

impl KrxClient {
    /// Creates a client against the given gateway base URL.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: String, markets: Vec<String>, timeout_secs: u64) -> Result<Self> {
        // 1200 requests per minute = 20 per second
        let quota = Quota::per_second(NonZeroU32::new(20).expect("nonzero quota"));
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            base_url,
            markets,
            rate_limiter,
        })
    }

    async fn get_json(&self, endpoint: &str) -> Result<serde_json::Value> {
        self.rate_limiter.until_ready().await;
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self.http_client.get(&url).send().await?;
        let json = response.json().await?;
        Ok(json)
    }
}

/// Converts wire bars into domain bars, dropping rows whose date or code
/// does not parse and de-duplicating by normalized code, first wins.
fn into_daily_bars(wire: Vec<WireBar>) -> Vec<DailyBar> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(wire.len());
    for bar in wire {
        let Some(date) = dates::parse_compact(&bar.date) else {
            tracing::debug!("skipping bar with unparseable date: {}", bar.date);
            continue;
        };
        let code = normalize_code(&bar.code);
        if code.is_empty() || !seen.insert(code.clone()) {
            continue;
        }
        out.push(DailyBar {
            date,
            code,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        });
    }
    out
}

#[async_trait]
impl DailyBarSource for KrxClient {
    async fn bars_for_day(&self, date: NaiveDate) -> Result<Vec<DailyBar>> {
        let day = dates::yyyymmdd(date);
        let mut wire: Vec<WireBar> = Vec::new();
        // A market segment failing must not sink the others; an empty
        // total is the caller's signal to fall back per instrument.
        for market in &self.markets {
            let endpoint = format!("/ohlcv/daily/{day}?market={market}");
            match self.get_json(&endpoint).await {
                Ok(json) => match serde_json::from_value::<Vec<WireBar>>(json) {
                    Ok(bars) => wire.extend(bars),
                    Err(e) => {
                        tracing::warn!("unexpected bulk payload for {day} {market}: {e}");
                    }
                },
                Err(e) => {
                    tracing::warn!("bulk daily bars failed for {day} {market}: {e:#}");
                }
            }
        }
        Ok(into_daily_bars(wire))
    }

    async fn bar_for_instrument(&self, date: NaiveDate, code: &str) -> Result<Option<DailyBar>> {
        let day = dates::yyyymmdd(date);
        let endpoint = format!("/ohlcv/daily/{day}/{code}");
        let json = self
            .get_json(&endpoint)
            .await
            .with_context(|| format!("daily bar failed for {day} {code}"))?;
        if json.is_null() {
            return Ok(None);
        }
        let bar: WireBar =
            serde_json::from_value(json).context("unexpected daily-bar payload")?;
        Ok(into_daily_bars(vec![bar]).into_iter().next())
    }
}
