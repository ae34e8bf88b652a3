use crate::bar::DailyBar;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// A queryable source of daily bars.
///
/// Implementations talk to a real price gateway; tests inject fakes. Both
/// calls are treated as unreliable: an error or an empty answer means "no
/// data for that probe", never a fatal condition for the caller.
#[async_trait]
pub trait DailyBarSource: Send + Sync {
    /// All-instrument bars for one session. An empty vec means the source
    /// had nothing for that day (or the bulk surface is unavailable).
    async fn bars_for_day(&self, date: NaiveDate) -> Result<Vec<DailyBar>>;

    /// A single instrument's bar for one session, `None` when absent.
    async fn bar_for_instrument(&self, date: NaiveDate, code: &str) -> Result<Option<DailyBar>>;
}
