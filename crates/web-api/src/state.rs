use std::sync::Arc;
use tema_core::AppConfig;
use tema_forward::{ForwardReturnJoiner, TradingCalendar};
use tema_ledger::RecordLedger;
use tema_refresh::RefreshCoordinator;
use tema_snapshots::SnapshotStore;

/// Shared service state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<SnapshotStore>,
    pub calendar: Arc<TradingCalendar>,
    pub joiner: Arc<ForwardReturnJoiner>,
    pub ledger: Arc<RecordLedger>,
    pub refresh: Arc<RefreshCoordinator>,
}
