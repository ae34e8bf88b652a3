use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of the refresh state machine: `Idle -> Running -> Idle`, with
/// `last_error` set on abnormal exit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshState {
    pub in_progress: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub last_result: Option<RefreshOutcome>,
    pub last_error: Option<String>,
    /// Monotonically increasing run identifier; a rejected trigger never
    /// advances it.
    pub refresh_id: u64,
}

/// What a completed ingestion run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshOutcome {
    /// Snapshot-day directory the run wrote (`yymmdd`).
    pub date_tag: String,
    /// Directory the files landed in.
    pub out_dir: String,
    /// Theme CSV files written.
    pub files: usize,
    /// Wall-clock duration of the run.
    pub seconds: f64,
}
