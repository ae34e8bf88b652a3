use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tema_core::{dates, normalize_code};
use tema_forward::ForwardWindow;
use tema_ledger::{
    backfill_forward_fields, LedgerError, LedgerRecord, SortOrder, LEDGER_COLUMNS,
};
use tema_refresh::{RefreshError, RefreshState};
use tema_snapshots::insights;
use tema_snapshots::rank::load_theme_rows;
use tema_snapshots::{rank_themes, InstrumentRow, PreviewSort};

/// Out-of-range numeric parameters are clamped to documented bounds, never
/// rejected.
fn clamp(value: i64, lo: i64, hi: i64) -> usize {
    usize::try_from(value.clamp(lo, hi)).unwrap_or(0)
}

fn sort_label(sort: PreviewSort) -> &'static str {
    match sort {
        PreviewSort::ChangeRate => "change_rate",
        PreviewSort::TradeValue => "trade_value",
        PreviewSort::Volume => "volume",
    }
}

fn ledger_status(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
        LedgerError::MissingIdColumn => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// The forward-return context echoed alongside theme rows.
#[derive(Serialize)]
pub struct ForwardBlock {
    pub ok: bool,
    pub warn: Option<String>,
    pub base_trade_date: Option<String>,
    pub next_trade_date: Option<String>,
}

impl From<&ForwardWindow> for ForwardBlock {
    fn from(window: &ForwardWindow) -> Self {
        Self {
            ok: window.base.is_some(),
            warn: window.warn.clone(),
            base_trade_date: window.base.map(dates::yymmdd),
            next_trade_date: window.next.map(dates::yymmdd),
        }
    }
}

/// Resolves the requested snapshot day and its forward window. Forward
/// enrichment only applies to explicitly requested dates: the implicit
/// latest day has no published next session yet.
async fn resolve_window(
    state: &AppState,
    date_param: Option<&str>,
) -> Result<(String, ForwardWindow), StatusCode> {
    match date_param {
        Some(raw) => {
            if !dates::is_date_dir(raw) {
                return Err(StatusCode::BAD_REQUEST);
            }
            let day = dates::parse_compact(raw).ok_or(StatusCode::BAD_REQUEST)?;
            Ok((raw.to_string(), state.calendar.forward_window(day).await))
        }
        None => {
            let latest = state.store.latest_date().ok_or(StatusCode::NOT_FOUND)?;
            Ok((latest, ForwardWindow::unavailable()))
        }
    }
}

async fn enrich_rows(state: &AppState, window: &ForwardWindow, rows: &mut [InstrumentRow]) {
    let Some((base, next)) = window.ready() else {
        return;
    };
    let codes: Vec<String> = rows.iter().map(|r| r.code.clone()).collect();
    let returns = state.joiner.returns_for(&codes, base, next).await;
    for row in rows.iter_mut() {
        let code = normalize_code(&row.code);
        if let Some(fwd) = returns.get(&code) {
            row.forward = Some(fwd.clone());
        }
    }
}

// ---- status ------------------------------------------------------------

#[derive(Serialize)]
pub struct StatusResponse {
    pub data_root: String,
    pub dates: Vec<String>,
    pub latest: Option<String>,
    pub refresh_enabled: bool,
    pub refresh: RefreshState,
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let dates = state.store.list_dates();
    let latest = dates.last().cloned();
    Json(StatusResponse {
        data_root: state.store.root().display().to_string(),
        dates,
        latest,
        refresh_enabled: state.config.refresh.enabled,
        refresh: state.refresh.status(),
    })
}

// ---- themes ------------------------------------------------------------

#[derive(Deserialize)]
pub struct ThemesQuery {
    pub limit: Option<i64>,
    pub preview: Option<i64>,
    pub date: Option<String>,
    #[serde(default)]
    pub exclude_dominant: bool,
    pub sort: Option<String>,
}

#[derive(Serialize)]
pub struct ThemeView {
    pub rank: usize,
    pub title: String,
    pub trade_sum: i64,
    pub filename: String,
    pub preview: Vec<InstrumentRow>,
}

#[derive(Serialize)]
pub struct ThemesResponse {
    pub date: String,
    pub exclude_dominant: bool,
    pub sort: String,
    pub forward: ForwardBlock,
    pub themes: Vec<ThemeView>,
}

/// Lists the top themes of a snapshot day with enriched preview rows.
///
/// # Errors
/// `400` for a malformed date, `404` when no snapshot days exist.
pub async fn list_themes(
    State(state): State<AppState>,
    Query(q): Query<ThemesQuery>,
) -> Result<Json<ThemesResponse>, StatusCode> {
    let (date_dir, window) = resolve_window(&state, q.date.as_deref()).await?;
    let limit = clamp(
        q.limit
            .unwrap_or_else(|| state.config.ranking.theme_limit as i64),
        0,
        50,
    );
    let preview = clamp(
        q.preview
            .unwrap_or_else(|| state.config.ranking.preview_limit as i64),
        0,
        100,
    );
    let sort = PreviewSort::parse(q.sort.as_deref().unwrap_or_default());
    let deny = &state.config.ranking.deny;

    let mut ranked = rank_themes(&state.store, &date_dir, deny, q.exclude_dominant);
    ranked.truncate(limit);

    let mut themes = Vec::with_capacity(ranked.len());
    for theme in ranked {
        let rows = match load_theme_rows(
            &state.store,
            &date_dir,
            &theme.filename,
            deny,
            q.exclude_dominant,
            sort,
        ) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("skipping theme {}: {e:#}", theme.filename);
                continue;
            }
        };
        let mut preview_rows: Vec<InstrumentRow> = rows.into_iter().take(preview).collect();
        enrich_rows(&state, &window, &mut preview_rows).await;
        themes.push(ThemeView {
            rank: theme.rank,
            title: theme.title,
            trade_sum: theme.trade_sum,
            filename: theme.filename,
            preview: preview_rows,
        });
    }

    Ok(Json(ThemesResponse {
        date: date_dir,
        exclude_dominant: q.exclude_dominant,
        sort: sort_label(sort).to_string(),
        forward: ForwardBlock::from(&window),
        themes,
    }))
}

#[derive(Deserialize)]
pub struct ThemeDetailQuery {
    pub date: Option<String>,
    #[serde(default)]
    pub exclude_dominant: bool,
    pub sort: Option<String>,
}

#[derive(Serialize)]
pub struct ThemeDetailResponse {
    pub date: String,
    pub exclude_dominant: bool,
    pub sort: String,
    pub forward: ForwardBlock,
    pub rank: usize,
    pub title: String,
    pub trade_sum: i64,
    pub filename: String,
    pub rows: Vec<InstrumentRow>,
}

/// Full row list for the theme at a given rank.
///
/// # Errors
/// `404` when the rank is out of range for that day.
pub async fn theme_detail(
    State(state): State<AppState>,
    Path(rank): Path<usize>,
    Query(q): Query<ThemeDetailQuery>,
) -> Result<Json<ThemeDetailResponse>, StatusCode> {
    let (date_dir, window) = resolve_window(&state, q.date.as_deref()).await?;
    let sort = PreviewSort::parse(q.sort.as_deref().unwrap_or_default());
    let deny = &state.config.ranking.deny;

    let ranked = rank_themes(&state.store, &date_dir, deny, q.exclude_dominant);
    if rank < 1 || rank > ranked.len() {
        return Err(StatusCode::NOT_FOUND);
    }
    let target = &ranked[rank - 1];

    let mut rows = load_theme_rows(
        &state.store,
        &date_dir,
        &target.filename,
        deny,
        q.exclude_dominant,
        sort,
    )
    .map_err(|e| {
        tracing::error!("failed to load theme {}: {e:#}", target.filename);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    enrich_rows(&state, &window, &mut rows).await;

    Ok(Json(ThemeDetailResponse {
        date: date_dir,
        exclude_dominant: q.exclude_dominant,
        sort: sort_label(sort).to_string(),
        forward: ForwardBlock::from(&window),
        rank,
        title: target.title.clone(),
        trade_sum: target.trade_sum,
        filename: target.filename.clone(),
        rows,
    }))
}

// ---- insights ----------------------------------------------------------

#[derive(Deserialize)]
pub struct InsightsQuery {
    pub lookback: Option<i64>,
    pub top_n: Option<i64>,
    #[serde(default)]
    pub exclude_dominant: bool,
}

#[derive(Serialize)]
pub struct InsightsSummaryResponse {
    pub lookback: usize,
    pub top_n: usize,
    pub exclude_dominant: bool,
    #[serde(flatten)]
    pub summary: insights::InsightsSummary,
}

pub async fn insights_summary(
    State(state): State<AppState>,
    Query(q): Query<InsightsQuery>,
) -> Json<InsightsSummaryResponse> {
    let lookback = clamp(q.lookback.unwrap_or(20), 5, 120);
    let top_n = clamp(q.top_n.unwrap_or(10), 3, 30);
    let summary = insights::summarize(
        &state.store,
        &state.config.ranking.deny,
        lookback,
        top_n,
        q.exclude_dominant,
    );
    Json(InsightsSummaryResponse {
        lookback,
        top_n,
        exclude_dominant: q.exclude_dominant,
        summary,
    })
}

#[derive(Deserialize)]
pub struct ThemeHistoryQuery {
    pub title: String,
    pub lookback: Option<i64>,
    #[serde(default)]
    pub exclude_dominant: bool,
}

#[derive(Serialize)]
pub struct ThemeHistoryResponse {
    pub title: String,
    pub lookback: usize,
    pub exclude_dominant: bool,
    pub count: usize,
    pub rows: Vec<insights::ThemeHistoryEntry>,
}

pub async fn insights_theme_history(
    State(state): State<AppState>,
    Query(q): Query<ThemeHistoryQuery>,
) -> Json<ThemeHistoryResponse> {
    let lookback = clamp(q.lookback.unwrap_or(60), 10, 240);
    let rows = insights::theme_history(
        &state.store,
        &state.config.ranking.deny,
        &q.title,
        lookback,
        q.exclude_dominant,
    );
    Json(ThemeHistoryResponse {
        title: q.title,
        lookback,
        exclude_dominant: q.exclude_dominant,
        count: rows.len(),
        rows,
    })
}

// ---- ledger ------------------------------------------------------------

#[derive(Deserialize)]
pub struct RecordsQuery {
    pub order: Option<String>,
    pub fix: Option<i64>,
}

#[derive(Serialize)]
pub struct RecordsResponse {
    pub ok: bool,
    pub columns: Vec<String>,
    pub count: usize,
    pub order: String,
    pub fixed: usize,
    pub records: Vec<LedgerRecord>,
}

/// Ledger contents, optionally running the forward-field backfill pass
/// first (`fix=1`).
///
/// # Errors
/// `500` when the ledger file exists but cannot be read.
pub async fn list_records(
    State(state): State<AppState>,
    Query(q): Query<RecordsQuery>,
) -> Result<Json<RecordsResponse>, StatusCode> {
    let order = SortOrder::parse(q.order.as_deref().unwrap_or("desc"));
    let fixed = if q.fix.unwrap_or(0) == 1 {
        state
            .ledger
            .fix_forward_fields(&state.calendar, &state.joiner)
            .await
            .map_err(|e| {
                tracing::error!("ledger backfill failed: {e}");
                ledger_status(&e)
            })?
    } else {
        0
    };
    let records = state.ledger.list(order).await.map_err(|e| {
        tracing::error!("ledger read failed: {e}");
        ledger_status(&e)
    })?;
    Ok(Json(RecordsResponse {
        ok: true,
        columns: LEDGER_COLUMNS.iter().map(|c| (*c).to_string()).collect(),
        count: records.len(),
        order: if order == SortOrder::Asc { "asc" } else { "desc" }.to_string(),
        fixed,
        records,
    }))
}

#[derive(Serialize)]
pub struct AppendResponse {
    pub ok: bool,
    pub record: LedgerRecord,
}

/// Appends one flagged record, self-healing its forward fields first.
///
/// # Errors
/// `400` when name/code are missing or the date is malformed.
pub async fn append_record(
    State(state): State<AppState>,
    Json(mut record): Json<LedgerRecord>,
) -> Result<Json<AppendResponse>, StatusCode> {
    if record.name.trim().is_empty() || record.code.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let date = record.date.trim();
    let date_ok = date.is_empty()
        || ((date.len() == 6 || date.len() == 8) && date.chars().all(|c| c.is_ascii_digit()));
    if !date_ok {
        return Err(StatusCode::BAD_REQUEST);
    }

    backfill_forward_fields(&mut record, &state.calendar, &state.joiner).await;
    let stored = state.ledger.append(record).await.map_err(|e| {
        tracing::error!("ledger append failed: {e}");
        ledger_status(&e)
    })?;
    Ok(Json(AppendResponse { ok: true, record: stored }))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub ok: bool,
    pub deleted: usize,
}

/// Deletes one record by identifier.
///
/// # Errors
/// `404` when no row matches.
pub async fn delete_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Result<Json<DeleteResponse>, StatusCode> {
    let deleted = state
        .ledger
        .delete(&record_id)
        .await
        .map_err(|e| ledger_status(&e))?;
    Ok(Json(DeleteResponse { ok: true, deleted }))
}

// ---- refresh -----------------------------------------------------------

#[derive(Serialize)]
pub struct RefreshTriggerResponse {
    pub ok: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub refresh_id: u64,
}

/// Starts a background re-ingestion run.
///
/// # Errors
/// `403` when refresh is disabled or the token does not match, `409` when
/// a run is already in flight.
pub async fn trigger_refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshTriggerResponse>, StatusCode> {
    if !state.config.refresh.enabled {
        return Err(StatusCode::FORBIDDEN);
    }
    let token = &state.config.refresh.token;
    if !token.is_empty() {
        let supplied = headers
            .get("x-refresh-token")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if supplied != token {
            return Err(StatusCode::FORBIDDEN);
        }
    }

    match state.refresh.trigger().await {
        Ok(snapshot) => Ok(Json(RefreshTriggerResponse {
            ok: true,
            started_at: snapshot.started_at,
            refresh_id: snapshot.refresh_id,
        })),
        Err(RefreshError::AlreadyRunning) => Err(StatusCode::CONFLICT),
    }
}

pub async fn refresh_status(State(state): State<AppState>) -> Json<RefreshState> {
    Json(state.refresh.status())
}
