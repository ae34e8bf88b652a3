//! Service wiring shared by every subcommand.

use anyhow::Result;
use std::sync::Arc;
use tema_core::{AppConfig, ConfigLoader, DailyBarSource};
use tema_forward::{ForwardReturnJoiner, TradingCalendar};
use tema_krx::KrxClient;
use tema_ledger::RecordLedger;
use tema_refresh::{CommandProducer, RefreshCoordinator, SnapshotProducer, UnconfiguredProducer};
use tema_snapshots::SnapshotStore;
use tema_web_api::AppState;

pub fn load_config(profile: Option<&str>) -> Result<AppConfig> {
    match profile {
        Some(profile) => ConfigLoader::load_with_profile(profile),
        None => ConfigLoader::load(),
    }
}

/// Builds the full service graph from a loaded configuration.
///
/// # Errors
/// Fails when the HTTP client cannot be built or the configured ingestion
/// command is malformed.
pub fn build_state(config: AppConfig) -> Result<AppState> {
    let source: Arc<dyn DailyBarSource> = Arc::new(KrxClient::new(
        config.market.api_url.clone(),
        config.market.markets.clone(),
        config.market.timeout_secs,
    )?);

    let producer: Arc<dyn SnapshotProducer> = if config.refresh.command.is_empty() {
        Arc::new(UnconfiguredProducer)
    } else {
        Arc::new(CommandProducer::from_command(&config.refresh.command)?)
    };

    let root = config.data.root.clone();
    Ok(AppState {
        calendar: Arc::new(TradingCalendar::new(
            Arc::clone(&source),
            config.market.reference_code.clone(),
        )),
        joiner: Arc::new(ForwardReturnJoiner::new(source)),
        ledger: Arc::new(RecordLedger::new(config.data.record_path())),
        refresh: RefreshCoordinator::new(producer, root.clone()),
        store: Arc::new(SnapshotStore::new(root)),
        config: Arc::new(config),
    })
}
