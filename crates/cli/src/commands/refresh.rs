use crate::bootstrap;
use anyhow::{Context, Result};
use tema_refresh::{CommandProducer, SnapshotProducer};

/// Runs one ingestion in the foreground, without the single-flight
/// coordinator; useful for cron jobs and first-time setup.
pub async fn run(profile: Option<&str>) -> Result<()> {
    let config = bootstrap::load_config(profile)?;
    let producer = CommandProducer::from_command(&config.refresh.command)
        .context("refresh.command must be configured to run an ingestion")?;

    let outcome = producer.produce(&config.data.root).await?;
    println!(
        "wrote {} theme files for {} to {} in {:.1}s",
        outcome.files, outcome.date_tag, outcome.out_dir, outcome.seconds
    );
    Ok(())
}
