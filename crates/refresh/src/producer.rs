//! The seam between the orchestrator and the ingestion collaborator.
//!
//! Scraping lives outside this repository; a [`SnapshotProducer`] only has
//! to regenerate the day's snapshot directory under the data root and say
//! what it wrote.

use crate::state::RefreshOutcome;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Instant;
use tema_core::dates;

#[async_trait]
pub trait SnapshotProducer: Send + Sync {
    /// Runs one full ingestion against the data root.
    async fn produce(&self, root: &Path) -> Result<RefreshOutcome>;
}

/// Runs the external ingestion command with the data root appended as its
/// final argument.
pub struct CommandProducer {
    program: String,
    args: Vec<String>,
}

impl CommandProducer {
    /// # Errors
    /// Fails when the configured command is empty.
    pub fn from_command(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .context("refresh.command is empty")?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl SnapshotProducer for CommandProducer {
    async fn produce(&self, root: &Path) -> Result<RefreshOutcome> {
        let started = Instant::now();
        let date_tag = dates::yymmdd(chrono::Local::now().date_naive());

        tracing::info!(
            "running ingestion command {} for snapshot day {date_tag}",
            self.program
        );
        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(root)
            .status()
            .await
            .with_context(|| format!("failed to launch ingestion command {}", self.program))?;
        if !status.success() {
            anyhow::bail!("ingestion command exited with {status}");
        }

        let out_dir = root.join(&date_tag);
        let files = std::fs::read_dir(&out_dir)
            .map(|entries| {
                entries
                    .filter_map(std::result::Result::ok)
                    .filter(|e| {
                        e.path()
                            .extension()
                            .and_then(|x| x.to_str())
                            .is_some_and(|x| x.eq_ignore_ascii_case("csv"))
                    })
                    .count()
            })
            .unwrap_or(0);

        Ok(RefreshOutcome {
            date_tag,
            out_dir: out_dir.display().to_string(),
            files,
            seconds: started.elapsed().as_secs_f64(),
        })
    }
}

/// Placeholder wired in when no ingestion command is configured; a
/// triggered run fails into `last_error` instead of panicking the server.
pub struct UnconfiguredProducer;

#[async_trait]
impl SnapshotProducer for UnconfiguredProducer {
    async fn produce(&self, _root: &Path) -> Result<RefreshOutcome> {
        anyhow::bail!("refresh.command is not configured")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_commands_are_rejected_at_construction() {
        assert!(CommandProducer::from_command(&[]).is_err());
        let producer =
            CommandProducer::from_command(&["python".to_string(), "crawl.py".to_string()])
                .unwrap();
        assert_eq!(producer.program, "python");
        assert_eq!(producer.args, vec!["crawl.py".to_string()]);
    }

    #[tokio::test]
    async fn unconfigured_producer_fails_cleanly() {
        let err = UnconfiguredProducer
            .produce(Path::new("/tmp"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }
}
