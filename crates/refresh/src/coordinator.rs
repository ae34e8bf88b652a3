//! Single-flight refresh coordination.
//!
//! All state transitions happen under one mutex, so a reader never
//! observes a torn state; status reads go through a watch channel and
//! never block on the running job. Concurrent triggers collapse into the
//! in-flight run instead of queueing.

use crate::producer::SnapshotProducer;
use crate::state::RefreshState;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, Mutex};

#[derive(Debug, Error)]
pub enum RefreshError {
    /// A run is already in flight; the trigger was rejected, not queued.
    #[error("a refresh run is already in progress")]
    AlreadyRunning,
}

pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    status_tx: watch::Sender<RefreshState>,
    producer: Arc<dyn SnapshotProducer>,
    root: PathBuf,
}

impl RefreshCoordinator {
    pub fn new(producer: Arc<dyn SnapshotProducer>, root: PathBuf) -> Arc<Self> {
        let (status_tx, _) = watch::channel(RefreshState::default());
        Arc::new(Self {
            state: Mutex::new(RefreshState::default()),
            status_tx,
            producer,
            root,
        })
    }

    /// Starts a background ingestion run.
    ///
    /// # Errors
    /// [`RefreshError::AlreadyRunning`] when a run is in flight; the
    /// rejected trigger does not advance `refresh_id`.
    pub async fn trigger(self: &Arc<Self>) -> Result<RefreshState, RefreshError> {
        let snapshot = {
            let mut state = self.state.lock().await;
            if state.in_progress {
                return Err(RefreshError::AlreadyRunning);
            }
            state.in_progress = true;
            state.started_at = Some(Utc::now());
            state.ended_at = None;
            state.last_error = None;
            state.refresh_id += 1;
            state.clone()
        };
        self.status_tx.send_replace(snapshot.clone());
        tracing::info!("refresh run {} started", snapshot.refresh_id);

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run_job().await;
        });
        Ok(snapshot)
    }

    /// Lock-free best-effort status read; never blocks on a running job.
    #[must_use]
    pub fn status(&self) -> RefreshState {
        self.status_tx.borrow().clone()
    }

    /// Watch the state for changes (used to await run completion).
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RefreshState> {
        self.status_tx.subscribe()
    }

    async fn run_job(&self) {
        let result = self.producer.produce(&self.root).await;

        let mut state = self.state.lock().await;
        match result {
            Ok(outcome) => {
                tracing::info!(
                    "refresh run {} wrote {} files to {}",
                    state.refresh_id,
                    outcome.files,
                    outcome.out_dir
                );
                state.last_result = Some(outcome);
                state.last_error = None;
            }
            Err(e) => {
                tracing::error!("refresh run {} failed: {e:#}", state.refresh_id);
                state.last_error = Some(format!("{e:#}"));
            }
        }
        state.in_progress = false;
        state.ended_at = Some(Utc::now());
        self.status_tx.send_replace(state.clone());
    }
}
