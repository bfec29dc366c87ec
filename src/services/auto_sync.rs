use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::MigrationError;
use crate::services::credentials::TargetAuth;
use crate::services::jobs::executor::{JobExecutor, JobRequest};

const AUTO_SYNC_PREFIX: &str = "auto_sync_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AutoSyncStatus {
    pub enabled: bool,
    pub has_credentials: bool,
}

/// Periodically re-runs a full transfer with the stored credentials.
///
/// Each run only submits a job and returns, so a slow job can still be
/// running when the next tick submits another one.
pub struct AutoSyncController {
    executor: JobExecutor,
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AutoSyncController {
    pub fn new(executor: JobExecutor, interval: Duration) -> Self {
        Self {
            executor,
            interval,
            task: Mutex::new(None),
        }
    }

    /// Schedules periodic syncs. The first run happens one interval from
    /// now. Returns `false` when auto-sync was already enabled.
    pub async fn start(&self) -> Result<bool, MigrationError> {
        self.require_credentials().await?;

        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Ok(false);
        }

        let executor = self.executor.clone();
        let interval = self.interval;
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = run_once(&executor).await {
                    tracing::error!("Auto-sync run failed: {e}");
                }
            }
        }));

        tracing::info!("Auto-sync enabled, running every {:?}", self.interval);
        Ok(true)
    }

    /// Cancels the schedule. A job already submitted keeps running. Returns
    /// `false` when auto-sync was not enabled.
    pub fn stop(&self) -> bool {
        match self.task.lock().take() {
            Some(handle) => {
                handle.abort();
                tracing::info!("Auto-sync disabled");
                true
            }
            None => false,
        }
    }

    pub async fn status(&self) -> AutoSyncStatus {
        let enabled = self
            .task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished());
        AutoSyncStatus {
            enabled,
            has_credentials: self.executor.credentials().has_valid_credentials().await,
        }
    }

    /// Triggers one sync in the background, outside the schedule.
    pub async fn run_now(&self) -> Result<(), MigrationError> {
        self.require_credentials().await?;

        let executor = self.executor.clone();
        tokio::spawn(async move {
            if let Err(e) = run_once(&executor).await {
                tracing::error!("Manual auto-sync run failed: {e}");
            }
        });
        Ok(())
    }

    async fn require_credentials(&self) -> Result<(), MigrationError> {
        if self.executor.credentials().has_valid_credentials().await {
            Ok(())
        } else {
            Err(MigrationError::CredentialMissing(
                "auto-sync needs stored source and target credentials".into(),
            ))
        }
    }
}

/// One sync: a transfer-all job over the stored credentials. Returns the
/// submitted job id, or `None` when the stored credentials are not ready or
/// the source library is empty.
pub async fn run_once(executor: &JobExecutor) -> Result<Option<String>, MigrationError> {
    if !executor.credentials().has_valid_credentials().await {
        tracing::warn!("Auto-sync skipped, stored credentials are incomplete");
        return Ok(None);
    }

    let token = executor
        .credentials()
        .source_access_token()
        .await
        .ok_or_else(|| MigrationError::CredentialMissing("no valid source access token".into()))?;

    let request = JobRequest::TransferAll {
        source_token: Some(token),
        target: TargetAuth::default(),
        playlist_ids: vec![],
    };

    match executor.submit_job_prefixed(AUTO_SYNC_PREFIX, request).await {
        Ok(id) => {
            tracing::info!("Auto-sync started job {id}");
            Ok(Some(id))
        }
        Err(MigrationError::NothingToTransfer(_)) => {
            tracing::info!("Auto-sync found no source playlists");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
