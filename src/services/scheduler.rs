use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::services::backup::run_backup;
use crate::state::{AppState, RunMode};

/// Periodic trigger for the backup pipeline in server mode.
pub struct BackupScheduler {
    scheduler: Mutex<JobScheduler>,
    state: Arc<AppState>,
}

impl BackupScheduler {
    pub async fn new(state: Arc<AppState>) -> anyhow::Result<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            state,
        })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        let job_config = &self.state.config.http.backup_job;
        if !job_config.enabled || job_config.cron.is_empty() {
            info!("scheduled backups disabled");
            return Ok(());
        }

        let state = self.state.clone();
        let job = Job::new_async(job_config.cron.as_str(), move |_uuid, _lock| {
            let state = state.clone();
            Box::pin(async move {
                info!("running scheduled backup");
                match run_backup(&state, RunMode::Server).await {
                    Ok(ids) => info!(count = ids.len(), "scheduled backup finished dispatching"),
                    Err(e) => error!(error = %e, "scheduled backup failed"),
                }
            })
        })?;

        self.scheduler.lock().await.add(job).await?;
        info!(cron = %job_config.cron, "backup job scheduled");
        Ok(())
    }

    pub async fn start(&self) -> anyhow::Result<()> {
        self.scheduler.lock().await.start().await?;
        Ok(())
    }

    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.scheduler.lock().await.shutdown().await?;
        Ok(())
    }
}
