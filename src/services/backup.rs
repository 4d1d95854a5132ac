use anyhow::Context;
use std::sync::Arc;
use tracing::{error, warn};

use crate::models::backup;
use crate::models::drive_file;
use crate::services::{reconcile, retention};
use crate::state::{AppState, RunMode};

/// Drive one full backup cycle: one backup record per configured data
/// source, fanned out to every configured drive.
///
/// One source failing never blocks the others; only failure to create a
/// backup record aborts the run.
pub async fn run_backup(state: &Arc<AppState>, mode: RunMode) -> anyhow::Result<Vec<String>> {
    let mut backup_ids = Vec::new();

    for dumper in &state.dumpers {
        let label = dumper.label().to_string();
        let record = state
            .with_db(move |conn| backup::create(conn, &label))
            .await
            .context("failed to create backup record")?;
        backup_ids.push(record.id.clone());

        let dump_path = match dumper.dump().await {
            Ok(path) => path,
            Err(e) => {
                error!(
                    backup_id = %record.id,
                    source = dumper.label(),
                    error = %e,
                    "dump failed"
                );
                let id = record.id.clone();
                if let Err(e) = state
                    .with_db(move |conn| backup::update_status(conn, &id, backup::STATUS_FAILED))
                    .await
                {
                    error!(backup_id = %record.id, error = %e, "failed to mark backup failed");
                }
                continue;
            }
        };

        {
            let id = record.id.clone();
            let path = dump_path.to_string_lossy().into_owned();
            if let Err(e) = state
                .with_db(move |conn| backup::update_dump_path(conn, &id, &path))
                .await
            {
                error!(backup_id = %record.id, error = %e, "failed to store dump path");
                continue;
            }
        }

        for drive in &state.drives {
            let file = {
                let id = record.id.clone();
                let provider = drive.provider().to_string();
                let label = drive.label().to_string();
                match state
                    .with_db(move |conn| drive_file::create(conn, &id, &provider, &label))
                    .await
                {
                    Ok(file) => file,
                    Err(e) => {
                        error!(
                            backup_id = %record.id,
                            drive = drive.label(),
                            error = %e,
                            "failed to create drive file record"
                        );
                        continue;
                    }
                }
            };

            match drive.upload(&dump_path).await {
                Ok(uploaded) => {
                    let id = file.id.clone();
                    let path = uploaded.path.clone();
                    if let Err(e) = state
                        .with_db(move |conn| drive_file::mark_finished(conn, &id, &path))
                        .await
                    {
                        error!(drive_file_id = %file.id, error = %e, "failed to mark upload finished");
                    }
                }
                Err(e) => {
                    warn!(
                        backup_id = %record.id,
                        drive = drive.label(),
                        error = %e,
                        "upload failed"
                    );
                    let id = file.id.clone();
                    if let Err(e) = state
                        .with_db(move |conn| {
                            drive_file::update_status(conn, &id, drive_file::STATUS_FAILED)
                        })
                        .await
                    {
                        error!(drive_file_id = %file.id, error = %e, "failed to mark upload failed");
                    }
                }
            }
        }

        if let Err(e) = after_backup(state, &record.id, mode).await {
            error!(backup_id = %record.id, error = %e, "post-backup processing failed");
        }
    }

    if state.config.retention.enabled {
        match mode {
            RunMode::Interactive => {
                if let Err(e) = retention::remove_old_backups(state).await {
                    error!(error = %e, "retention pass failed");
                }
            }
            RunMode::Server => {
                let state = Arc::clone(state);
                state.tasks.clone().spawn(async move {
                    if let Err(e) = retention::remove_old_backups(&state).await {
                        error!(error = %e, "retention pass failed");
                    }
                });
            }
        }
    }

    Ok(backup_ids)
}

/// Post-processing after a backup or retry touched uploads: reconcile the
/// backup status, clean up the local artifact once finished, and send the
/// report to every notifier. Cleanup and notification are best-effort and
/// detached in server mode.
pub async fn after_backup(
    state: &Arc<AppState>,
    backup_id: &str,
    mode: RunMode,
) -> anyhow::Result<()> {
    let snapshot = reconcile::reconcile(state, backup_id)
        .await
        .with_context(|| format!("failed to reconcile backup {backup_id}"))?;

    if snapshot.status == backup::STATUS_FINISHED {
        match mode {
            RunMode::Interactive => {
                if let Err(e) = retention::remove_dump_artifact(state, &snapshot).await {
                    warn!(backup_id = %snapshot.id, error = %e, "failed to remove dump artifact");
                }
            }
            RunMode::Server => {
                let state = Arc::clone(state);
                let snapshot = snapshot.clone();
                state.tasks.clone().spawn(async move {
                    if let Err(e) = retention::remove_dump_artifact(&state, &snapshot).await {
                        warn!(backup_id = %snapshot.id, error = %e, "failed to remove dump artifact");
                    }
                });
            }
        }
    }

    for notifier in &state.notifiers {
        match mode {
            RunMode::Interactive => {
                if let Err(e) = notifier.backup_report(backup_id).await {
                    warn!(
                        notifier = notifier.name(),
                        error = %e,
                        "backup report delivery failed"
                    );
                }
            }
            RunMode::Server => {
                let notifier = Arc::clone(notifier);
                let id = backup_id.to_string();
                state.tasks.spawn(async move {
                    if let Err(e) = notifier.backup_report(&id).await {
                        warn!(
                            notifier = notifier.name(),
                            error = %e,
                            "backup report delivery failed"
                        );
                    }
                });
            }
        }
    }

    Ok(())
}
