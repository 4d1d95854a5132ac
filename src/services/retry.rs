use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, warn};

use crate::drives::UploadedFile;
use crate::models::backup;
use crate::models::drive_file::{self, DriveFile};
use crate::services::backup::after_backup;
use crate::state::{AppState, RunMode};

/// Re-attempt only the failed uploads of a failed backup.
///
/// Finished drive files are never touched again. The backup must still have
/// its dump artifact and must be in failed state; anything else is rejected
/// before any mutation.
pub async fn retry_backup(
    state: &Arc<AppState>,
    backup_id: &str,
    mode: RunMode,
) -> anyhow::Result<()> {
    if !state.try_claim_backup(backup_id).await {
        anyhow::bail!("backup {backup_id} already has an operation in flight");
    }
    let result = retry_inner(state, backup_id, mode).await;
    state.release_backup(backup_id).await;
    result
}

async fn retry_inner(state: &Arc<AppState>, backup_id: &str, mode: RunMode) -> anyhow::Result<()> {
    let full = {
        let id = backup_id.to_string();
        state
            .with_db(move |conn| backup::find_full_by_id(conn, &id))
            .await?
            .ok_or_else(|| anyhow::anyhow!("backup {backup_id} not found"))?
    };

    if full.dump_path.is_empty() {
        anyhow::bail!("backup {backup_id} has no dump artifact to retry");
    }
    if full.status != backup::STATUS_FAILED {
        anyhow::bail!(
            "backup {backup_id} is not in failed state (status is {})",
            full.status
        );
    }

    let dump_path = PathBuf::from(&full.dump_path);
    for file in full
        .drive_files
        .iter()
        .filter(|f| f.status == drive_file::STATUS_FAILED)
    {
        match upload(state, &dump_path, file).await {
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
                    backup_id = %backup_id,
                    drive_file_id = %file.id,
                    provider = %file.provider,
                    error = %e,
                    "retry upload failed"
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

    after_backup(state, backup_id, mode)
        .await
        .context("failed to run post-backup processing")?;
    Ok(())
}

async fn upload(
    state: &AppState,
    dump_path: &Path,
    file: &DriveFile,
) -> anyhow::Result<UploadedFile> {
    {
        let id = file.id.clone();
        state
            .with_db(move |conn| drive_file::update_status(conn, &id, drive_file::STATUS_PENDING))
            .await
            .with_context(|| format!("failed to mark drive file {} pending", file.id))?;
    }

    let drive = state
        .drive_by_provider(&file.provider)
        .ok_or_else(|| anyhow::anyhow!("no drive configured for provider {}", file.provider))?;

    drive.upload(dump_path).await
}
