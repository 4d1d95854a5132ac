use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};

use crate::models::backup::{self, Backup};
use crate::models::drive_file;
use crate::state::AppState;

/// Delete the local dump artifact of a finished backup and clear its
/// recorded path. An already-missing file only logs; the path is cleared
/// either way.
pub async fn remove_dump_artifact(state: &AppState, backup: &Backup) -> anyhow::Result<()> {
    if backup.dump_path.is_empty() {
        return Ok(());
    }

    match tokio::fs::remove_file(&backup.dump_path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(backup_id = %backup.id, path = %backup.dump_path, "dump artifact already missing");
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("cannot delete dump artifact {}", backup.dump_path));
        }
    }

    let id = backup.id.clone();
    state
        .with_db(move |conn| backup::update_dump_path(conn, &id, ""))
        .await?;
    Ok(())
}

/// Delete every backup older than the retention window: remote objects
/// first, then drive-file rows, then the backup row.
///
/// The pass is not transactional: an unresolvable provider or a failing
/// remote delete aborts the whole pass, leaving earlier deletions in place.
pub async fn remove_old_backups(state: &AppState) -> anyhow::Result<()> {
    let cutoff = Utc::now() - chrono::Duration::days(state.config.retention.days);
    let expired = state
        .with_db(move |conn| backup::find_full_older_than(conn, cutoff))
        .await
        .context("failed to read expired backups")?;

    for old in expired {
        if state.is_claimed(&old.id).await {
            info!(backup_id = %old.id, "skipping expired backup with operation in flight");
            continue;
        }

        for file in &old.drive_files {
            let drive = state.drive_by_provider(&file.provider).ok_or_else(|| {
                anyhow::anyhow!("no drive configured for provider {}", file.provider)
            })?;

            // A failed upload has no remote object; only the row goes.
            if !file.path.is_empty() {
                drive
                    .delete(&file.path)
                    .await
                    .with_context(|| format!("failed to delete remote object {}", file.path))?;
            }

            let id = file.id.clone();
            state
                .with_db(move |conn| drive_file::delete(conn, &id))
                .await
                .with_context(|| format!("failed to delete drive file {}", file.id))?;
        }

        let id = old.id.clone();
        state
            .with_db(move |conn| backup::delete(conn, &id))
            .await
            .with_context(|| format!("failed to delete backup {}", old.id))?;
        info!(backup_id = %old.id, label = %old.label, "expired backup removed");
    }

    Ok(())
}
