use crate::models::backup::{self, Backup};
use crate::models::drive_file;
use crate::state::AppState;

/// Derive a backup's status from its drive files and persist it.
///
/// `finished` is terminal: an already-finished backup is returned unchanged
/// without touching the store. Otherwise: any pending drive file keeps the
/// backup pending, else any failed one fails it, else it is finished.
pub async fn reconcile(state: &AppState, backup_id: &str) -> anyhow::Result<Backup> {
    let full = {
        let id = backup_id.to_string();
        state
            .with_db(move |conn| backup::find_full_by_id(conn, &id))
            .await?
            .ok_or_else(|| anyhow::anyhow!("backup {backup_id} not found"))?
    };

    if full.status == backup::STATUS_FINISHED {
        return Ok(full.to_backup());
    }

    let mut pending = 0;
    let mut failed = 0;
    for file in &full.drive_files {
        match file.status.as_str() {
            drive_file::STATUS_PENDING => pending += 1,
            drive_file::STATUS_FAILED => failed += 1,
            drive_file::STATUS_FINISHED => {}
            other => anyhow::bail!(
                "unknown drive file status {other:?} for drive file {}",
                file.id
            ),
        }
    }

    let status = if pending > 0 {
        backup::STATUS_PENDING
    } else if failed > 0 {
        backup::STATUS_FAILED
    } else {
        backup::STATUS_FINISHED
    };

    {
        let id = backup_id.to_string();
        state
            .with_db(move |conn| backup::update_status(conn, &id, status))
            .await?;
    }

    let mut snapshot = full.to_backup();
    snapshot.status = status.to_string();
    Ok(snapshot)
}
