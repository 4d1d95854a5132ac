use anyhow::Context;
use chrono::DateTime;

use crate::drives::local;
use crate::models::backup;
use crate::models::drive_file::{self, DriveFile};
use crate::state::AppState;

pub struct DownloadOutput {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Resolve a backup's local-drive upload into a download URL under the
/// configured app URL. Returns Ok(None) when the backup does not exist.
pub async fn generate_download_url(
    state: &AppState,
    backup_id: &str,
) -> anyhow::Result<Option<String>> {
    let full = {
        let id = backup_id.to_string();
        state
            .with_db(move |conn| backup::find_full_by_id(conn, &id))
            .await?
    };
    let Some(full) = full else {
        return Ok(None);
    };

    let file = full
        .drive_files
        .iter()
        .find(|f| f.provider == local::PROVIDER)
        .ok_or_else(|| anyhow::anyhow!("no local drive file for backup {backup_id}"))?;

    Ok(Some(format!(
        "{}/api/backups/{}/download",
        state.config.http.app_url.trim_end_matches('/'),
        file.id
    )))
}

/// Read the artifact behind a local drive file. Returns Ok(None) when no
/// such drive file exists.
pub async fn download(
    state: &AppState,
    drive_file_id: &str,
) -> anyhow::Result<Option<DownloadOutput>> {
    let file = {
        let id = drive_file_id.to_string();
        state
            .with_db(move |conn| drive_file::find_by_id(conn, &id))
            .await?
    };
    let Some(file) = file else {
        return Ok(None);
    };

    if file.status != drive_file::STATUS_FINISHED {
        anyhow::bail!("drive file {drive_file_id} is not finished");
    }
    if file.provider != local::PROVIDER {
        anyhow::bail!(
            "downloads are only supported for the local drive (drive file {drive_file_id} is on {})",
            file.provider
        );
    }

    let bytes = tokio::fs::read(&file.path)
        .await
        .with_context(|| format!("failed to read {}", file.path))?;

    Ok(Some(DownloadOutput {
        filename: attachment_filename(&file),
        bytes,
        mime_type: "application/octet-stream".to_string(),
    }))
}

fn attachment_filename(file: &DriveFile) -> String {
    let stamp = DateTime::parse_from_rfc3339(&file.created_at)
        .map(|t| t.format("%Y-%m-%d_%H-%M-%S").to_string())
        .unwrap_or_else(|_| file.created_at.clone());
    format!("{}-{}.sql", file.label, stamp)
}
