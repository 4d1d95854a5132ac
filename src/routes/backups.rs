use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::AppError;
use crate::models::backup::{self, BackupFull};
use crate::services::backup::run_backup;
use crate::services::download;
use crate::state::{AppState, RunMode};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_backups).post(start_backup))
        .route("/{id}/generate-download-url", get(generate_download_url))
        .route("/{id}/download", get(download_drive_file))
}

async fn list_backups(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BackupFull>>, AppError> {
    let backups = state.with_db(backup::find_all_full).await?;
    Ok(Json(backups))
}

/// Launch a pipeline run in the background; the request returns immediately.
async fn start_backup(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let runner = state.clone();
    state.tasks.spawn(async move {
        match run_backup(&runner, RunMode::Server).await {
            Ok(ids) => info!(count = ids.len(), "backup run finished dispatching"),
            Err(e) => error!(error = %e, "backup run failed"),
        }
    });
    Json(json!({ "message": "Backup started" }))
}

async fn generate_download_url(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    match download::generate_download_url(&state, &id).await? {
        Some(url) => Ok(Json(json!({ "url": url }))),
        None => Err(AppError::NotFound("Backup not found".into())),
    }
}

async fn download_drive_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    match download::download(&state, &id).await? {
        Some(output) => {
            let headers = [
                (header::CONTENT_TYPE, output.mime_type),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", output.filename),
                ),
            ];
            Ok((headers, output.bytes))
        }
        None => Err(AppError::NotFound("Drive file not found".into())),
    }
}
