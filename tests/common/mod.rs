#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use backupman::config::{Config, DatabaseConfig, HttpConfig, NotifiersConfig, RetentionConfig};
use backupman::db::connection::create_pool;
use backupman::db::migrate::migrate;
use backupman::drives::Drive;
use backupman::dumpers::Dumper;
use backupman::models::backup::{self, BackupFull};
use backupman::models::{drive_file, fmt_ts};
use backupman::notifiers::Notifier;
use backupman::state::AppState;
use chrono::Utc;
use rusqlite::params;
use tempfile::TempDir;

/// Build an application over a fresh SQLite store in `dir`, wired to the
/// given test doubles.
pub fn test_state(
    dir: &TempDir,
    dumpers: Vec<Arc<dyn Dumper>>,
    drives: Vec<Arc<dyn Drive>>,
    notifiers: Vec<Arc<dyn Notifier>>,
    retention_days: Option<i64>,
) -> Arc<AppState> {
    let db_path = dir.path().join("backupman.db");
    let pool = create_pool(db_path.to_str().unwrap()).unwrap();
    migrate(&pool).unwrap();

    let config = Config {
        http: HttpConfig::default(),
        database: DatabaseConfig { path: db_path },
        data_sources: Vec::new(),
        drives: Vec::new(),
        notifiers: NotifiersConfig::default(),
        retention: RetentionConfig {
            enabled: retention_days.is_some(),
            days: retention_days.unwrap_or(30),
        },
    };

    Arc::new(AppState::new(pool, config, dumpers, drives, notifiers))
}

pub fn dump_dir(dir: &TempDir) -> PathBuf {
    dir.path().join("dumps")
}

pub fn read_full(state: &AppState, id: &str) -> BackupFull {
    let conn = state.db.get().unwrap();
    backup::find_full_by_id(&conn, id).unwrap().unwrap()
}

pub fn read_full_maybe(state: &AppState, id: &str) -> Option<BackupFull> {
    let conn = state.db.get().unwrap();
    backup::find_full_by_id(&conn, id).unwrap()
}

/// Move a backup's creation time `days` days into the past.
pub fn backdate_backup(state: &AppState, id: &str, days: i64) {
    let conn = state.db.get().unwrap();
    let ts = fmt_ts(Utc::now() - chrono::Duration::days(days));
    conn.execute(
        "UPDATE backups SET created_at = ?1 WHERE id = ?2",
        params![ts, id],
    )
    .unwrap();
}

pub fn set_drive_file_status(state: &AppState, id: &str, status: &str) {
    let conn = state.db.get().unwrap();
    drive_file::update_status(&conn, id, status).unwrap();
}

pub fn set_drive_file_provider(state: &AppState, id: &str, provider: &str) {
    let conn = state.db.get().unwrap();
    conn.execute(
        "UPDATE drive_files SET provider = ?1 WHERE id = ?2",
        params![provider, id],
    )
    .unwrap();
}
