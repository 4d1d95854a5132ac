use anyhow::Context;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;

use crate::config::{Config, DataSourceConfig, DriveConfig};
use crate::db::connection::{create_pool, DbPool};
use crate::db::migrate::migrate;
use crate::drives::{Drive, LocalDrive, S3Drive, S3Params};
use crate::dumpers::{Dumper, MysqlDumper, PostgresDumper, SqliteDumper};
use crate::notifiers::{MailNotifier, Notifier, WebhookNotifier};

/// How the caller is running the engine. Interactive callers await cleanup
/// and notification inline; the server detaches them onto the task tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Interactive,
    Server,
}

pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub dumpers: Vec<Arc<dyn Dumper>>,
    pub drives: Vec<Arc<dyn Drive>>,
    pub notifiers: Vec<Arc<dyn Notifier>>,

    /// Detached (fire-and-forget) work lands here so shutdown can drain it
    /// instead of letting it die silently with the process.
    pub tasks: TaskTracker,

    /// Backup ids with an operation in flight. Retry takes the id; retention
    /// skips taken ids. Two pipeline runs never share an id.
    running: Mutex<HashSet<String>>,
}

impl AppState {
    pub fn new(
        db: DbPool,
        config: Config,
        dumpers: Vec<Arc<dyn Dumper>>,
        drives: Vec<Arc<dyn Drive>>,
        notifiers: Vec<Arc<dyn Notifier>>,
    ) -> Self {
        Self {
            db,
            config,
            dumpers,
            drives,
            notifiers,
            tasks: TaskTracker::new(),
            running: Mutex::new(HashSet::new()),
        }
    }

    /// Build the full application from configuration: pool + schema, then one
    /// concrete provider per configured variant.
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        if let Some(parent) = config.database.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db_path = config.database.path.to_string_lossy().to_string();
        let db = create_pool(&db_path)?;
        migrate(&db)?;

        let mut dumpers: Vec<Arc<dyn Dumper>> = Vec::new();
        for source in &config.data_sources {
            dumpers.push(match source.clone() {
                DataSourceConfig::Mysql {
                    label,
                    tmp_folder,
                    host,
                    port,
                    user,
                    password,
                    db_name,
                } => Arc::new(MysqlDumper::new(
                    label, tmp_folder, host, port, user, password, db_name,
                )),
                DataSourceConfig::Postgres {
                    label,
                    tmp_folder,
                    host,
                    port,
                    user,
                    password,
                    db_name,
                } => Arc::new(PostgresDumper::new(
                    label, tmp_folder, host, port, user, password, db_name,
                )),
                DataSourceConfig::Sqlite {
                    label,
                    tmp_folder,
                    db_path,
                } => Arc::new(SqliteDumper::new(label, tmp_folder, db_path)),
            });
        }

        let mut drives: Vec<Arc<dyn Drive>> = Vec::new();
        for drive in &config.drives {
            drives.push(match drive.clone() {
                DriveConfig::Local { label, folder } => Arc::new(
                    LocalDrive::new(label.as_str(), folder)
                        .with_context(|| format!("failed to set up local drive {label}"))?,
                ),
                DriveConfig::S3 {
                    label,
                    bucket,
                    region,
                    access_key,
                    secret_key,
                    endpoint,
                    prefix,
                    force_path_style,
                } => Arc::new(
                    S3Drive::new(S3Params {
                        label,
                        bucket,
                        region,
                        access_key,
                        secret_key,
                        endpoint,
                        prefix,
                        force_path_style,
                    })
                    .await,
                ),
            });
        }

        let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();
        if config.notifiers.mail.enabled {
            notifiers.push(Arc::new(MailNotifier::new(
                db.clone(),
                &config.notifiers.mail,
            )?));
        }
        if !config.notifiers.webhooks.is_empty() {
            notifiers.push(Arc::new(WebhookNotifier::new(
                db.clone(),
                config.notifiers.webhooks.clone(),
            )?));
        }

        Ok(Self::new(db, config, dumpers, drives, notifiers))
    }

    /// Run a closure against a pooled connection on the blocking pool.
    pub async fn with_db<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&rusqlite::Connection) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get()?;
            f(&conn)
        })
        .await
        .map_err(|e| anyhow::anyhow!(e))?
    }

    pub fn drive_by_provider(&self, provider: &str) -> Option<Arc<dyn Drive>> {
        self.drives
            .iter()
            .find(|d| d.provider() == provider)
            .cloned()
    }

    pub async fn try_claim_backup(&self, id: &str) -> bool {
        self.running.lock().await.insert(id.to_string())
    }

    pub async fn release_backup(&self, id: &str) {
        self.running.lock().await.remove(id);
    }

    pub async fn is_claimed(&self, id: &str) -> bool {
        self.running.lock().await.contains(id)
    }
}
