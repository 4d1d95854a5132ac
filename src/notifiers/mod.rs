//! Notification channels for backup reports. Delivery is best-effort: the
//! pipeline logs failures and never treats them as its own.

pub mod mail;
pub mod mock;
pub mod webhook;

pub use mail::MailNotifier;
pub use mock::MockNotifier;
pub use webhook::WebhookNotifier;

use async_trait::async_trait;

use crate::db::connection::DbPool;
use crate::models::backup::{self, BackupFull};

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a report for the given backup through this channel.
    async fn backup_report(&self, backup_id: &str) -> anyhow::Result<()>;

    fn name(&self) -> &str;

    async fn health(&self) -> anyhow::Result<()>;
}

/// Notifiers hold the pool and read the full backup themselves, so a report
/// always reflects the persisted state at delivery time.
pub(crate) async fn read_backup_full(db: &DbPool, backup_id: &str) -> anyhow::Result<BackupFull> {
    let pool = db.clone();
    let id = backup_id.to_string();
    let found = tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;
        backup::find_full_by_id(&conn, &id)
    })
    .await
    .map_err(|e| anyhow::anyhow!(e))??;
    found.ok_or_else(|| anyhow::anyhow!("backup {backup_id} not found"))
}
