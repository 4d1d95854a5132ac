//! Storage providers ("drives"): persist a dump artifact to a remote
//! location and delete it again under retention.

pub mod local;
pub mod mock;
pub mod s3;

pub use local::LocalDrive;
pub use mock::MockDrive;
pub use s3::{S3Drive, S3Params};

use async_trait::async_trait;
use std::path::Path;

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Provider-specific remote location (filesystem path, object key, ...).
    pub path: String,
    pub checksum: Option<String>,
}

#[async_trait]
pub trait Drive: Send + Sync {
    async fn upload(&self, src: &Path) -> anyhow::Result<UploadedFile>;

    async fn delete(&self, remote_path: &str) -> anyhow::Result<()>;

    fn label(&self) -> &str;

    /// Stable identifier recorded on drive files and used to resolve the
    /// provider again for retries and retention.
    fn provider(&self) -> &str;

    async fn health(&self) -> anyhow::Result<()>;
}

/// Remote file name for an uploaded artifact: timestamped for humans,
/// suffixed with a uuid so two uploads in the same second cannot collide.
pub(crate) fn remote_filename(src: &Path) -> String {
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
    let id = uuid::Uuid::new_v4();
    match src.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stamp}-{id}.{ext}"),
        None => format!("{stamp}-{id}"),
    }
}
