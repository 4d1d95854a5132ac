use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::drives::{Drive, UploadedFile};

/// Test double recording every upload/delete call. Upload failure can be
/// toggled at runtime so retry paths can flip a drive from broken to healthy.
pub struct MockDrive {
    label: String,
    provider: String,
    fail_uploads: AtomicBool,
    fail_health: bool,
    uploads: Mutex<Vec<String>>,
    deletes: Mutex<Vec<String>>,
}

impl MockDrive {
    pub fn new(label: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            provider: provider.into(),
            fail_uploads: AtomicBool::new(false),
            fail_health: false,
            uploads: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_uploads(self) -> Self {
        self.fail_uploads.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_health(mut self) -> Self {
        self.fail_health = true;
        self
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Sources of every upload attempt, including failed ones.
    pub fn upload_attempts(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn deleted_paths(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Drive for MockDrive {
    async fn upload(&self, src: &Path) -> anyhow::Result<UploadedFile> {
        self.uploads
            .lock()
            .unwrap()
            .push(src.to_string_lossy().into_owned());
        if self.fail_uploads.load(Ordering::SeqCst) {
            anyhow::bail!("mock upload failure on {}", self.provider);
        }
        Ok(UploadedFile {
            path: format!("mock://{}/{}", self.provider, uuid::Uuid::new_v4()),
            checksum: None,
        })
    }

    async fn delete(&self, remote_path: &str) -> anyhow::Result<()> {
        self.deletes.lock().unwrap().push(remote_path.to_string());
        Ok(())
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn provider(&self) -> &str {
        &self.provider
    }

    async fn health(&self) -> anyhow::Result<()> {
        if self.fail_health {
            anyhow::bail!("mock drive unhealthy");
        }
        Ok(())
    }
}
