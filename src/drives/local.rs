use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::drives::{remote_filename, Drive, UploadedFile};

pub const PROVIDER: &str = "local";

pub struct LocalDrive {
    label: String,
    folder: PathBuf,
}

impl LocalDrive {
    pub fn new(label: impl Into<String>, folder: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let folder = folder.into();
        std::fs::create_dir_all(&folder)
            .with_context(|| format!("failed to create drive folder {}", folder.display()))?;
        Ok(Self {
            label: label.into(),
            folder,
        })
    }
}

#[async_trait]
impl Drive for LocalDrive {
    async fn upload(&self, src: &Path) -> anyhow::Result<UploadedFile> {
        let dst = self.folder.join(remote_filename(src));
        tokio::fs::copy(src, &dst)
            .await
            .with_context(|| format!("failed to copy {} to {}", src.display(), dst.display()))?;
        Ok(UploadedFile {
            path: dst.to_string_lossy().into_owned(),
            checksum: None,
        })
    }

    async fn delete(&self, remote_path: &str) -> anyhow::Result<()> {
        match tokio::fs::remove_file(remote_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = remote_path, "file already gone");
                Ok(())
            }
            Err(e) => {
                Err(e).with_context(|| format!("failed to delete {remote_path}"))
            }
        }
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn health(&self) -> anyhow::Result<()> {
        let meta = tokio::fs::metadata(&self.folder)
            .await
            .with_context(|| format!("drive folder {} not accessible", self.folder.display()))?;
        if !meta.is_dir() {
            anyhow::bail!("{} is not a directory", self.folder.display());
        }
        Ok(())
    }
}
