use async_trait::async_trait;
use std::path::PathBuf;

use crate::dumpers::{dump_filename, Dumper};

/// Test double producing a real (tiny) artifact on disk, so downstream
/// upload and cleanup paths can be exercised end to end.
pub struct MockDumper {
    label: String,
    tmp_folder: PathBuf,
    fail: bool,
}

impl MockDumper {
    pub fn new(label: impl Into<String>, tmp_folder: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            tmp_folder: tmp_folder.into(),
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl Dumper for MockDumper {
    async fn dump(&self) -> anyhow::Result<PathBuf> {
        if self.fail {
            anyhow::bail!("mock dump failure for {}", self.label);
        }
        tokio::fs::create_dir_all(&self.tmp_folder).await?;
        let out = self.tmp_folder.join(dump_filename());
        tokio::fs::write(&out, b"-- mock dump\n").await?;
        Ok(out)
    }

    fn label(&self) -> &str {
        &self.label
    }

    async fn health(&self) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("mock data source unavailable");
        }
        Ok(())
    }
}
