use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

use crate::dumpers::{dump_filename, Dumper};

pub struct SqliteDumper {
    label: String,
    tmp_folder: PathBuf,
    db_path: PathBuf,
}

impl SqliteDumper {
    pub fn new(label: String, tmp_folder: PathBuf, db_path: PathBuf) -> Self {
        Self {
            label,
            tmp_folder,
            db_path,
        }
    }
}

#[async_trait]
impl Dumper for SqliteDumper {
    async fn dump(&self) -> anyhow::Result<PathBuf> {
        let sqlite3 = which::which("sqlite3").context("sqlite3 not found in PATH")?;
        tokio::fs::create_dir_all(&self.tmp_folder).await?;
        let out = self.tmp_folder.join(dump_filename());

        let output = Command::new(sqlite3)
            .arg(&self.db_path)
            .arg(".dump")
            .output()
            .await
            .context("failed to spawn sqlite3")?;

        if !output.status.success() {
            anyhow::bail!(
                "sqlite3 exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        tokio::fs::write(&out, &output.stdout)
            .await
            .with_context(|| format!("failed to write dump to {}", out.display()))?;
        Ok(out)
    }

    fn label(&self) -> &str {
        &self.label
    }

    async fn health(&self) -> anyhow::Result<()> {
        let meta = tokio::fs::metadata(&self.db_path)
            .await
            .with_context(|| format!("database file {} not accessible", self.db_path.display()))?;
        if !meta.is_file() {
            anyhow::bail!("{} is not a file", self.db_path.display());
        }
        Ok(())
    }
}
