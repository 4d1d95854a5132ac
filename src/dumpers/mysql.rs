use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

use crate::dumpers::{dump_filename, Dumper};

pub struct MysqlDumper {
    label: String,
    tmp_folder: PathBuf,
    host: String,
    port: u16,
    user: String,
    password: String,
    database: String,
}

impl MysqlDumper {
    pub fn new(
        label: String,
        tmp_folder: PathBuf,
        host: String,
        port: u16,
        user: String,
        password: String,
        database: String,
    ) -> Self {
        Self {
            label,
            tmp_folder,
            host,
            port,
            user,
            password,
            database,
        }
    }
}

#[async_trait]
impl Dumper for MysqlDumper {
    async fn dump(&self) -> anyhow::Result<PathBuf> {
        let mysqldump = which::which("mysqldump").context("mysqldump not found in PATH")?;
        tokio::fs::create_dir_all(&self.tmp_folder).await?;
        let out = self.tmp_folder.join(dump_filename());

        let output = Command::new(mysqldump)
            .arg(format!("--host={}", self.host))
            .arg(format!("--port={}", self.port))
            .arg(format!("--user={}", self.user))
            .arg(format!("--password={}", self.password))
            .arg("--single-transaction")
            .arg(format!("--result-file={}", out.display()))
            .arg(&self.database)
            .output()
            .await
            .context("failed to spawn mysqldump")?;

        if !output.status.success() {
            let _ = tokio::fs::remove_file(&out).await;
            anyhow::bail!(
                "mysqldump exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(out)
    }

    fn label(&self) -> &str {
        &self.label
    }

    async fn health(&self) -> anyhow::Result<()> {
        let mysqladmin = which::which("mysqladmin").context("mysqladmin not found in PATH")?;
        let output = Command::new(mysqladmin)
            .arg(format!("--host={}", self.host))
            .arg(format!("--port={}", self.port))
            .arg(format!("--user={}", self.user))
            .arg(format!("--password={}", self.password))
            .arg("ping")
            .output()
            .await
            .context("failed to spawn mysqladmin")?;
        if !output.status.success() {
            anyhow::bail!(
                "mysql server unreachable: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}
