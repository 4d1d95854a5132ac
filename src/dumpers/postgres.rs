use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

use crate::dumpers::{dump_filename, Dumper};

pub struct PostgresDumper {
    label: String,
    tmp_folder: PathBuf,
    host: String,
    port: u16,
    user: String,
    password: String,
    database: String,
}

impl PostgresDumper {
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
impl Dumper for PostgresDumper {
    async fn dump(&self) -> anyhow::Result<PathBuf> {
        let pg_dump = which::which("pg_dump").context("pg_dump not found in PATH")?;
        tokio::fs::create_dir_all(&self.tmp_folder).await?;
        let out = self.tmp_folder.join(dump_filename());

        let output = Command::new(pg_dump)
            .arg("--host")
            .arg(&self.host)
            .arg("--port")
            .arg(self.port.to_string())
            .arg("--username")
            .arg(&self.user)
            .arg("--no-password")
            .arg("-f")
            .arg(&out)
            .arg(&self.database)
            .env("PGPASSWORD", &self.password)
            .output()
            .await
            .context("failed to spawn pg_dump")?;

        if !output.status.success() {
            let _ = tokio::fs::remove_file(&out).await;
            anyhow::bail!(
                "pg_dump exited with {}: {}",
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
        let pg_isready = which::which("pg_isready").context("pg_isready not found in PATH")?;
        let output = Command::new(pg_isready)
            .arg("--host")
            .arg(&self.host)
            .arg("--port")
            .arg(self.port.to_string())
            .arg("--username")
            .arg(&self.user)
            .output()
            .await
            .context("failed to spawn pg_isready")?;
        if !output.status.success() {
            anyhow::bail!(
                "postgres server unreachable: {}",
                String::from_utf8_lossy(&output.stdout).trim()
            );
        }
        Ok(())
    }
}
