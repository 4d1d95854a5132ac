//! Configuration loaded from a TOML file.
//!
//! Provider sets (data sources, drives) are closed enums tagged by the
//! `provider` key; construction of the matching implementation happens once in
//! `AppState::from_config`, never by inspecting config at call sites.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub data_sources: Vec<DataSourceConfig>,
    #[serde(default)]
    pub drives: Vec<DriveConfig>,
    #[serde(default)]
    pub notifiers: NotifiersConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Public base URL used when generating download links.
    #[serde(default = "default_app_url")]
    pub app_url: String,

    /// Accepted values for the X-Api-Key header on /api routes.
    #[serde(default)]
    pub api_keys: Vec<String>,

    #[serde(default)]
    pub backup_job: BackupJobConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            app_url: default_app_url(),
            api_keys: Vec::new(),
            backup_job: BackupJobConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupJobConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Cron expression with seconds field, e.g. "0 0 3 * * *".
    #[serde(default)]
    pub cron: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the SQLite file holding backup and drive-file records.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum DataSourceConfig {
    Mysql {
        label: String,
        tmp_folder: PathBuf,
        host: String,
        #[serde(default = "default_mysql_port")]
        port: u16,
        user: String,
        password: String,
        db_name: String,
    },
    Postgres {
        label: String,
        tmp_folder: PathBuf,
        host: String,
        #[serde(default = "default_postgres_port")]
        port: u16,
        user: String,
        password: String,
        db_name: String,
    },
    Sqlite {
        label: String,
        tmp_folder: PathBuf,
        db_path: PathBuf,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum DriveConfig {
    Local {
        label: String,
        folder: PathBuf,
    },
    S3 {
        label: String,
        bucket: String,
        region: String,
        access_key: String,
        secret_key: String,
        /// Custom endpoint for S3-compatible services.
        #[serde(default)]
        endpoint: Option<String>,
        #[serde(default)]
        prefix: String,
        #[serde(default)]
        force_path_style: bool,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifiersConfig {
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub webhooks: Vec<WebhookEndpoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_user: String,
    #[serde(default)]
    pub smtp_password: String,
    /// One of "starttls", "tls" or "none".
    #[serde(default = "default_smtp_crypto")]
    pub smtp_crypto: String,
    /// Sender address; falls back to smtp_user when empty.
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub destinations: Vec<MailDestination>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            smtp_user: String::new(),
            smtp_password: String::new(),
            smtp_crypto: default_smtp_crypto(),
            from: String::new(),
            destinations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailDestination {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEndpoint {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_retention_days")]
    pub days: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            days: default_retention_days(),
        }
    }
}

fn default_app_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_crypto() -> String {
    "starttls".to_string()
}

fn default_retention_days() -> i64 {
    30
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.data_sources.is_empty() {
            anyhow::bail!("no data sources configured");
        }
        if self.drives.is_empty() {
            anyhow::bail!("no drives configured");
        }
        if self.retention.enabled && self.retention.days <= 0 {
            anyhow::bail!("retention.days must be positive when retention is enabled");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_CONFIG: &str = r#"
        [http]
        app_url = "https://backups.example.com"
        api_keys = ["secret-key"]

        [http.backup_job]
        enabled = true
        cron = "0 0 3 * * *"

        [database]
        path = "/var/lib/backupman/backupman.db"

        [[data_sources]]
        provider = "mysql"
        label = "orders"
        tmp_folder = "/tmp/backupman"
        host = "db.internal"
        user = "backup"
        password = "hunter2"
        db_name = "orders"

        [[data_sources]]
        provider = "postgres"
        label = "billing"
        tmp_folder = "/tmp/backupman"
        host = "pg.internal"
        port = 5433
        user = "backup"
        password = "hunter2"
        db_name = "billing"

        [[data_sources]]
        provider = "sqlite"
        label = "audit"
        tmp_folder = "/tmp/backupman"
        db_path = "/var/lib/audit/audit.db"

        [[drives]]
        provider = "local"
        label = "vault"
        folder = "/srv/backups"

        [[drives]]
        provider = "s3"
        label = "offsite"
        bucket = "acme-backups"
        region = "eu-west-1"
        access_key = "AK"
        secret_key = "SK"
        prefix = "db"

        [notifiers.mail]
        enabled = true
        smtp_host = "smtp.example.com"
        smtp_user = "alerts@example.com"
        smtp_password = "pw"

        [[notifiers.mail.destinations]]
        name = "Ops"
        email = "ops@example.com"

        [[notifiers.webhooks]]
        name = "statuspage"
        url = "https://hooks.example.com/backups"
        token = "tok"

        [retention]
        enabled = true
        days = 14
    "#;

    #[test]
    fn parses_full_config() {
        let config: Config = toml::from_str(FULL_CONFIG).unwrap();
        config.validate().unwrap();

        assert_eq!(config.http.api_keys, vec!["secret-key"]);
        assert!(config.http.backup_job.enabled);
        assert_eq!(config.data_sources.len(), 3);
        assert_eq!(config.drives.len(), 2);
        assert_eq!(config.retention.days, 14);
        assert!(config.notifiers.mail.enabled);
        assert_eq!(config.notifiers.webhooks.len(), 1);

        match &config.data_sources[0] {
            DataSourceConfig::Mysql { port, .. } => assert_eq!(*port, 3306),
            other => panic!("expected mysql data source, got {other:?}"),
        }
        match &config.data_sources[1] {
            DataSourceConfig::Postgres { port, .. } => assert_eq!(*port, 5433),
            other => panic!("expected postgres data source, got {other:?}"),
        }
        match &config.drives[1] {
            DriveConfig::S3 {
                prefix,
                force_path_style,
                endpoint,
                ..
            } => {
                assert_eq!(prefix, "db");
                assert!(!force_path_style);
                assert!(endpoint.is_none());
            }
            other => panic!("expected s3 drive, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_provider() {
        let bad = r#"
            [database]
            path = "b.db"

            [[data_sources]]
            provider = "oracle"
            label = "x"
        "#;
        assert!(toml::from_str::<Config>(bad).is_err());
    }

    #[test]
    fn validate_requires_sources_and_drives() {
        let minimal = r#"
            [database]
            path = "b.db"
        "#;
        let config: Config = toml::from_str(minimal).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("no data sources"));
    }

    #[test]
    fn mail_defaults() {
        let config = MailConfig::default();
        assert_eq!(config.smtp_port, 587);
        assert_eq!(config.smtp_crypto, "starttls");
        assert!(!config.enabled);
    }
}
