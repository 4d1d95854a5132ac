//! Dump providers: produce a point-in-time artifact from a data source.
//!
//! Each provider shells out to the native client tool (mysqldump, pg_dump,
//! sqlite3) located via PATH and writes the dump into its tmp folder.

pub mod mock;
pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use mock::MockDumper;
pub use mysql::MysqlDumper;
pub use postgres::PostgresDumper;
pub use sqlite::SqliteDumper;

use async_trait::async_trait;
use std::path::PathBuf;

#[async_trait]
pub trait Dumper: Send + Sync {
    /// Produce a dump artifact and return its local path.
    async fn dump(&self) -> anyhow::Result<PathBuf>;

    fn label(&self) -> &str;

    async fn health(&self) -> anyhow::Result<()>;
}

/// Fresh artifact name for a dump run.
pub(crate) fn dump_filename() -> String {
    format!("{}.sql", uuid::Uuid::new_v4())
}
