use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use uuid::Uuid;

use crate::models::drive_file::{self, DriveFile};
use crate::models::{fmt_ts, now_ts};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_FINISHED: &str = "finished";
pub const STATUS_FAILED: &str = "failed";

#[derive(Debug, Clone, Serialize)]
pub struct Backup {
    pub id: String,
    pub label: String,
    pub status: String,
    pub dump_path: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A backup together with all of its drive files. This is the shape consumed
/// by the reconciler, the notifiers and the HTTP listing.
#[derive(Debug, Clone, Serialize)]
pub struct BackupFull {
    pub id: String,
    pub label: String,
    pub status: String,
    pub dump_path: String,
    pub created_at: String,
    pub updated_at: String,
    pub drive_files: Vec<DriveFile>,
}

impl BackupFull {
    pub fn to_backup(&self) -> Backup {
        Backup {
            id: self.id.clone(),
            label: self.label.clone(),
            status: self.status.clone(),
            dump_path: self.dump_path.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}

fn row_to_backup(row: &Row) -> rusqlite::Result<Backup> {
    Ok(Backup {
        id: row.get("id")?,
        label: row.get("label")?,
        status: row.get("status")?,
        dump_path: row.get("dump_path")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn create(conn: &Connection, label: &str) -> anyhow::Result<Backup> {
    let id = Uuid::new_v4().to_string();
    let now = now_ts();
    conn.execute(
        "INSERT INTO backups (id, label, status, dump_path, created_at, updated_at)
         VALUES (?1, ?2, ?3, '', ?4, ?5)",
        params![id, label, STATUS_PENDING, now, now],
    )?;
    find_by_id(conn, &id)?.ok_or_else(|| anyhow::anyhow!("failed to retrieve created backup"))
}

pub fn find_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Backup>> {
    let mut stmt = conn.prepare("SELECT * FROM backups WHERE id = ?")?;
    let mut rows = stmt.query_map(params![id], row_to_backup)?;
    rows.next().transpose().map_err(Into::into)
}

pub fn find_full_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<BackupFull>> {
    let Some(backup) = find_by_id(conn, id)? else {
        return Ok(None);
    };
    let drive_files = drive_file::find_by_backup_id(conn, id)?;
    Ok(Some(attach(backup, drive_files)))
}

pub fn find_all_full(conn: &Connection) -> anyhow::Result<Vec<BackupFull>> {
    let mut stmt = conn.prepare("SELECT * FROM backups ORDER BY created_at DESC")?;
    let backups = stmt
        .query_map([], row_to_backup)?
        .collect::<Result<Vec<_>, _>>()?;
    backups
        .into_iter()
        .map(|b| {
            let files = drive_file::find_by_backup_id(conn, &b.id)?;
            Ok(attach(b, files))
        })
        .collect()
}

pub fn find_full_older_than(
    conn: &Connection,
    cutoff: DateTime<Utc>,
) -> anyhow::Result<Vec<BackupFull>> {
    let mut stmt =
        conn.prepare("SELECT * FROM backups WHERE created_at < ? ORDER BY created_at ASC")?;
    let backups = stmt
        .query_map(params![fmt_ts(cutoff)], row_to_backup)?
        .collect::<Result<Vec<_>, _>>()?;
    backups
        .into_iter()
        .map(|b| {
            let files = drive_file::find_by_backup_id(conn, &b.id)?;
            Ok(attach(b, files))
        })
        .collect()
}

pub fn update_status(conn: &Connection, id: &str, status: &str) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE backups SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status, now_ts(), id],
    )?;
    Ok(())
}

pub fn update_dump_path(conn: &Connection, id: &str, dump_path: &str) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE backups SET dump_path = ?1, updated_at = ?2 WHERE id = ?3",
        params![dump_path, now_ts(), id],
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let changes = conn.execute("DELETE FROM backups WHERE id = ?", params![id])?;
    Ok(changes > 0)
}

fn attach(backup: Backup, drive_files: Vec<DriveFile>) -> BackupFull {
    BackupFull {
        id: backup.id,
        label: backup.label,
        status: backup.status,
        dump_path: backup.dump_path,
        created_at: backup.created_at,
        updated_at: backup.updated_at,
        drive_files,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate::apply_schema;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn create_and_read_back() {
        let conn = test_conn();
        let backup = create(&conn, "orders").unwrap();
        assert_eq!(backup.label, "orders");
        assert_eq!(backup.status, STATUS_PENDING);
        assert_eq!(backup.dump_path, "");

        let found = find_by_id(&conn, &backup.id).unwrap().unwrap();
        assert_eq!(found.id, backup.id);
        assert!(find_by_id(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn full_read_includes_drive_files() {
        let conn = test_conn();
        let backup = create(&conn, "orders").unwrap();
        drive_file::create(&conn, &backup.id, "local", "vault").unwrap();
        drive_file::create(&conn, &backup.id, "s3", "offsite").unwrap();

        let full = find_full_by_id(&conn, &backup.id).unwrap().unwrap();
        assert_eq!(full.drive_files.len(), 2);
        assert!(full
            .drive_files
            .iter()
            .all(|f| f.backup_id == backup.id && f.status == drive_file::STATUS_PENDING));
    }

    #[test]
    fn older_than_filters_on_created_at() {
        let conn = test_conn();
        let old = create(&conn, "old").unwrap();
        let _recent = create(&conn, "recent").unwrap();

        let past = fmt_ts(Utc::now() - chrono::Duration::days(40));
        conn.execute(
            "UPDATE backups SET created_at = ?1 WHERE id = ?2",
            params![past, old.id],
        )
        .unwrap();

        let cutoff = Utc::now() - chrono::Duration::days(30);
        let expired = find_full_older_than(&conn, cutoff).unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, old.id);
    }

    #[test]
    fn delete_reports_existence() {
        let conn = test_conn();
        let backup = create(&conn, "orders").unwrap();
        assert!(delete(&conn, &backup.id).unwrap());
        assert!(!delete(&conn, &backup.id).unwrap());
    }
}
