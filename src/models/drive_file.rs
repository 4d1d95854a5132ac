use rusqlite::{params, Connection, Row};
use serde::Serialize;
use uuid::Uuid;

use crate::models::now_ts;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_FINISHED: &str = "finished";
pub const STATUS_FAILED: &str = "failed";

/// One artifact's upload attempt/result against one storage provider.
#[derive(Debug, Clone, Serialize)]
pub struct DriveFile {
    pub id: String,
    pub backup_id: String,
    pub provider: String,
    pub label: String,
    pub path: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

fn row_to_drive_file(row: &Row) -> rusqlite::Result<DriveFile> {
    Ok(DriveFile {
        id: row.get("id")?,
        backup_id: row.get("backup_id")?,
        provider: row.get("provider")?,
        label: row.get("label")?,
        path: row.get("path")?,
        status: row.get("status")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn create(
    conn: &Connection,
    backup_id: &str,
    provider: &str,
    label: &str,
) -> anyhow::Result<DriveFile> {
    let id = Uuid::new_v4().to_string();
    let now = now_ts();
    conn.execute(
        "INSERT INTO drive_files (id, backup_id, provider, label, path, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, '', ?5, ?6, ?7)",
        params![id, backup_id, provider, label, STATUS_PENDING, now, now],
    )?;
    find_by_id(conn, &id)?.ok_or_else(|| anyhow::anyhow!("failed to retrieve created drive file"))
}

pub fn find_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<DriveFile>> {
    let mut stmt = conn.prepare("SELECT * FROM drive_files WHERE id = ?")?;
    let mut rows = stmt.query_map(params![id], row_to_drive_file)?;
    rows.next().transpose().map_err(Into::into)
}

pub fn find_by_backup_id(conn: &Connection, backup_id: &str) -> anyhow::Result<Vec<DriveFile>> {
    let mut stmt =
        conn.prepare("SELECT * FROM drive_files WHERE backup_id = ? ORDER BY created_at ASC")?;
    let rows = stmt.query_map(params![backup_id], row_to_drive_file)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

pub fn update_status(conn: &Connection, id: &str, status: &str) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE drive_files SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status, now_ts(), id],
    )?;
    Ok(())
}

/// Records a successful upload: status plus the remote path in one write.
pub fn mark_finished(conn: &Connection, id: &str, path: &str) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE drive_files SET status = ?1, path = ?2, updated_at = ?3 WHERE id = ?4",
        params![STATUS_FINISHED, path, now_ts(), id],
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let changes = conn.execute("DELETE FROM drive_files WHERE id = ?", params![id])?;
    Ok(changes > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate::apply_schema;
    use crate::models::backup;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn lifecycle() {
        let conn = test_conn();
        let parent = backup::create(&conn, "orders").unwrap();
        let file = create(&conn, &parent.id, "local", "vault").unwrap();
        assert_eq!(file.status, STATUS_PENDING);
        assert_eq!(file.path, "");

        mark_finished(&conn, &file.id, "/srv/backups/20260806.sql").unwrap();
        let file = find_by_id(&conn, &file.id).unwrap().unwrap();
        assert_eq!(file.status, STATUS_FINISHED);
        assert_eq!(file.path, "/srv/backups/20260806.sql");

        update_status(&conn, &file.id, STATUS_FAILED).unwrap();
        let file = find_by_id(&conn, &file.id).unwrap().unwrap();
        assert_eq!(file.status, STATUS_FAILED);

        assert!(delete(&conn, &file.id).unwrap());
        assert!(find_by_id(&conn, &file.id).unwrap().is_none());
    }
}
