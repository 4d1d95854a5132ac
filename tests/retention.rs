mod common;

use std::sync::Arc;

use backupman::drives::MockDrive;
use backupman::dumpers::MockDumper;
use backupman::models::{backup, drive_file};
use backupman::services::backup::run_backup;
use backupman::services::retention::remove_old_backups;
use backupman::state::RunMode;
use tempfile::TempDir;

#[tokio::test]
async fn removes_backups_past_the_retention_window_and_keeps_the_rest() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(MockDrive::new("vault", "mock-a"));
    let state = common::test_state(
        &dir,
        vec![Arc::new(MockDumper::new("orders", common::dump_dir(&dir)))],
        vec![drive.clone()],
        vec![],
        Some(30),
    );

    // Two finished backups, one just past the window, one just inside it.
    let first = run_backup(&state, RunMode::Interactive).await.unwrap();
    let second = run_backup(&state, RunMode::Interactive).await.unwrap();
    let (expired_id, kept_id) = (&first[0], &second[0]);
    common::backdate_backup(&state, expired_id, 31);
    common::backdate_backup(&state, kept_id, 29);

    let expired_path = common::read_full(&state, expired_id).drive_files[0]
        .path
        .clone();
    let kept_path = common::read_full(&state, kept_id).drive_files[0].path.clone();

    remove_old_backups(&state).await.unwrap();

    assert!(common::read_full_maybe(&state, expired_id).is_none());
    assert!(common::read_full_maybe(&state, kept_id).is_some());

    let deleted = drive.deleted_paths();
    assert!(deleted.contains(&expired_path));
    assert!(!deleted.contains(&kept_path));
}

#[tokio::test]
async fn never_uploaded_drive_files_are_removed_without_remote_deletes() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(MockDrive::new("vault", "mock-a"));
    let state = common::test_state(&dir, vec![], vec![drive.clone()], vec![], Some(30));

    let expired = {
        let conn = state.db.get().unwrap();
        let b = backup::create(&conn, "orders").unwrap();
        let f = drive_file::create(&conn, &b.id, "mock-a", "vault").unwrap();
        drive_file::update_status(&conn, &f.id, drive_file::STATUS_FAILED).unwrap();
        b
    };
    common::backdate_backup(&state, &expired.id, 40);

    remove_old_backups(&state).await.unwrap();

    assert!(common::read_full_maybe(&state, &expired.id).is_none());
    assert!(drive.deleted_paths().is_empty());
}

#[tokio::test]
async fn unresolvable_provider_aborts_the_whole_pass() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(MockDrive::new("vault", "mock-a"));
    let state = common::test_state(
        &dir,
        vec![Arc::new(MockDumper::new("orders", common::dump_dir(&dir)))],
        vec![drive.clone()],
        vec![],
        Some(30),
    );

    let ids = run_backup(&state, RunMode::Interactive).await.unwrap();
    common::backdate_backup(&state, &ids[0], 40);
    let full = common::read_full(&state, &ids[0]);
    common::set_drive_file_provider(&state, &full.drive_files[0].id, "ghost");

    let err = remove_old_backups(&state).await.unwrap_err();
    assert!(err.to_string().contains("no drive configured"));

    // Nothing of the backup was removed.
    assert!(common::read_full_maybe(&state, &ids[0]).is_some());
    assert!(drive.deleted_paths().is_empty());
}

#[tokio::test]
async fn skips_backups_with_an_operation_in_flight() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(MockDrive::new("vault", "mock-a"));
    let state = common::test_state(
        &dir,
        vec![Arc::new(MockDumper::new("orders", common::dump_dir(&dir)))],
        vec![drive.clone()],
        vec![],
        Some(30),
    );

    let ids = run_backup(&state, RunMode::Interactive).await.unwrap();
    common::backdate_backup(&state, &ids[0], 40);

    assert!(state.try_claim_backup(&ids[0]).await);
    remove_old_backups(&state).await.unwrap();
    assert!(common::read_full_maybe(&state, &ids[0]).is_some());

    state.release_backup(&ids[0]).await;
    remove_old_backups(&state).await.unwrap();
    assert!(common::read_full_maybe(&state, &ids[0]).is_none());
}
