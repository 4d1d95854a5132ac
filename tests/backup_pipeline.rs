mod common;

use std::sync::Arc;

use backupman::drives::MockDrive;
use backupman::dumpers::MockDumper;
use backupman::notifiers::MockNotifier;
use backupman::services::backup::run_backup;
use backupman::state::RunMode;
use tempfile::TempDir;

#[tokio::test]
async fn successful_run_finishes_and_cleans_up() {
    let dir = TempDir::new().unwrap();
    let drive_a = Arc::new(MockDrive::new("vault", "mock-a"));
    let drive_b = Arc::new(MockDrive::new("offsite", "mock-b"));
    let notifier = Arc::new(MockNotifier::new("mock"));

    let state = common::test_state(
        &dir,
        vec![Arc::new(MockDumper::new("orders", common::dump_dir(&dir)))],
        vec![drive_a.clone(), drive_b.clone()],
        vec![notifier.clone()],
        None,
    );

    let ids = run_backup(&state, RunMode::Interactive).await.unwrap();
    assert_eq!(ids.len(), 1);

    let full = common::read_full(&state, &ids[0]);
    assert_eq!(full.status, "finished");
    assert_eq!(full.drive_files.len(), 2);
    assert!(full
        .drive_files
        .iter()
        .all(|f| f.status == "finished" && f.path.starts_with("mock://")));

    // The local artifact is removed and its path cleared once finished.
    assert_eq!(full.dump_path, "");
    let leftover: Vec<_> = std::fs::read_dir(common::dump_dir(&dir))
        .unwrap()
        .collect();
    assert!(leftover.is_empty());

    assert_eq!(notifier.reported_backup_ids(), ids);
    assert_eq!(drive_a.upload_attempts().len(), 1);
    assert_eq!(drive_b.upload_attempts().len(), 1);
}

#[tokio::test]
async fn one_failing_dump_does_not_block_the_other_source() {
    let dir = TempDir::new().unwrap();
    let drive = Arc::new(MockDrive::new("vault", "mock-a"));
    let notifier = Arc::new(MockNotifier::new("mock"));

    let state = common::test_state(
        &dir,
        vec![
            Arc::new(MockDumper::new("orders", common::dump_dir(&dir))),
            Arc::new(MockDumper::new("billing", common::dump_dir(&dir)).failing()),
        ],
        vec![drive.clone()],
        vec![notifier.clone()],
        None,
    );

    let ids = run_backup(&state, RunMode::Interactive).await.unwrap();
    assert_eq!(ids.len(), 2);

    let ok = common::read_full(&state, &ids[0]);
    assert_eq!(ok.status, "finished");
    assert_eq!(ok.drive_files.len(), 1);

    let failed = common::read_full(&state, &ids[1]);
    assert_eq!(failed.status, "failed");
    assert!(failed.drive_files.is_empty());
    assert_eq!(failed.dump_path, "");

    // Post-processing runs only for backups whose dump succeeded.
    assert_eq!(notifier.reported_backup_ids(), vec![ids[0].clone()]);
}

#[tokio::test]
async fn one_failing_upload_fails_the_backup_but_not_the_other_drives() {
    let dir = TempDir::new().unwrap();
    let drive_a = Arc::new(MockDrive::new("vault", "mock-a"));
    let drive_b = Arc::new(MockDrive::new("offsite", "mock-b").failing_uploads());
    let drive_c = Arc::new(MockDrive::new("archive", "mock-c"));
    let notifier = Arc::new(MockNotifier::new("mock"));

    let state = common::test_state(
        &dir,
        vec![Arc::new(MockDumper::new("orders", common::dump_dir(&dir)))],
        vec![drive_a.clone(), drive_b.clone(), drive_c.clone()],
        vec![notifier.clone()],
        None,
    );

    let ids = run_backup(&state, RunMode::Interactive).await.unwrap();
    let full = common::read_full(&state, &ids[0]);

    assert_eq!(full.status, "failed");
    assert_eq!(full.drive_files.len(), 3);

    let by_provider = |p: &str| full.drive_files.iter().find(|f| f.provider == p).unwrap();
    assert_eq!(by_provider("mock-a").status, "finished");
    assert_eq!(by_provider("mock-b").status, "failed");
    assert_eq!(by_provider("mock-b").path, "");
    assert_eq!(by_provider("mock-c").status, "finished");

    // The artifact must survive a failed backup so a retry can use it.
    assert!(!full.dump_path.is_empty());
    assert!(std::path::Path::new(&full.dump_path).exists());

    // The report goes out regardless of the outcome.
    assert_eq!(notifier.reported_backup_ids(), ids);
}

#[tokio::test]
async fn failing_notifier_never_fails_the_pipeline() {
    let dir = TempDir::new().unwrap();
    let state = common::test_state(
        &dir,
        vec![Arc::new(MockDumper::new("orders", common::dump_dir(&dir)))],
        vec![Arc::new(MockDrive::new("vault", "mock-a"))],
        vec![
            Arc::new(MockNotifier::new("broken").failing_send()),
            Arc::new(MockNotifier::new("mock")),
        ],
        None,
    );

    let ids = run_backup(&state, RunMode::Interactive).await.unwrap();
    assert_eq!(common::read_full(&state, &ids[0]).status, "finished");
}

#[tokio::test]
async fn server_mode_detaches_cleanup_and_notification() {
    let dir = TempDir::new().unwrap();
    let notifier = Arc::new(MockNotifier::new("mock"));
    let state = common::test_state(
        &dir,
        vec![Arc::new(MockDumper::new("orders", common::dump_dir(&dir)))],
        vec![Arc::new(MockDrive::new("vault", "mock-a"))],
        vec![notifier.clone()],
        None,
    );

    let ids = run_backup(&state, RunMode::Server).await.unwrap();

    // Cleanup and notification were handed to the task tracker; drain it.
    state.tasks.close();
    state.tasks.wait().await;

    let full = common::read_full(&state, &ids[0]);
    assert_eq!(full.status, "finished");
    assert_eq!(full.dump_path, "");
    assert_eq!(notifier.reported_backup_ids(), ids);
}
