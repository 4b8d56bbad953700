#![cfg(feature = "storage-rocksdb")]

mod common;

use assert_cmd::cargo_bin;
use common::events_csv;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: attend without review, earning points
    let csv1 = events_csv(&["pay, u1, m1, d1, 2000, card,", "attend, , , d1"]);

    let mut cmd1 = Command::new(cargo_bin!("bapal"));
    cmd1.arg("settle").arg(csv1.path()).arg("--db-path").arg(&db_path);

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("d1,u1,m1,2000,converted,2000"));
    assert!(stdout1.contains("u1,2000,2000,0"));

    // 2. Second run: spend the recovered points on the next deposit
    let csv2 = events_csv(&["pay, u1, m2, d2, 1500, points,"]);

    let mut cmd2 = Command::new(cargo_bin!("bapal"));
    cmd2.arg("settle").arg(csv2.path()).arg("--db-path").arg(&db_path);

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);

    assert!(stdout2.contains("d1,u1,m1,2000,converted,2000"));
    assert!(stdout2.contains("d2,u1,m2,1500,paid,"));
    assert!(stdout2.contains("u1,2000,500,1500"));
}
