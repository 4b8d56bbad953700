mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use common::events_csv;
use predicates::prelude::*;
use std::process::Command;

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let csv = events_csv(&["pay, u1, m1, d1, 3000, card,"]);

    let mut cmd = Command::new(cargo_bin!("bapal"));
    cmd.arg("settle").arg(csv.path()).arg("--db-path").arg("some_db");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage.",
        ))
        .stdout(predicate::str::contains("d1,u1,m1,3000,paid,"));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_no_fallback_warning() {
    let csv = events_csv(&["pay, u1, m1, d1, 3000, card,"]);

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let mut cmd = Command::new(cargo_bin!("bapal"));
    cmd.arg("settle").arg(csv.path()).arg("--db-path").arg(&db_path);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Falling back").not());
}
