#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // First run vaults the card and records an order.
    let mut first = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        first,
        r#"{{"customer_id": 1, "product_id": 10, "amount": 1999, "token": "tok_visa", "rememberCard": true}}"#
    )
    .unwrap();

    let output = Command::new(cargo_bin!("checkout"))
        .arg("--db-path")
        .arg(&db_path)
        .arg("run")
        .arg(first.path())
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(r#""status":"completed""#));

    // Second run charges the stored card from the reopened database.
    let mut second = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        second,
        r#"{{"customer_id": 1, "product_id": 11, "amount": 500, "useExisting": true}}"#
    )
    .unwrap();

    let output = Command::new(cargo_bin!("checkout"))
        .arg("--db-path")
        .arg(&db_path)
        .arg("run")
        .arg(second.path())
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(r#""status":"completed""#));

    // Both orders survive in the history.
    let output = Command::new(cargo_bin!("checkout"))
        .arg("--db-path")
        .arg(&db_path)
        .args(["orders", "--customer", "1"])
        .output()
        .expect("Failed to execute command");
    let history = String::from_utf8_lossy(&output.stdout);
    assert_eq!(history.lines().count(), 3);
    assert!(history.contains(",10,1999,usd,completed,"));
    assert!(history.contains(",11,500,usd,completed,"));
}
