#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use paysync::domain::payment::PaymentStatus;
use paysync::domain::ports::{PaymentStore, RegistrationStore};
use paysync::infrastructure::rocksdb::RocksDBStore;
use std::process::Command;
use tempfile::tempdir;

mod common;
use common::{PAYMENTS_HEADER, SCRIPT_HEADER, write_csv};

fn registration_id(stdout: &[u8]) -> String {
    let state: serde_json::Value = serde_json::from_slice(stdout).expect("JSON flow state");
    assert_eq!(state["state"], "success");
    state["registration_id"]
        .as_str()
        .expect("registration id")
        .to_string()
}

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");
    let payments = write_csv(&[PAYMENTS_HEADER, "pay-1, ORD-1, 100, PENDING, evt-1, usr-1,"]);

    // 1. First run: the gateway settles the payment and a registration is created
    let settled = write_csv(&[SCRIPT_HEADER, "ORD-1, settlement, , 100"]);
    let output1 = Command::new(cargo_bin!("paysync"))
        .args(["reconcile", "order_id=ORD-1&transaction_status=settlement"])
        .arg("--payments")
        .arg(payments.path())
        .arg("--gateway-script")
        .arg(settled.path())
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output1.status.success());
    let first = registration_id(&output1.stdout);

    // 2. Second run: same seed, and a gateway that would now report expiry.
    // The stored PAID payment and its registration must win.
    let expired = write_csv(&[SCRIPT_HEADER, "ORD-1, expire, ,"]);
    let output2 = Command::new(cargo_bin!("paysync"))
        .args(["reconcile", "order_id=ORD-1&transaction_status=settlement"])
        .arg("--payments")
        .arg(payments.path())
        .arg("--gateway-script")
        .arg(expired.path())
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output2.status.success());
    assert_eq!(registration_id(&output2.stdout), first);
}

#[tokio::test]
async fn test_store_reopens_with_state() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("store_db");

    {
        let store = RocksDBStore::open(&db_path).unwrap();
        store.insert(common::payment("pay-1", "ORD-1")).await.unwrap();
        store.transition("ORD-1", PaymentStatus::Paid).await.unwrap();
    }

    let store = RocksDBStore::open(&db_path).unwrap();
    let payment = store.get_by_order_id("ORD-1").await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Paid);
    assert!(store.all().await.unwrap().is_empty());
}
