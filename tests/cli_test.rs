use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use sha2::{Digest, Sha512};
use std::process::Command;

mod common;
use common::{PAYMENTS_HEADER, SCRIPT_HEADER, write_csv};

fn reconcile_state(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is a JSON flow state")
}

#[test]
fn test_cli_settlement_redirect() -> Result<(), Box<dyn std::error::Error>> {
    let payments = write_csv(&[PAYMENTS_HEADER, "pay-123, ORD-123, 150000, PENDING, evt-42, usr-7,"]);
    let script = write_csv(&[SCRIPT_HEADER, "ORD-123, settlement, accept, 150000"]);

    let output = Command::new(cargo_bin!("paysync"))
        .arg("reconcile")
        .arg("https://events.example/payment/result?order_id=ORD-123&status_code=200&transaction_status=settlement")
        .arg("--payments")
        .arg(payments.path())
        .arg("--gateway-script")
        .arg(script.path())
        .output()?;

    assert_eq!(output.status.code(), Some(0));
    let state = reconcile_state(&output);
    assert_eq!(state["state"], "success");
    assert_eq!(state["payment"]["status"], "PAID");
    assert!(state["registration_id"].is_string());
    assert_eq!(state["registration_id"], state["payment"]["registration_id"]);

    Ok(())
}

#[test]
fn test_cli_pending_until_paid() -> Result<(), Box<dyn std::error::Error>> {
    let payments = write_csv(&[PAYMENTS_HEADER, "pay-1, ORD-1, 50000, PENDING, evt-1, usr-1,"]);
    let script = write_csv(&[
        SCRIPT_HEADER,
        "ORD-1, pending, ,",
        "ORD-1, pending, ,",
        "ORD-1, capture, accept, 50000",
    ]);

    let output = Command::new(cargo_bin!("paysync"))
        .args(["reconcile", "order_id=ORD-1&transaction_status=pending"])
        .arg("--payments")
        .arg(payments.path())
        .arg("--gateway-script")
        .arg(script.path())
        .args(["--poll-interval-ms", "10"])
        .output()?;

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(reconcile_state(&output)["state"], "success");
    Ok(())
}

#[test]
fn test_cli_unknown_order_fails() {
    let payments = write_csv(&[PAYMENTS_HEADER, "pay-1, ORD-1, 50000, PENDING, evt-1, usr-1,"]);
    let script = write_csv(&[SCRIPT_HEADER]);

    Command::new(cargo_bin!("paysync"))
        .args(["reconcile", "order_id=ORD-999&transaction_status=settlement"])
        .arg("--payments")
        .arg(payments.path())
        .arg("--gateway-script")
        .arg(script.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"state\": \"failed\""))
        .stdout(predicate::str::contains("\"kind\": \"payment_not_found\""));
}

#[test]
fn test_cli_missing_order_id_fails() {
    Command::new(cargo_bin!("paysync"))
        .args(["reconcile", "status_code=200&transaction_status=settlement"])
        .arg("--gateway-script")
        .arg(write_csv(&[SCRIPT_HEADER]).path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"kind\": \"missing_order_id\""));
}

#[test]
fn test_cli_polling_gives_up() {
    let payments = write_csv(&[PAYMENTS_HEADER, "pay-1, ORD-1, 50000, PENDING, evt-1, usr-1,"]);
    let script = write_csv(&[SCRIPT_HEADER, "ORD-1, pending, ,"]);

    Command::new(cargo_bin!("paysync"))
        .args(["reconcile", "order_id=ORD-1"])
        .arg("--payments")
        .arg(payments.path())
        .arg("--gateway-script")
        .arg(script.path())
        .args(["--poll-interval-ms", "5", "--max-poll-attempts", "3"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"kind\": \"polling_exhausted\""))
        .stdout(predicate::str::contains("\"attempts\": 3"));
}

#[test]
fn test_cli_rejects_zero_poll_interval() {
    Command::new(cargo_bin!("paysync"))
        .args(["reconcile", "order_id=ORD-1", "--poll-interval-ms", "0"])
        .arg("--gateway-script")
        .arg(write_csv(&[SCRIPT_HEADER]).path())
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("--poll-interval-ms"))
        .stderr(predicate::str::contains("panicked").not());
}

#[test]
fn test_cli_require_local_confirmation() {
    let payments = write_csv(&[PAYMENTS_HEADER, "pay-1, ORD-1, 50000, PENDING, evt-1, usr-1,"]);
    // The gateway never confirms, so the success hint alone must not be enough.
    let script = write_csv(&[SCRIPT_HEADER, "ORD-1, pending, ,"]);

    Command::new(cargo_bin!("paysync"))
        .args(["reconcile", "order_id=ORD-1&transaction_status=capture"])
        .arg("--payments")
        .arg(payments.path())
        .arg("--gateway-script")
        .arg(script.path())
        .args(["--poll-interval-ms", "5", "--max-poll-attempts", "2"])
        .arg("--require-local-confirmation")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"kind\": \"polling_exhausted\""));
}

#[test]
fn test_cli_notify_registers_paid_payment() -> Result<(), Box<dyn std::error::Error>> {
    let server_key = "SB-Mid-server-cli";
    let payments = write_csv(&[PAYMENTS_HEADER, "pay-5, ORD-5, 75000, PENDING, evt-1, usr-1,"]);

    let mut hasher = Sha512::new();
    hasher.update(format!("ORD-520075000.00{}", server_key));
    let signature = hex::encode(hasher.finalize());
    let body = serde_json::json!({
        "order_id": "ORD-5",
        "status_code": "200",
        "gross_amount": "75000.00",
        "signature_key": signature,
        "transaction_status": "settlement",
        "payment_type": "bank_transfer",
    });
    let notification = write_csv(&[body.to_string().as_str()]);

    let output = Command::new(cargo_bin!("paysync"))
        .env("MIDTRANS_SERVER_KEY", server_key)
        .arg("notify")
        .arg(notification.path())
        .arg("--payments")
        .arg(payments.path())
        .output()?;

    assert!(output.status.success());
    let payment: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(payment["status"], "PAID");
    assert!(payment["registration_id"].is_string());
    Ok(())
}

#[test]
fn test_cli_notify_rejects_bad_signature() {
    let payments = write_csv(&[PAYMENTS_HEADER, "pay-5, ORD-5, 75000, PENDING, evt-1, usr-1,"]);
    let body = serde_json::json!({
        "order_id": "ORD-5",
        "status_code": "200",
        "gross_amount": "75000.00",
        "signature_key": "not-a-signature",
        "transaction_status": "settlement",
    });
    let notification = write_csv(&[body.to_string().as_str()]);

    Command::new(cargo_bin!("paysync"))
        .env("MIDTRANS_SERVER_KEY", "SB-Mid-server-cli")
        .arg("notify")
        .arg(notification.path())
        .arg("--payments")
        .arg(payments.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("signature"));
}
