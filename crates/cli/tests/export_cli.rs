// Integration tests for the `stripe-csv` binary.
// Run with: cargo test -p stripe-csv-cli --test export_cli

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use httpmock::prelude::*;
use serde_json::json;

// 2026-01-15T10:30:00Z
const T: i64 = 1768473000;
const FROM: &str = "2026-01-01T00:00:00Z";
const TO: &str = "2026-02-01T00:00:00Z";

fn stripe_csv(config_dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_stripe-csv"));
    cmd.current_dir(config_dir);
    // Clear env to avoid leaking a real key into tests
    cmd.env_remove("STRIPE_API_KEY");
    cmd.env_remove("RUST_LOG");
    cmd.env("STRIPE_CSV_CONFIG", config_dir.join("settings.json"));
    cmd.env("TZ", "UTC");
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("failed to run stripe-csv")
}

fn assert_exit(output: &Output, code: i32) {
    assert_eq!(
        output.status.code(),
        Some(code),
        "expected exit {}, got {:?}\nstderr: {}",
        code,
        output.status.code(),
        String::from_utf8_lossy(&output.stderr),
    );
}

fn list(data: serde_json::Value) -> serde_json::Value {
    json!({ "object": "list", "data": data, "has_more": false })
}

#[test]
fn missing_api_key_exits_50() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(stripe_csv(dir.path()).args(["--start", "2026-01-01", "--end", "2026-01-31"]));

    assert_exit(&output, 50);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing Stripe API key"), "stderr: {}", stderr);
}

#[test]
fn api_key_from_env_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    // A bad date fails after key resolution, proving the env key was taken
    let output = run(stripe_csv(dir.path())
        .env("STRIPE_API_KEY", "sk_test_env")
        .args(["--start", "not-a-date"]));
    assert_exit(&output, 2);
}

#[test]
fn bad_date_format_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(stripe_csv(dir.path()).args([
        "--api-key", "sk_test_fake", "--start", "not-a-date", "--end", "2026-01-31",
    ]));
    assert_exit(&output, 2);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid --start date"), "stderr: {}", stderr);
}

#[test]
fn inverted_range_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(stripe_csv(dir.path()).args([
        "--api-key", "sk_test_fake", "--start", "2026-01-31", "--end", "2026-01-01",
    ]));
    assert_exit(&output, 2);
}

#[test]
fn invalid_currency_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(stripe_csv(dir.path()).args(["--api-key", "sk_test_fake", "--currency", "dollars"]));
    assert_exit(&output, 2);
}

#[test]
fn existing_output_aborts_before_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("taken.csv");
    fs::write(&out, "previous export").unwrap();

    let server = MockServer::start();
    let any_call = server.mock(|when, then| {
        when.any_request();
        then.status(200).json_body(list(json!([])));
    });

    let output = run(stripe_csv(dir.path()).args([
        "--api-key", "sk_test_fake",
        "--start", FROM, "--end", TO,
        "--output", out.to_str().unwrap(),
        "--api-base", &server.base_url(),
    ]));

    assert_exit(&output, 3);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("file already exists"), "stderr: {}", stderr);
    assert_eq!(fs::read_to_string(&out).unwrap(), "previous export");
    any_call.assert_calls(0);
}

#[test]
fn auth_failure_exits_51_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("exports").join("out.csv");

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v1/balance_transactions");
        then.status(401).json_body(json!({
            "error": { "message": "Invalid API Key provided: sk_test_****_bad" }
        }));
    });

    let output = run(stripe_csv(dir.path()).args([
        "--api-key", "sk_test_bad",
        "--start", FROM, "--end", TO,
        "--output", out.to_str().unwrap(),
        "--api-base", &server.base_url(),
    ]));

    assert_exit(&output, 51);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Stripe auth failed (401)"), "stderr: {}", stderr);
    assert!(!out.exists());
}

#[test]
fn end_to_end_export() {
    let dir = tempfile::tempdir().unwrap();

    let server = MockServer::start();
    let txns = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/balance_transactions")
            .query_param("currency", "usd")
            .query_param("created[gte]", "1767225600")
            .query_param("created[lt]", "1769904000");
        then.status(200).json_body(list(json!([
            {
                "id": "tx_1", "type": "charge", "source": null, "amount": 1000,
                "description": "Sale", "created": T,
                "fee_details": [ { "amount": 30, "description": "fee" } ]
            },
            {
                "id": "txn_pf", "type": "payout_failure", "source": "po_1", "amount": 900,
                "description": "Payout failure", "created": T, "fee_details": []
            },
            {
                "id": "txn_re", "type": "refund", "source": "re_1", "amount": -500,
                "description": "REFUND FOR CHARGE", "created": T + 60, "fee_details": []
            }
        ])));
    });
    let charges = server.mock(|when, then| {
        when.method(GET).path("/v1/charges");
        then.status(200).json_body(list(json!([
            { "id": "tx_1", "source": { "name": "Alice" } }
        ])));
    });
    let events = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/events")
            .query_param("type", "charge.refunded");
        then.status(200).json_body(list(json!([
            { "id": "evt_0", "data": { "object": { "refunds": { "data": [] }, "source": { "name": "Nobody" } } } },
            { "id": "evt_1", "data": { "object": { "refunds": { "data": [ { "id": "re_1" } ] }, "source": { "name": "Bob" } } } }
        ])));
    });

    let output = run(stripe_csv(dir.path()).args([
        "--api-key", "sk_test_key",
        "--start", FROM, "--end", TO,
        "--api-base", &server.base_url(),
    ]));

    assert_exit(&output, 0);
    txns.assert();
    charges.assert();
    events.assert();

    // Default path: output/{CURRENCY}-{start}-{end}.csv under the working dir
    let path = dir.path().join("output").join("USD-2026_01_01-2026_02_01.csv");
    let contents = fs::read_to_string(&path).unwrap();
    assert_eq!(
        contents,
        "*Date,*Amount,Payee,Description,Reference,Timestamp\r\n\
         15/01/26,10.00,Alice,Sale,tx_1,2026-01-15T10:30:00\r\n\
         15/01/26,-0.30,,fee,tx_1,2026-01-15T10:30:00\r\n\
         15/01/26,-5.00,Bob,REFUND FOR CHARGE,re_1,2026-01-15T10:31:00\r\n"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Done: 3 rows"), "stderr: {}", stderr);
}

#[test]
fn settings_supply_currency_and_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("settings.json"),
        r#"{
    // EUR account
    "export.defaultCurrency": "eur",
    "export.outputDir": "exports/stripe"
}"#,
    )
    .unwrap();

    let server = MockServer::start();
    let txns = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/balance_transactions")
            .query_param("currency", "eur");
        then.status(200).json_body(list(json!([])));
    });
    server.mock(|when, then| {
        when.method(GET).path("/v1/charges");
        then.status(200).json_body(list(json!([])));
    });
    server.mock(|when, then| {
        when.method(GET).path("/v1/events");
        then.status(200).json_body(list(json!([])));
    });

    let output = run(stripe_csv(dir.path()).args([
        "--api-key", "sk_test_key",
        "--start", FROM, "--end", TO,
        "--api-base", &server.base_url(),
        "--quiet",
    ]));

    assert_exit(&output, 0);
    txns.assert();
    let path = dir.path().join("exports/stripe/EUR-2026_01_01-2026_02_01.csv");
    assert_eq!(
        fs::read_to_string(path).unwrap(),
        "*Date,*Amount,Payee,Description,Reference,Timestamp\r\n"
    );
    assert!(output.stderr.is_empty(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
}
