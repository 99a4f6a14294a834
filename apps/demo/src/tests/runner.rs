// Unit tests for command line options and report shape

use crate::runner::{DemoOptions, Outcome, ScenarioReport};

use clap::Parser;
use clap::error::ErrorKind;
use serde_json::json;

const BIN: &str = "wallet-demo";

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn given_arguments_when_parsed_then_flags_and_keys_split() {
    let options = DemoOptions::try_parse_from([
        BIN,
        "--popup",
        "swap",
        "--reject",
        "signMessage",
        "stake",
        "--reject",
        "wallet_sendCalls",
    ])
    .expect("valid");

    assert!(options.prefer_popup);
    assert_eq!(options.scenarios, strings(&["swap", "stake"]));
    assert_eq!(options.reject, strings(&["signMessage", "wallet_sendCalls"]));
}

#[test]
fn given_no_arguments_when_parsed_then_defaults() {
    let options = DemoOptions::try_parse_from([BIN]).expect("empty");

    assert_eq!(options, DemoOptions::default());
}

#[test]
fn given_bad_arguments_when_parsed_then_error() {
    let missing = DemoOptions::try_parse_from([BIN, "--reject"]).expect_err("needs a method");
    assert_eq!(missing.kind(), ErrorKind::InvalidValue);

    let unknown = DemoOptions::try_parse_from([BIN, "--verbose"]).expect_err("unknown flag");
    assert_eq!(unknown.kind(), ErrorKind::UnknownArgument);
}

#[test]
fn given_reports_when_serialized_then_status_tagged() {
    let success = ScenarioReport {
        key: "swap".into(),
        name: "Token Swap".into(),
        method: "wallet_sendCalls".into(),
        outcome: Outcome::Success {
            result: json!({ "id": "0x1" }),
        },
    };
    let failed = ScenarioReport {
        key: "signMessage".into(),
        name: "Sign Message".into(),
        method: "signMessage".into(),
        outcome: Outcome::Failed {
            error: "rejected".into(),
            code: Some(4001),
        },
    };

    assert_eq!(
        serde_json::to_value(&success).expect("serializes"),
        json!({
            "key": "swap",
            "name": "Token Swap",
            "method": "wallet_sendCalls",
            "status": "success",
            "result": { "id": "0x1" }
        })
    );
    let failed = serde_json::to_value(&failed).expect("serializes");
    assert_eq!(failed["status"], "failed");
    assert_eq!(failed["code"], 4001);
}
