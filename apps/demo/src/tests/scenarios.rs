// Unit tests for the scenario book

use crate::error::DemoError;
use crate::scenarios::{Action, ScenarioBook};

use wallet_sdk::protocol::Method;

use serde_json::json;

/// **VALUE**: Verifies the shipped book parses and covers every demo flow.
///
/// **WHY THIS MATTERS**: The book is compiled into the binary; a TOML typo
/// would only surface when someone runs the demo.
///
/// **BUG THIS CATCHES**: Would catch a broken table header or a scenario
/// using a method the runner cannot carry out.
#[test]
fn given_built_in_book_when_parsed_then_all_scenarios_present() {
    // WHEN: Parsing the embedded book
    let book = ScenarioBook::built_in().expect("built-in book parses");

    // THEN: All seven scenarios, in file order
    let keys: Vec<&str> = book.scenarios().iter().map(|s| s.key.as_str()).collect();
    assert_eq!(
        keys,
        vec!["swap", "nftMint", "payment", "transfer", "signMessage", "defi", "stake"]
    );
}

#[test]
fn given_swap_scenario_when_action_built_then_send_calls_batch() {
    let book = ScenarioBook::built_in().expect("parses");
    let swap = book.get("swap").expect("swap scenario");

    let (method, params) = match swap.action().expect("valid") {
        Action::Request { method, params } => (method, params),
        other => panic!("Expected a pass-through request, got {other:?}"),
    };
    assert_eq!(method, Method::Other("wallet_sendCalls".into()));
    assert_eq!(params[0]["method"], "wallet_sendCalls");
    assert_eq!(params[0]["metadata"]["type"], "swap");
    assert_eq!(params[0]["metadata"]["fromToken"]["symbol"], "SOL");
    assert_eq!(
        params[0]["calls"],
        json!([{ "programId": "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4", "accounts": [] }])
    );
}

#[test]
fn given_typed_scenarios_when_action_built_then_bytes_prepared() {
    let book = ScenarioBook::built_in().expect("parses");

    let sign = book.get("signMessage").expect("exists").action().expect("valid");
    let transfer = book.get("transfer").expect("exists").action().expect("valid");

    match sign {
        Action::SignMessage(bytes) => assert!(bytes.starts_with(b"Welcome to LiquidRoute!")),
        other => panic!("Expected SignMessage, got {other:?}"),
    }
    assert_eq!(transfer, Action::SignTransaction(vec![0; 100]));
}

#[test]
fn given_duplicate_keys_when_parsed_then_scenario_error() {
    let contents = r#"
        [[scenario]]
        key = "a"
        name = "A"
        description = "first"
        method = "wallet_sendCalls"

        [[scenario]]
        key = "a"
        name = "A again"
        description = "second"
        method = "wallet_sendCalls"
    "#;

    let result = ScenarioBook::parse(contents);

    assert!(matches!(result, Err(DemoError::Scenario { ref message, .. }) if message.contains("Duplicate")));
}

/// **VALUE**: Verifies scenarios that cannot run are rejected at load time.
///
/// **BUG THIS CATCHES**: Would catch a `signMessage` scenario without text
/// reaching the wallet as an empty message, or a scenario calling `connect`
/// behind the session's back.
#[test]
fn given_unrunnable_scenarios_when_parsed_then_rejected() {
    let missing_message = r#"
        [[scenario]]
        key = "sign"
        name = "Sign"
        description = "no text"
        method = "signMessage"
    "#;
    let reserved = r#"
        [[scenario]]
        key = "login"
        name = "Login"
        description = "reserved"
        method = "connect"
    "#;

    assert!(matches!(
        ScenarioBook::parse(missing_message),
        Err(DemoError::Scenario { .. })
    ));
    assert!(matches!(
        ScenarioBook::parse(reserved),
        Err(DemoError::Scenario { .. })
    ));
    assert!(matches!(
        ScenarioBook::parse("[[scenario]]\nkey = 1"),
        Err(DemoError::Scenario { .. })
    ));
}

#[test]
fn given_book_when_selecting_then_order_follows_request() {
    let book = ScenarioBook::built_in().expect("parses");

    let picked = book
        .select(&["stake".to_string(), "swap".to_string()])
        .expect("known keys");
    let all = book.select(&[]).expect("all");

    assert_eq!(picked[0].key, "stake");
    assert_eq!(picked[1].key, "swap");
    assert_eq!(all.len(), 7);
    assert!(book.select(&["bogus".to_string()]).is_err());
}

#[test]
fn given_book_on_disk_when_loaded_then_parsed() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("scenarios.toml");
    std::fs::write(
        &path,
        "[[scenario]]\nkey = \"only\"\nname = \"Only\"\ndescription = \"x\"\nmethod = \"wallet_getCapabilities\"\n",
    )
    .expect("write");

    let book = ScenarioBook::load(&path).expect("loads");

    assert_eq!(book.scenarios().len(), 1);
    assert!(ScenarioBook::load(&dir.path().join("missing.toml")).is_err());
}
