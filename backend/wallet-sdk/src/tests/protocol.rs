// Unit tests for wire shapes shared with the remote wallet

use crate::protocol::{
    ConnectResult, Envelope, Method, RpcRequest, RpcResponse, SignTransactionResult, Topic,
};

use serde_json::json;

/// **VALUE**: Verifies responses carrying the echoed request under either wire name parse.
///
/// **WHY THIS MATTERS**: The deployed wallet sends `_request`; older builds
/// sent `originatingRequest`. Rejecting either would hang every call.
///
/// **BUG THIS CATCHES**: Would catch a dropped serde alias.
#[test]
fn given_response_with_echoed_request_when_parsed_then_both_names_accepted() {
    for field in ["_request", "originatingRequest"] {
        let raw = json!({
            "id": "3",
            "result": { "signature": "c2ln" },
            field: { "id": "3", "method": "signMessage" }
        });

        let response: RpcResponse = serde_json::from_value(raw).expect("parses");

        let echoed = response.originating_request.expect("echoed request");
        assert_eq!(echoed.method, Method::SignMessage, "field {field}");
    }
}

#[test]
fn given_response_when_serialized_then_uses_underscore_request() {
    let request = RpcRequest {
        id: "1".into(),
        method: Method::Connect,
        params: None,
    };

    let value = serde_json::to_value(RpcResponse::success(&request, json!({}))).expect("serializes");

    assert!(value.get("_request").is_some());
    assert!(value.get("error").is_none());
}

/// **VALUE**: Verifies `error` wins over `result` when both are present.
///
/// **WHY THIS MATTERS**: The contract says presence of `error` means failure.
/// Treating it as success would report a rejected signature as signed.
///
/// **BUG THIS CATCHES**: Would catch outcome() checking `result` first.
#[test]
fn given_response_with_error_and_result_when_outcome_then_error() {
    let response: RpcResponse = serde_json::from_value(json!({
        "id": "1",
        "result": { "account": "A" },
        "error": { "code": 4001, "message": "User rejected" }
    }))
    .expect("parses");

    let outcome = response.outcome();

    assert_eq!(outcome.expect_err("error wins").code, 4001);
}

#[test]
fn given_method_names_when_parsed_then_catalogue_and_pass_through() {
    assert_eq!(Method::from("connect"), Method::Connect);
    assert_eq!(Method::from("signTransaction"), Method::SignTransaction);
    assert_eq!(
        Method::from("wallet_sendCalls"),
        Method::Other("wallet_sendCalls".into())
    );

    assert!(Method::Connect.is_interactive());
    assert!(Method::SignMessage.is_interactive());
    assert!(Method::SignTransaction.is_interactive());
    assert!(!Method::Disconnect.is_interactive());
    assert!(!Method::from("wallet_sendCalls").is_interactive());

    let request = RpcRequest {
        id: "9".into(),
        method: Method::from("wallet_sendCalls"),
        params: Some(json!({ "calls": [] })),
    };
    let value = serde_json::to_value(&request).expect("serializes");
    assert_eq!(value["method"], "wallet_sendCalls");
}

#[test]
fn given_connect_result_with_public_key_alias_when_parsed_then_account_set() {
    let legacy: ConnectResult =
        serde_json::from_value(json!({ "publicKey": "ABC" })).expect("alias");
    let current: ConnectResult = serde_json::from_value(json!({ "account": "ABC" })).expect("field");

    assert_eq!(legacy, current);
    assert_eq!(current.account.as_str(), "ABC");
}

#[test]
fn given_sign_transaction_result_when_parsed_then_camel_case_field() {
    let result: SignTransactionResult =
        serde_json::from_value(json!({ "signedTransaction": "AQID" })).expect("parses");

    assert_eq!(result.signed_transaction, "AQID");
}

#[test]
fn given_envelopes_when_inspected_then_topic_and_request_id() {
    let request = RpcRequest {
        id: "12".into(),
        method: Method::Connect,
        params: None,
    };
    let envelope = Envelope::request(&request).expect("serializes");

    assert_eq!(envelope.topic(), Some(Topic::RpcRequest));
    assert_eq!(envelope.request_id(), Some("12"));
    assert_eq!(Envelope::ready().request_id(), None);

    let unknown: Envelope = serde_json::from_value(json!({ "topic": "telemetry" })).expect("parses");
    assert_eq!(unknown.topic(), None);
    assert!(unknown.payload.is_null());
}
