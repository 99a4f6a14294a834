use crate::helpers::{STEP_TIMEOUT, TEST_ACCOUNT, WALLET_HOST, WALLET_ORIGIN, next_request};

use wallet_sdk::adapter::{
    AdapterEvent, AdapterEventKind, RawTransactionSender, ReadyState, SignerAdapter,
};
use wallet_sdk::codec::WireTransaction;
use wallet_sdk::protocol::{Method, codes};
use wallet_sdk::transport::Host;
use wallet_sdk::transport::memory::{MemoryHost, RemoteEndpoint};
use wallet_sdk::{LiquidRouteAdapter, SdkError, WalletConfig, WalletError};

use std::cell::RefCell;
use std::pin::pin;
use std::rc::Rc;

use futures_util::poll;
use serde_json::json;
use tokio::time::timeout;

type EventLog = Rc<RefCell<Vec<AdapterEvent>>>;

fn adapter() -> (MemoryHost, LiquidRouteAdapter, RemoteEndpoint, EventLog) {
    let host = MemoryHost::new();
    let shared: Rc<dyn Host> = Rc::new(host.clone());
    let adapter = LiquidRouteAdapter::new(WalletConfig::new().with_host(WALLET_HOST), shared);
    let remote = host.remote(WALLET_ORIGIN);

    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    for kind in [
        AdapterEventKind::Connect,
        AdapterEventKind::Disconnect,
        AdapterEventKind::Error,
    ] {
        let log = Rc::clone(&log);
        adapter.on(kind, move |event: &AdapterEvent| log.borrow_mut().push(event.clone()));
    }

    (host, adapter, remote, log)
}

async fn connect_adapter(host: &MemoryHost, adapter: &LiquidRouteAdapter, remote: &RemoteEndpoint) {
    let mut connecting = pin!(adapter.connect());
    assert!(poll!(connecting.as_mut()).is_pending());
    assert!(adapter.connecting());

    remote.signal_ready();
    let request = next_request(host).await;
    assert_eq!(request.method, Method::Connect);
    remote.respond_ok(&request, json!({ "account": TEST_ACCOUNT }));

    timeout(STEP_TIMEOUT, connecting)
        .await
        .expect("Connect timed out")
        .expect("Connect should succeed");
}

/// Test sender that records what it was asked to broadcast.
struct RecordingSender {
    sent: RefCell<Vec<Vec<u8>>>,
    fail_with: Option<String>,
}

impl RecordingSender {
    fn new() -> Self {
        Self {
            sent: RefCell::new(Vec::new()),
            fail_with: None,
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            sent: RefCell::new(Vec::new()),
            fail_with: Some(message.to_string()),
        }
    }
}

impl RawTransactionSender for RecordingSender {
    type Signature = String;
    type Error = String;

    async fn send_raw_transaction(&self, bytes: Vec<u8>) -> Result<String, String> {
        self.sent.borrow_mut().push(bytes);
        match &self.fail_with {
            Some(message) => Err(message.clone()),
            None => Ok("5igSig".to_string()),
        }
    }
}

#[tokio::test]
async fn given_new_adapter_when_inspected_then_loadable_and_nothing_created() {
    let (host, adapter, _remote, log) = adapter();

    assert_eq!(adapter.name(), "LiquidRoute Wallet");
    assert_eq!(adapter.url(), "https://wallet.liquidroute.com");
    assert_eq!(adapter.ready_state(), ReadyState::Loadable);
    assert!(!adapter.connected());
    assert!(!adapter.connecting());
    assert!(!adapter.supports_versioned_transactions());
    assert!(adapter.wallet().is_none());
    assert_eq!(host.frames_created(), 0);
    assert!(log.borrow().is_empty());
}

/// **VALUE**: Verifies connect flips the adapter to installed and emits exactly one event.
///
/// **WHY THIS MATTERS**: Adapter frameworks update their wallet pickers from
/// these events; a duplicate connect event re-runs the app's login flow.
///
/// **BUG THIS CATCHES**: Would catch the adapter and wallet each emitting
/// their own connect event.
#[tokio::test]
async fn given_adapter_when_connected_then_installed_with_single_connect_event() {
    // GIVEN: A fresh adapter
    let (host, adapter, remote, log) = adapter();

    // WHEN: Connecting
    connect_adapter(&host, &adapter, &remote).await;

    // THEN: Connected, installed and one event
    assert!(adapter.connected());
    assert!(!adapter.connecting());
    assert_eq!(adapter.ready_state(), ReadyState::Installed);
    assert_eq!(adapter.account().map(|a| a.to_string()), Some("ABC".into()));
    assert_eq!(
        *log.borrow(),
        vec![AdapterEvent::Connect(TEST_ACCOUNT.into())]
    );

    // WHEN: Connecting again
    adapter.connect().await.expect("no-op");

    // THEN: No second round trip or event
    assert_eq!(host.posted_requests().len(), 1);
    assert_eq!(log.borrow().len(), 1);
}

#[tokio::test]
async fn given_unconnected_adapter_when_signing_then_not_connected_without_wallet() {
    let (host, adapter, _remote, _log) = adapter();

    let result = adapter.sign_message(b"hello").await;

    assert!(matches!(
        result,
        Err(SdkError::Wallet(WalletError::NotConnected { .. }))
    ));
    assert!(adapter.wallet().is_none());
    assert_eq!(host.frames_created(), 0);
}

/// **VALUE**: Verifies a rejected connect is reported both as a result and an error event.
///
/// **WHY THIS MATTERS**: Frameworks surface adapter errors through the event,
/// while the awaiting caller needs the code to decide whether to retry.
///
/// **BUG THIS CATCHES**: Would catch `connecting` stuck at true after a failure.
#[tokio::test]
async fn given_adapter_when_connect_rejected_then_error_event_and_still_loadable() {
    // GIVEN: A pending adapter connect
    let (host, adapter, remote, log) = adapter();
    let mut connecting = pin!(adapter.connect());
    assert!(poll!(connecting.as_mut()).is_pending());

    // WHEN: The user rejects
    remote.signal_ready();
    let request = next_request(&host).await;
    remote.respond_err(&request, codes::USER_REJECTED, "User rejected the request");

    // THEN: Error result, error event, flags reset
    let error = timeout(STEP_TIMEOUT, connecting)
        .await
        .expect("timely")
        .expect_err("rejected");
    assert_eq!(error.as_wallet().and_then(WalletError::code), Some(4001));
    assert!(!adapter.connecting());
    assert!(!adapter.connected());
    assert_eq!(adapter.ready_state(), ReadyState::Loadable);

    let log = log.borrow();
    assert_eq!(log.len(), 1);
    assert!(matches!(&log[0], AdapterEvent::Error(message) if message.contains("User rejected")));
}

/// **VALUE**: Verifies send_transaction signs, then hands the signed bytes to the sender.
///
/// **WHY THIS MATTERS**: The bridge has no network access; broadcasting is the
/// caller's job and must receive the wallet's bytes, not the unsigned input.
///
/// **BUG THIS CATCHES**: Would catch the unsigned transaction being broadcast.
#[tokio::test]
async fn given_connected_adapter_when_send_transaction_then_signed_bytes_broadcast() {
    // GIVEN: A connected adapter and a recording sender
    let (host, adapter, remote, _log) = adapter();
    connect_adapter(&host, &adapter, &remote).await;
    let sender = RecordingSender::new();
    let transaction = WireTransaction::Legacy(vec![1, 2, 3]);

    // WHEN: Sending
    let mut sending = pin!(adapter.send_transaction(&transaction, &sender));
    assert!(poll!(sending.as_mut()).is_pending());
    let request = next_request(&host).await;
    assert_eq!(request.method, Method::SignTransaction);
    remote.respond_ok(&request, json!({ "signedTransaction": "BwgJ" }));

    // THEN: The signed bytes reached the sender and its signature is returned
    let signature = timeout(STEP_TIMEOUT, sending).await.expect("timely").expect("ok");
    assert_eq!(signature, "5igSig");
    assert_eq!(*sender.sent.borrow(), vec![vec![7, 8, 9]]);
}

#[tokio::test]
async fn given_failing_sender_when_send_transaction_then_send_error_event() {
    let (host, adapter, remote, log) = adapter();
    connect_adapter(&host, &adapter, &remote).await;
    let sender = RecordingSender::failing("blockhash not found");

    let transaction = WireTransaction::Legacy(vec![1]);
    let mut sending = pin!(adapter.send_transaction(&transaction, &sender));
    assert!(poll!(sending.as_mut()).is_pending());
    let request = next_request(&host).await;
    remote.respond_ok(&request, json!({ "signedTransaction": "AQ==" }));

    let error = timeout(STEP_TIMEOUT, sending)
        .await
        .expect("timely")
        .expect_err("sender failed");
    assert!(matches!(error, SdkError::Send { ref message, .. } if message == "blockhash not found"));
    assert!(matches!(log.borrow().last(), Some(AdapterEvent::Error(_))));
}

/// **VALUE**: Verifies disconnect tears the wallet down and emits a single event.
///
/// **WHY THIS MATTERS**: The next connect must start from a fresh wallet, and
/// apps log the user out on the disconnect event.
///
/// **BUG THIS CATCHES**: Would catch a duplicate disconnect event (one from the
/// wallet, one from the adapter) or a leaked wallet frame.
#[tokio::test]
async fn given_connected_adapter_when_disconnect_then_loadable_and_wallet_released() {
    // GIVEN: A connected adapter
    let (host, adapter, remote, log) = adapter();
    connect_adapter(&host, &adapter, &remote).await;

    // WHEN: Disconnecting and the wallet acknowledges
    let mut disconnecting = pin!(adapter.disconnect());
    assert!(poll!(disconnecting.as_mut()).is_pending());
    let request = next_request(&host).await;
    assert_eq!(request.method, Method::Disconnect);
    remote.respond_ok(&request, json!(null));
    timeout(STEP_TIMEOUT, disconnecting)
        .await
        .expect("timely")
        .expect("disconnects");

    // THEN: Back to loadable with the wallet released
    assert!(!adapter.connected());
    assert!(adapter.wallet().is_none());
    assert_eq!(adapter.ready_state(), ReadyState::Loadable);
    assert_eq!(host.live_frames(), 0);
    assert_eq!(host.listener_count(), 0);

    let disconnects = log
        .borrow()
        .iter()
        .filter(|event| matches!(event, AdapterEvent::Disconnect))
        .count();
    assert_eq!(disconnects, 1);
}

#[tokio::test]
async fn given_unconnected_adapter_when_disconnect_then_ok_without_events() {
    let (_host, adapter, _remote, log) = adapter();

    adapter.disconnect().await.expect("nothing to do");

    assert!(log.borrow().is_empty());
    assert_eq!(adapter.ready_state(), ReadyState::Loadable);
}
