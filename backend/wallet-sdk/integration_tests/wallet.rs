use crate::helpers::{
    STEP_TIMEOUT, TEST_ACCOUNT, WALLET_ORIGIN, connect, embedded_wallet, next_request,
};

use wallet_sdk::codec::WireTransaction;
use wallet_sdk::dialog::Visibility;
use wallet_sdk::protocol::{Envelope, Method, RpcResponse, codes};
use wallet_sdk::transport::TransportKind;
use wallet_sdk::{EventKind, WalletError, WalletEvent};

use std::cell::RefCell;
use std::pin::pin;
use std::rc::Rc;
use std::task::Poll;

use futures_util::poll;
use serde_json::json;
use tokio::time::timeout;

/// **VALUE**: Verifies the complete happy path: connect, then sign "Hi".
///
/// **WHY THIS MATTERS**: This is what every integrating app does first. It
/// exercises lazy frame creation, the ready handshake, correlation, base64
/// encoding and session state in one flow.
///
/// **BUG THIS CATCHES**: Would catch any break in the request pipeline, a
/// wrong `display` hint, or signature bytes not being decoded.
#[tokio::test]
async fn given_fresh_wallet_when_connect_then_sign_message_then_round_trips() {
    // GIVEN: A fresh embedded wallet
    let (host, wallet, remote) = embedded_wallet();
    assert_eq!(wallet.transport_kind(), TransportKind::Embedded);
    assert_eq!(host.frames_created(), 0, "Nothing created before first use");

    // WHEN: Connecting as "ABC"
    let account = connect(&host, &wallet, &remote, TEST_ACCOUNT).await;

    // THEN: Session is set and the dialog closed again
    assert_eq!(account.as_str(), TEST_ACCOUNT);
    assert!(wallet.is_connected());
    assert_eq!(wallet.account().map(|a| a.to_string()), Some("ABC".into()));
    assert_eq!(wallet.dialog_visibility(), Visibility::Closed);

    // WHEN: Signing [72, 105] ("Hi")
    let mut signing = pin!(wallet.sign_message(&[72, 105]));
    assert!(poll!(signing.as_mut()).is_pending());
    assert_eq!(wallet.dialog_visibility(), Visibility::Open);

    let request = next_request(&host).await;
    assert_eq!(request.method, Method::SignMessage);
    assert_eq!(
        request.params,
        Some(json!({ "message": "SGk=", "display": "utf8" }))
    );
    remote.respond_ok(&request, json!({ "signature": "AQID" }));

    // THEN: Signature bytes come back decoded and the dialog closes
    let signature = timeout(STEP_TIMEOUT, signing)
        .await
        .expect("sign timed out")
        .expect("sign succeeds");
    assert_eq!(signature, vec![1, 2, 3]);
    assert_eq!(wallet.dialog_visibility(), Visibility::Closed);
    assert_eq!(host.frames_created(), 1);
    assert!(host
        .posted()
        .iter()
        .all(|message| message.target_origin == WALLET_ORIGIN));
}

/// **VALUE**: Verifies a second connect is served from the session.
///
/// **WHY THIS MATTERS**: Adapter frameworks call connect on every page
/// render. Each extra round trip would pop the wallet open again.
///
/// **BUG THIS CATCHES**: Would catch connect ignoring the cached account.
#[tokio::test]
async fn given_connected_wallet_when_connect_again_then_no_round_trip() {
    // GIVEN: A connected wallet
    let (host, wallet, remote) = embedded_wallet();
    connect(&host, &wallet, &remote, TEST_ACCOUNT).await;
    assert_eq!(host.posted_requests().len(), 1);

    // WHEN: Connecting again
    let mut again = pin!(wallet.connect());
    let result = poll!(again.as_mut());

    // THEN: Resolved immediately, nothing posted, dialog untouched
    match result {
        Poll::Ready(Ok(account)) => assert_eq!(account.as_str(), TEST_ACCOUNT),
        other => panic!("Expected immediate account, got {other:?}"),
    }
    assert_eq!(host.posted_requests().len(), 1);
    assert_eq!(wallet.dialog_visibility(), Visibility::Closed);
}

/// **VALUE**: Verifies signing and disconnect fail locally when not connected.
///
/// **WHY THIS MATTERS**: Showing the wallet for a request it will refuse is
/// confusing; apps rely on the error to show their own connect button.
///
/// **BUG THIS CATCHES**: Would catch preconditions checked after the dialog
/// opens, or checked only by the remote side.
#[tokio::test]
async fn given_unconnected_wallet_when_signing_or_disconnecting_then_not_connected_immediately() {
    // GIVEN: A fresh wallet
    let (host, wallet, _remote) = embedded_wallet();

    // WHEN / THEN: Each operation is ready on first poll with NotConnected
    let mut sign_message = pin!(wallet.sign_message(b"hello"));
    assert!(matches!(
        poll!(sign_message.as_mut()),
        Poll::Ready(Err(WalletError::NotConnected { .. }))
    ));

    let transaction = WireTransaction::Legacy(vec![1, 2, 3]);
    let mut sign_transaction = pin!(wallet.sign_transaction(&transaction));
    assert!(matches!(
        poll!(sign_transaction.as_mut()),
        Poll::Ready(Err(WalletError::NotConnected { .. }))
    ));

    let mut sign_all = pin!(wallet.sign_all_transactions(std::slice::from_ref(&transaction)));
    assert!(matches!(
        poll!(sign_all.as_mut()),
        Poll::Ready(Err(WalletError::NotConnected { .. }))
    ));

    let mut disconnect = pin!(wallet.disconnect());
    assert!(matches!(
        poll!(disconnect.as_mut()),
        Poll::Ready(Err(WalletError::NotConnected { .. }))
    ));

    // THEN: No dialog, no posts
    assert_eq!(host.frames_created(), 0);
    assert!(host.posted().is_empty());
    assert_eq!(wallet.dialog_visibility(), Visibility::Closed);
}

/// **VALUE**: Verifies a user rejection closes the dialog and keeps the wallet's code.
///
/// **WHY THIS MATTERS**: Rejection is the most common failure. The dialog
/// must not stay on screen, and the app needs 4001 to tell it apart from errors.
///
/// **BUG THIS CATCHES**: Would catch the dialog only closing on success, or
/// a session set from a failed connect.
#[tokio::test]
async fn given_connect_pending_when_wallet_rejects_then_error_and_dialog_closed() {
    // GIVEN: A pending connect with the dialog open
    let (host, wallet, remote) = embedded_wallet();
    let mut connecting = pin!(wallet.connect());
    assert!(poll!(connecting.as_mut()).is_pending());
    assert_eq!(wallet.dialog_visibility(), Visibility::Open);
    assert!(host.frame_visible());

    // WHEN: The wallet rejects
    remote.signal_ready();
    let request = next_request(&host).await;
    remote.respond_err(&request, codes::USER_REJECTED, "User rejected the request");

    // THEN: Remote error surfaces verbatim, no session, dialog closed
    let error = timeout(STEP_TIMEOUT, connecting)
        .await
        .expect("connect timed out")
        .expect_err("rejected");
    assert_eq!(error.code(), Some(4001));
    assert_eq!(error.remote_message(), Some("User rejected the request"));
    assert!(!wallet.is_connected());
    assert_eq!(wallet.dialog_visibility(), Visibility::Closed);
    assert!(!host.frame_visible());
}

/// **VALUE**: Verifies responses are matched by id even when they arrive out of order.
///
/// **WHY THIS MATTERS**: A background pass-through call can finish while the
/// user is still reading a signing prompt.
///
/// **BUG THIS CATCHES**: Would catch the wallet resolving the oldest pending
/// request instead of the matching one.
#[tokio::test]
async fn given_two_pending_requests_when_answered_in_reverse_then_each_resolves_correctly() {
    // GIVEN: A connected wallet with a signing and a pass-through request in flight
    let (host, wallet, remote) = embedded_wallet();
    connect(&host, &wallet, &remote, TEST_ACCOUNT).await;

    let mut signing = pin!(wallet.sign_message(b"a"));
    let mut custom = pin!(wallet.request("wallet_getCapabilities", Some(json!({}))));
    assert!(poll!(signing.as_mut()).is_pending());
    assert!(poll!(custom.as_mut()).is_pending());

    let sign_request = next_request(&host).await;
    let custom_request = next_request(&host).await;
    assert_eq!(sign_request.method, Method::SignMessage);
    assert_eq!(
        custom_request.method,
        Method::Other("wallet_getCapabilities".into())
    );
    assert_ne!(sign_request.id, custom_request.id);

    // WHEN: The later request is answered first
    remote.respond_ok(&custom_request, json!({ "atomic": true }));
    remote.respond_ok(&sign_request, json!({ "signature": "BAU=" }));

    // THEN: Each caller gets its own payload
    let capabilities = timeout(STEP_TIMEOUT, custom).await.expect("timely").expect("ok");
    let signature = timeout(STEP_TIMEOUT, signing).await.expect("timely").expect("ok");
    assert_eq!(capabilities, json!({ "atomic": true }));
    assert_eq!(signature, vec![4, 5]);
    assert_eq!(wallet.pending_requests(), 0);
}

/// **VALUE**: Verifies a correctly-shaped response from another origin never resolves.
///
/// **WHY THIS MATTERS**: Request ids are small sequential numbers; any page
/// could guess one and forge an approval.
///
/// **BUG THIS CATCHES**: Would catch origin checks applied only to some topics.
#[tokio::test]
async fn given_pending_connect_when_foreign_origin_answers_then_stays_pending() {
    // GIVEN: A pending connect whose request has been posted
    let (host, wallet, remote) = embedded_wallet();
    let mut connecting = pin!(wallet.connect());
    assert!(poll!(connecting.as_mut()).is_pending());
    remote.signal_ready();
    let request = next_request(&host).await;

    // WHEN: An attacker origin answers with the right id
    let attacker = host.remote("https://wallet.liquidroute.com.evil.example");
    attacker.respond_ok(&request, json!({ "account": "EVIL" }));

    // THEN: Still pending, not connected
    assert!(poll!(connecting.as_mut()).is_pending());
    assert!(!wallet.is_connected());

    // WHEN: The real wallet answers
    remote.respond_ok(&request, json!({ "account": TEST_ACCOUNT }));

    // THEN: The genuine account wins
    let account = timeout(STEP_TIMEOUT, connecting).await.expect("timely").expect("ok");
    assert_eq!(account.as_str(), TEST_ACCOUNT);
}

/// **VALUE**: Verifies requests queued before `ready` go out in call order.
///
/// **WHY THIS MATTERS**: The wallet processes requests in arrival order; a
/// reordered queue could sign before the user has connected.
///
/// **BUG THIS CATCHES**: Would catch a queue drained in reverse or sends that
/// overtake queued ones.
#[tokio::test]
async fn given_requests_before_ready_when_ready_then_posted_in_order_and_later_ones_immediately() {
    // GIVEN: Two pass-through requests issued before the wallet is ready
    let (host, wallet, remote) = embedded_wallet();
    let mut first = pin!(wallet.request("first", None));
    let mut second = pin!(wallet.request("second", None));
    assert!(poll!(first.as_mut()).is_pending());
    assert!(poll!(second.as_mut()).is_pending());
    assert!(host.posted().is_empty());

    // WHEN: Ready arrives, then a third request is issued
    remote.signal_ready();
    let mut third = pin!(wallet.request("third", None));
    assert!(poll!(third.as_mut()).is_pending());

    // THEN: Posted in call order
    let methods: Vec<String> = host
        .posted_requests()
        .iter()
        .map(|request| request.method.to_string())
        .collect();
    assert_eq!(methods, vec!["first", "second", "third"]);
    assert!(wallet.is_ready());
}

/// **VALUE**: Verifies disconnect is a background call that clears the session.
///
/// **WHY THIS MATTERS**: Logging out should not flash the wallet UI, and the
/// app's disconnect listeners drive its own logout.
///
/// **BUG THIS CATCHES**: Would catch disconnect opening the dialog, or the
/// session and event not following the response.
#[tokio::test]
async fn given_connected_wallet_when_disconnect_then_background_request_clears_session() {
    // GIVEN: A connected wallet with a disconnect listener
    let (host, wallet, remote) = embedded_wallet();
    connect(&host, &wallet, &remote, TEST_ACCOUNT).await;
    let disconnects = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&disconnects);
    wallet.on(EventKind::Disconnect, move |_| *counter.borrow_mut() += 1);

    // WHEN: Disconnecting
    let mut disconnecting = pin!(wallet.disconnect());
    assert!(poll!(disconnecting.as_mut()).is_pending());

    // THEN: The dialog never opened
    assert_eq!(wallet.dialog_visibility(), Visibility::Closed);
    assert!(!host.frame_visible());

    let request = next_request(&host).await;
    assert_eq!(request.method, Method::Disconnect);
    remote.respond_ok(&request, json!(null));

    timeout(STEP_TIMEOUT, disconnecting)
        .await
        .expect("timely")
        .expect("disconnects");
    assert!(!wallet.is_connected());
    assert_eq!(wallet.account(), None);
    assert_eq!(*disconnects.borrow(), 1);
}

/// **VALUE**: Verifies subscribers see connect with the account and can unsubscribe.
///
/// **WHY THIS MATTERS**: UI state (header avatar, balances) hangs off these
/// events rather than polling `is_connected`.
///
/// **BUG THIS CATCHES**: Would catch events fired before the session is set,
/// or `off` not removing the handler.
#[tokio::test]
async fn given_connect_listener_when_connected_then_notified_once_and_off_works() {
    // GIVEN: Two connect listeners, one removed again
    let (host, wallet, remote) = embedded_wallet();
    let seen: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

    let kept = Rc::clone(&seen);
    wallet.on(EventKind::Connect, move |event| {
        if let WalletEvent::Connect(account) = event {
            kept.borrow_mut().push(format!("kept:{account}"));
        }
    });
    let removed = Rc::clone(&seen);
    let id = wallet.on(EventKind::Connect, move |_| {
        removed.borrow_mut().push("removed".into());
    });
    assert!(wallet.off(id));

    // WHEN: Connecting
    connect(&host, &wallet, &remote, TEST_ACCOUNT).await;

    // THEN: Only the kept listener ran, once
    assert_eq!(*seen.borrow(), vec!["kept:ABC".to_string()]);
}

/// **VALUE**: Verifies a backdrop click fails the pending interactive call.
///
/// **WHY THIS MATTERS**: Without this, an app awaiting `connect()` hangs
/// forever after the user clicks away.
///
/// **BUG THIS CATCHES**: Would catch dismissal that only hides the overlay.
#[tokio::test]
async fn given_pending_connect_when_backdrop_clicked_then_dismissed_error() {
    // GIVEN: A pending connect with a visible dialog
    let (host, wallet, _remote) = embedded_wallet();
    let mut connecting = pin!(wallet.connect());
    assert!(poll!(connecting.as_mut()).is_pending());

    // WHEN: The user clicks the backdrop
    assert!(host.click_backdrop());

    // THEN: The call fails with Dismissed and the dialog is closed
    let result = timeout(STEP_TIMEOUT, connecting).await.expect("timely");
    assert!(matches!(result, Err(WalletError::Dismissed { .. })));
    assert_eq!(wallet.dialog_visibility(), Visibility::Closed);
    assert_eq!(wallet.pending_requests(), 0);
}

#[tokio::test]
async fn given_pending_sign_when_wallet_sends_close_then_dismissed_error() {
    let (host, wallet, remote) = embedded_wallet();
    connect(&host, &wallet, &remote, TEST_ACCOUNT).await;
    let mut signing = pin!(wallet.sign_message(b"x"));
    assert!(poll!(signing.as_mut()).is_pending());

    remote.request_close();

    let result = timeout(STEP_TIMEOUT, signing).await.expect("timely");
    assert!(matches!(result, Err(WalletError::Dismissed { .. })));
    assert!(wallet.is_connected(), "Dismissal does not end the session");
}

/// **VALUE**: Verifies destroy releases the page and settles pending callers.
///
/// **WHY THIS MATTERS**: SPA route changes destroy the bridge; leaked
/// overlays or listeners accumulate, and hung futures leak their tasks.
///
/// **BUG THIS CATCHES**: Would catch pending callers never completing, or
/// a destroyed wallet that can still open the dialog.
#[tokio::test]
async fn given_connected_wallet_with_pending_call_when_destroyed_then_everything_released() {
    // GIVEN: A connected wallet, a disconnect listener and a pending sign
    let (host, wallet, remote) = embedded_wallet();
    connect(&host, &wallet, &remote, TEST_ACCOUNT).await;
    let events = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&events);
    wallet.on(EventKind::Disconnect, move |_| *counter.borrow_mut() += 1);

    let mut signing = pin!(wallet.sign_message(b"x"));
    assert!(poll!(signing.as_mut()).is_pending());
    let _sign_request = next_request(&host).await;

    // WHEN: Destroyed
    wallet.destroy();

    // THEN: Disconnect notice posted, event emitted once, page cleaned up
    let disconnect = next_request(&host).await;
    assert_eq!(disconnect.method, Method::Disconnect);
    assert_eq!(*events.borrow(), 1);
    assert!(!wallet.is_connected());
    assert!(wallet.is_destroyed());
    assert_eq!(host.live_frames(), 0);
    assert_eq!(host.listener_count(), 0);

    // THEN: The pending caller is abandoned, later calls are refused
    let result = timeout(STEP_TIMEOUT, signing).await.expect("timely");
    assert!(matches!(result, Err(WalletError::Abandoned { .. })));
    assert!(matches!(
        wallet.connect().await,
        Err(WalletError::Destroyed { .. })
    ));
    assert!(matches!(
        wallet.sign_message(b"y").await,
        Err(WalletError::Destroyed { .. })
    ));

    // THEN: A second destroy is a no-op
    wallet.destroy();
    assert_eq!(*events.borrow(), 1);
}

/// **VALUE**: Verifies transactions travel as base64 and come back through the seam.
///
/// **WHY THIS MATTERS**: The bridge never parses transactions; it must hand
/// the exact signed bytes back to the caller's type.
///
/// **BUG THIS CATCHES**: Would catch the wrong field name (`signedTransaction`)
/// or the input bytes being returned instead of the signed ones.
#[tokio::test]
async fn given_connected_wallet_when_sign_transaction_then_returns_signed_bytes() {
    // GIVEN: A connected wallet
    let (host, wallet, remote) = embedded_wallet();
    connect(&host, &wallet, &remote, TEST_ACCOUNT).await;

    // WHEN: Signing a legacy transaction
    let transaction = WireTransaction::Legacy(vec![1, 2, 3]);
    let mut signing = pin!(wallet.sign_transaction(&transaction));
    assert!(poll!(signing.as_mut()).is_pending());

    let request = next_request(&host).await;
    assert_eq!(request.method, Method::SignTransaction);
    assert_eq!(request.params, Some(json!({ "transaction": "AQID" })));
    remote.respond_ok(&request, json!({ "signedTransaction": "CQkJ" }));

    // THEN: The signed bytes come back as a legacy transaction
    let signed = timeout(STEP_TIMEOUT, signing).await.expect("timely").expect("ok");
    assert_eq!(signed, WireTransaction::Legacy(vec![9, 9, 9]));
}

#[tokio::test]
async fn given_versioned_transaction_when_signing_then_unsupported_without_round_trip() {
    let (host, wallet, remote) = embedded_wallet();
    connect(&host, &wallet, &remote, TEST_ACCOUNT).await;

    let result = wallet
        .sign_transaction(&WireTransaction::Versioned(vec![0x80]))
        .await;

    assert!(matches!(result, Err(WalletError::Unsupported { .. })));
    assert_eq!(host.posted_requests().len(), 1, "Only the connect request");
    assert_eq!(wallet.dialog_visibility(), Visibility::Closed);
}

/// **VALUE**: Verifies sign-all sends one request at a time and keeps order.
///
/// **WHY THIS MATTERS**: The wallet shows one approval at a time; parallel
/// requests would stack prompts the user cannot map to transactions.
///
/// **BUG THIS CATCHES**: Would catch a concurrent fan-out or reordered results.
#[tokio::test]
async fn given_two_transactions_when_sign_all_then_sequential_and_ordered() {
    // GIVEN: A connected wallet
    let (host, wallet, remote) = embedded_wallet();
    connect(&host, &wallet, &remote, TEST_ACCOUNT).await;
    let transactions = [
        WireTransaction::Legacy(vec![1]),
        WireTransaction::Legacy(vec![2]),
    ];

    // WHEN: Signing both
    let mut signing = pin!(wallet.sign_all_transactions(&transactions));
    assert!(poll!(signing.as_mut()).is_pending());

    // THEN: Only the first request is in flight
    let first = next_request(&host).await;
    assert_eq!(first.params, Some(json!({ "transaction": "AQ==" })));
    assert_eq!(wallet.pending_requests(), 1);
    remote.respond_ok(&first, json!({ "signedTransaction": "Cw==" }));

    assert!(poll!(signing.as_mut()).is_pending());
    let second = next_request(&host).await;
    assert_eq!(second.params, Some(json!({ "transaction": "Ag==" })));
    remote.respond_ok(&second, json!({ "signedTransaction": "DA==" }));

    let signed = timeout(STEP_TIMEOUT, signing).await.expect("timely").expect("ok");
    assert_eq!(
        signed,
        vec![
            WireTransaction::Legacy(vec![11]),
            WireTransaction::Legacy(vec![12])
        ]
    );
}

#[tokio::test]
async fn given_unknown_response_id_when_delivered_then_ignored() {
    let (host, wallet, remote) = embedded_wallet();
    connect(&host, &wallet, &remote, TEST_ACCOUNT).await;

    remote.send(
        &Envelope::response(&RpcResponse {
            id: "999".into(),
            result: Some(json!({ "account": "EVIL" })),
            error: None,
            originating_request: None,
        })
        .expect("serializes"),
    );

    assert_eq!(wallet.account().map(|a| a.to_string()), Some("ABC".into()));
    assert_eq!(wallet.pending_requests(), 0);
}
