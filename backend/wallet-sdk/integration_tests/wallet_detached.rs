use crate::helpers::{
    STEP_TIMEOUT, TEST_ACCOUNT, WALLET_HOST, WALLET_ORIGIN, connect, detached_wallet,
    next_request, wallet_on,
};

use wallet_sdk::WalletConfig;
use wallet_sdk::dialog::Visibility;
use wallet_sdk::protocol::Method;
use wallet_sdk::transport::TransportKind;
use wallet_sdk::transport::memory::MemoryHost;

use std::pin::pin;

use futures_util::poll;
use serde_json::json;
use tokio::time::timeout;

#[tokio::test]
async fn given_prefer_popup_when_connect_then_named_popup_opened() {
    let (host, wallet, remote) = detached_wallet();
    assert_eq!(wallet.transport_kind(), TransportKind::Detached);
    assert_eq!(host.windows_opened(), 0);

    connect(&host, &wallet, &remote, TEST_ACCOUNT).await;

    let spec = host.window_spec().expect("popup opened");
    assert_eq!(spec.name, "liquidroute-wallet");
    assert_eq!(spec.url.as_str(), "https://wallet.liquidroute.com/wallet");
    assert_eq!(host.frames_created(), 0, "Detached never mounts a frame");
    assert!(!host.window_open(), "Popup closes once the call resolves");
}

/// **VALUE**: Verifies every reopened popup is a fresh document that must say `ready` again.
///
/// **WHY THIS MATTERS**: Closing the popup destroys its document. Posting into
/// the new window before its listener exists loses the request silently.
///
/// **BUG THIS CATCHES**: Would catch the gate staying open across popups.
#[tokio::test]
async fn given_connected_detached_wallet_when_signing_then_waits_for_new_ready() {
    // GIVEN: A connected detached wallet (its popup closed again)
    let (host, wallet, remote) = detached_wallet();
    connect(&host, &wallet, &remote, TEST_ACCOUNT).await;
    let posted_before = host.posted().len();

    // WHEN: Signing reopens the popup
    let mut signing = pin!(wallet.sign_message(b"Hi"));
    assert!(poll!(signing.as_mut()).is_pending());

    // THEN: Nothing is posted until the new document is ready
    assert_eq!(host.windows_opened(), 2);
    assert!(host.window_open());
    assert_eq!(wallet.dialog_visibility(), Visibility::Open);
    assert!(!wallet.is_ready());
    assert_eq!(host.posted().len(), posted_before);

    remote.signal_ready();
    let request = next_request(&host).await;
    assert_eq!(request.method, Method::SignMessage);
    remote.respond_ok(&request, json!({ "signature": "AQ==" }));

    let signature = timeout(STEP_TIMEOUT, signing).await.expect("timely").expect("ok");
    assert_eq!(signature, vec![1]);
    assert!(!host.window_open());
}

/// **VALUE**: Verifies a blocked popup queues rather than fails.
///
/// **WHY THIS MATTERS**: Browsers block popups opened outside a click. The
/// request must survive until the next send manages to open the window.
///
/// **BUG THIS CATCHES**: Would catch a blocked popup rejecting the call, or
/// the queued request being lost when the window finally opens.
#[tokio::test]
async fn given_blocked_popup_when_connect_then_queued_until_window_opens() {
    // GIVEN: A page whose popups are blocked
    let host = MemoryHost::new().with_popups_blocked(true);
    let wallet = wallet_on(
        &host,
        WalletConfig::new()
            .with_host(WALLET_HOST)
            .with_prefer_popup(true),
    );
    let remote = host.remote(WALLET_ORIGIN);

    // WHEN: Connecting
    let mut connecting = pin!(wallet.connect());
    assert!(poll!(connecting.as_mut()).is_pending());

    // THEN: Still pending with nothing opened or posted
    assert_eq!(host.blocked_popups(), 1);
    assert_eq!(host.windows_opened(), 0);
    assert!(host.posted().is_empty());

    // WHEN: Popups are allowed and a background call opens the window
    host.set_popups_blocked(false);
    let mut capabilities = pin!(wallet.request("wallet_getCapabilities", None));
    assert!(poll!(capabilities.as_mut()).is_pending());
    assert_eq!(host.windows_opened(), 1);
    remote.signal_ready();

    // THEN: The queued connect goes first, then the background call
    let first = next_request(&host).await;
    let second = next_request(&host).await;
    assert_eq!(first.method, Method::Connect);
    assert_eq!(second.method, Method::Other("wallet_getCapabilities".into()));

    remote.respond_ok(&first, json!({ "account": TEST_ACCOUNT }));
    let account = timeout(STEP_TIMEOUT, connecting).await.expect("timely").expect("ok");
    assert_eq!(account.as_str(), TEST_ACCOUNT);
}

#[tokio::test]
async fn given_open_popup_when_another_interactive_call_then_focused_not_reopened() {
    let (host, wallet, _remote) = detached_wallet();
    let mut connecting = pin!(wallet.connect());
    assert!(poll!(connecting.as_mut()).is_pending());
    assert_eq!(host.window_focus_count(), 0);

    let mut second = pin!(wallet.request("signMessage", Some(json!({ "message": "AA==" }))));
    assert!(poll!(second.as_mut()).is_pending());

    assert_eq!(host.windows_opened(), 1);
    assert_eq!(host.window_focus_count(), 1);
}

/// **VALUE**: Verifies a popup closed by the user is reopened by the next send.
///
/// **WHY THIS MATTERS**: Browsers report no close event. The next call must
/// notice the dead window instead of posting into it.
///
/// **BUG THIS CATCHES**: Would catch posts to a closed window, which browsers
/// drop without error.
#[tokio::test]
async fn given_popup_closed_by_user_when_next_send_then_new_window_and_old_call_still_answerable() {
    // GIVEN: A connect posted to a popup the user then closes
    let (host, wallet, remote) = detached_wallet();
    let mut connecting = pin!(wallet.connect());
    assert!(poll!(connecting.as_mut()).is_pending());
    remote.signal_ready();
    let connect_request = next_request(&host).await;
    assert!(host.close_window_by_user());

    // WHEN: A background request is sent
    let mut capabilities = pin!(wallet.request("wallet_getCapabilities", None));
    assert!(poll!(capabilities.as_mut()).is_pending());

    // THEN: A second window opens and the request waits for its ready
    assert_eq!(host.windows_opened(), 2);
    assert!(!wallet.is_ready());
    remote.signal_ready();
    let request = next_request(&host).await;
    assert_eq!(request.method, Method::Other("wallet_getCapabilities".into()));

    // THEN: The first call still resolves by id
    remote.respond_ok(&connect_request, json!({ "account": TEST_ACCOUNT }));
    let account = timeout(STEP_TIMEOUT, connecting).await.expect("timely").expect("ok");
    assert_eq!(account.as_str(), TEST_ACCOUNT);
}

#[tokio::test]
async fn given_open_popup_when_destroyed_then_window_closed() {
    let (host, wallet, _remote) = detached_wallet();
    let mut connecting = pin!(wallet.connect());
    assert!(poll!(connecting.as_mut()).is_pending());
    assert!(host.window_open());

    wallet.destroy();

    assert!(!host.window_open());
    assert_eq!(host.listener_count(), 0);
    assert!(connecting.await.is_err());
}

/// **VALUE**: Verifies a call made after the user closed a ready popup, with
/// the reopen blocked, is delivered once a window finally says ready.
///
/// **WHY THIS MATTERS**: The dead window is only noticed on send. If the
/// gate still believed the old document was ready, the call would be posted
/// into nothing and never answered.
///
/// **BUG THIS CATCHES**: Would catch stale readiness surviving a user close
/// when the replacement popup is blocked.
#[tokio::test]
async fn given_ready_popup_closed_by_user_when_reopen_blocked_then_call_delivered_later() {
    // GIVEN: A ready popup holding a posted connect, closed by the user
    let (host, wallet, remote) = detached_wallet();
    let mut connecting = pin!(wallet.connect());
    assert!(poll!(connecting.as_mut()).is_pending());
    remote.signal_ready();
    let connect_request = next_request(&host).await;
    assert!(host.close_window_by_user());

    // WHEN: An interactive call is made while popups are blocked
    host.set_popups_blocked(true);
    let mut signing = pin!(wallet.request("signMessage", Some(json!({ "message": "AA==" }))));
    assert!(poll!(signing.as_mut()).is_pending());

    // THEN: Nothing is on screen and the call waits
    assert!(!wallet.is_ready());
    assert_eq!(wallet.dialog_visibility(), Visibility::Closed);
    assert_eq!(host.posted_requests().len(), 1);

    // WHEN: A background call gets a window open and it says ready
    host.set_popups_blocked(false);
    let mut capabilities = pin!(wallet.request("wallet_getCapabilities", None));
    assert!(poll!(capabilities.as_mut()).is_pending());
    assert_eq!(wallet.dialog_visibility(), Visibility::Open);
    remote.signal_ready();

    // THEN: The blocked call goes first, then the background call
    let first = next_request(&host).await;
    let second = next_request(&host).await;
    assert_eq!(first.method, Method::SignMessage);
    assert_eq!(second.method, Method::Other("wallet_getCapabilities".into()));

    remote.respond_ok(&first, json!({ "signature": "AQ==" }));
    let signed = timeout(STEP_TIMEOUT, signing).await.expect("timely").expect("ok");
    assert_eq!(signed, json!({ "signature": "AQ==" }));
    remote.respond_ok(&connect_request, json!({ "account": TEST_ACCOUNT }));
    timeout(STEP_TIMEOUT, connecting).await.expect("timely").expect("ok");
}
