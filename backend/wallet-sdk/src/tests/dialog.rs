// Unit tests for the dialog lifecycle, driven through the in-memory host

use crate::dialog::{Dialog, DialogEvent, Visibility};
use crate::error::WalletError;
use crate::origin::Origin;
use crate::protocol::{Envelope, Method, RpcRequest, RpcResponse, Topic};
use crate::transport::memory::MemoryHost;
use crate::transport::{
    DismissListener, Host, InboundMessage, MessageListener, TransportKind,
};

use std::rc::Rc;

use serde_json::{Value, json};
use url::Url;

const WALLET_URL: &str = "https://wallet.liquidroute.com/wallet";
const WALLET_ORIGIN: &str = "https://wallet.liquidroute.com";

fn dialog(host: &MemoryHost, kind: TransportKind) -> Dialog {
    let url = Url::parse(WALLET_URL).expect("valid url");
    let origin = Origin::from_url(&url).expect("tuple origin");
    let on_message: MessageListener = Rc::new(|_: InboundMessage| {});
    let on_dismiss: DismissListener = Rc::new(|| {});
    let host: Rc<dyn Host> = Rc::new(host.clone());
    Dialog::new(host, kind, url, origin, on_message, on_dismiss)
}

fn request(id: &str, method: Method) -> RpcRequest {
    RpcRequest {
        id: id.to_string(),
        method,
        params: None,
    }
}

fn inbound(origin: &str, envelope: &Envelope) -> InboundMessage {
    InboundMessage {
        origin: origin.to_string(),
        data: serde_json::to_value(envelope).expect("envelope serializes"),
    }
}

/// **VALUE**: Verifies nothing is created on the page until first use.
///
/// **WHY THIS MATTERS**: Applications construct the bridge at startup. An
/// eager iframe would load the wallet (and its passkey prompts) for users
/// who never connect.
///
/// **BUG THIS CATCHES**: Would catch resource creation in the constructor.
#[test]
fn given_new_dialog_when_constructed_then_creates_nothing() {
    // GIVEN / WHEN: A fresh dialog
    let host = MemoryHost::new();
    let dialog = dialog(&host, TransportKind::Embedded);

    // THEN: No frame, no listener, closed
    assert!(!dialog.is_initialized());
    assert_eq!(dialog.visibility(), Visibility::Closed);
    assert_eq!(host.frames_created(), 0);
    assert_eq!(host.listener_count(), 0);
}

/// **VALUE**: Verifies open is idempotent and reuses the frame.
///
/// **WHY THIS MATTERS**: Every interactive call opens the dialog. Creating a
/// second iframe would load a second wallet document that never gets the
/// pending requests.
///
/// **BUG THIS CATCHES**: Would catch lazy initialization running twice.
#[test]
fn given_open_dialog_when_opened_again_then_reuses_frame() {
    // GIVEN: An opened dialog
    let host = MemoryHost::new();
    let mut dialog = dialog(&host, TransportKind::Embedded);
    dialog.open().expect("open");

    // WHEN: Opening again after a close
    dialog.close();
    assert!(!host.frame_visible());
    dialog.open().expect("reopen");

    // THEN: Still one frame, visible, one listener
    assert_eq!(host.frames_created(), 1);
    assert_eq!(host.listener_count(), 1);
    assert!(host.frame_visible());
    assert!(dialog.is_open());
}

/// **VALUE**: Verifies requests wait for `ready` and are then posted to the wallet origin.
///
/// **WHY THIS MATTERS**: Posting before the wallet listens loses the request
/// and the caller hangs forever.
///
/// **BUG THIS CATCHES**: Would catch sends that bypass the gate, or posts
/// addressed to `*` instead of the bound origin.
#[test]
fn given_request_before_ready_when_ready_arrives_then_posts_to_bound_origin() {
    // GIVEN: A request sent before the wallet announced itself
    let host = MemoryHost::new();
    let mut dialog = dialog(&host, TransportKind::Embedded);
    dialog
        .send_request(&request("1", Method::Connect), true)
        .expect("send");
    assert!(host.posted().is_empty(), "Nothing posted before ready");

    // WHEN: The wallet signals ready
    let event = dialog.accept(inbound(WALLET_ORIGIN, &Envelope::ready()));

    // THEN: The queued request goes out to the wallet origin
    assert!(matches!(event, Some(DialogEvent::Ready(ref failed)) if failed.is_empty()));
    let posted = host.posted();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].target_origin, WALLET_ORIGIN);
    assert_eq!(posted[0].envelope.request_id(), Some("1"));
}

/// **VALUE**: Verifies messages from other origins are dropped, including `ready`.
///
/// **WHY THIS MATTERS**: Any page can `postMessage` into ours. A forged
/// `ready` or `rpc-response` must never reach the gate or the correlator.
///
/// **BUG THIS CATCHES**: Would catch prefix/substring origin matching or a
/// missing check on control topics.
#[test]
fn given_foreign_origin_when_accepting_then_drops_message() {
    // GIVEN: A dialog with a queued request
    let host = MemoryHost::new();
    let mut dialog = dialog(&host, TransportKind::Embedded);
    dialog
        .send_request(&request("1", Method::Connect), true)
        .expect("send");

    // WHEN: Look-alike origins send ready and a response
    let spoofed = [
        "https://wallet.liquidroute.com.evil.example",
        "http://wallet.liquidroute.com",
        "https://wallet.liquidroute.com:8443",
    ];
    for origin in spoofed {
        assert!(dialog.accept(inbound(origin, &Envelope::ready())).is_none());
        let response = RpcResponse::success(&request("1", Method::Connect), json!({}));
        let envelope = Envelope::response(&response).expect("serializes");
        assert!(dialog.accept(inbound(origin, &envelope)).is_none());
    }

    // THEN: The gate is still closed and nothing was posted
    assert!(!dialog.is_ready());
    assert!(host.posted().is_empty());
}

#[test]
fn given_response_from_wallet_when_accepting_then_returns_response() {
    let host = MemoryHost::new();
    let mut dialog = dialog(&host, TransportKind::Embedded);
    dialog.open().expect("open");

    let response = RpcResponse::success(&request("5", Method::Connect), json!({ "account": "A" }));
    let envelope = Envelope::response(&response).expect("serializes");

    match dialog.accept(inbound(WALLET_ORIGIN, &envelope)) {
        Some(DialogEvent::Response(received)) => assert_eq!(received, response),
        other => panic!("Expected response, got {other:?}"),
    }
}

/// **VALUE**: Verifies a remote `close` is treated as a user dismissal.
///
/// **WHY THIS MATTERS**: The wallet's own cancel button sends `close`. The
/// dialog must hide and the wallet must be told so it can fail pending calls.
///
/// **BUG THIS CATCHES**: Would catch `close` being ignored like other topics.
#[test]
fn given_open_dialog_when_wallet_sends_close_then_dismissed() {
    // GIVEN: An open dialog
    let host = MemoryHost::new();
    let mut dialog = dialog(&host, TransportKind::Embedded);
    dialog.open().expect("open");

    // WHEN: The wallet asks to close
    let event = dialog.accept(inbound(
        WALLET_ORIGIN,
        &Envelope::new(Topic::Close, Value::Null),
    ));

    // THEN: Dismissed and hidden
    assert!(matches!(event, Some(DialogEvent::Dismissed)));
    assert_eq!(dialog.visibility(), Visibility::Closed);
    assert!(!host.frame_visible());
}

#[test]
fn given_unknown_or_malformed_message_when_accepting_then_ignored() {
    let host = MemoryHost::new();
    let mut dialog = dialog(&host, TransportKind::Embedded);
    dialog.open().expect("open");

    let unknown = InboundMessage {
        origin: WALLET_ORIGIN.to_string(),
        data: json!({ "topic": "telemetry", "payload": {} }),
    };
    let not_an_envelope = InboundMessage {
        origin: WALLET_ORIGIN.to_string(),
        data: json!("hello"),
    };
    let internal = inbound(WALLET_ORIGIN, &Envelope::new(Topic::Internal, json!({})));

    assert!(dialog.accept(unknown).is_none());
    assert!(dialog.accept(not_an_envelope).is_none());
    assert!(dialog.accept(internal).is_none());
    assert!(dialog.is_open());
}

/// **VALUE**: Verifies destroy releases everything and is final.
///
/// **WHY THIS MATTERS**: A leaked listener keeps routing wallet messages into
/// a dead bridge; a leaked frame leaves an overlay on the page.
///
/// **BUG THIS CATCHES**: Would catch a destroy that forgets the listener or
/// allows re-initialization afterwards.
#[test]
fn given_initialized_dialog_when_destroyed_then_resources_released_and_reuse_fails() {
    // GIVEN: An opened dialog with a queued request
    let host = MemoryHost::new();
    let mut dialog = dialog(&host, TransportKind::Embedded);
    dialog
        .send_request(&request("1", Method::Connect), true)
        .expect("send");

    // WHEN: Destroyed
    dialog.destroy();

    // THEN: Frame removed, listener gone, further use rejected
    assert!(dialog.is_destroyed());
    assert_eq!(host.live_frames(), 0);
    assert_eq!(host.listener_count(), 0);
    assert!(matches!(dialog.open(), Err(WalletError::Destroyed { .. })));
    assert!(matches!(
        dialog.send_request(&request("2", Method::Connect), false),
        Err(WalletError::Destroyed { .. })
    ));
    assert_eq!(host.frames_created(), 1);
}

/// **VALUE**: Verifies non-interactive sends never show the dialog.
///
/// **WHY THIS MATTERS**: `disconnect` runs in the background; flashing the
/// wallet overlay for it would be a visible glitch.
///
/// **BUG THIS CATCHES**: Would catch send paths that always call `open`.
#[test]
fn given_non_interactive_request_when_sent_then_dialog_stays_closed() {
    let host = MemoryHost::new();
    let mut dialog = dialog(&host, TransportKind::Embedded);

    dialog
        .send_request(&request("1", Method::Disconnect), false)
        .expect("send");

    assert_eq!(dialog.visibility(), Visibility::Closed);
    assert_eq!(host.frames_created(), 1);
    assert!(!host.frame_visible());
}

/// **VALUE**: Verifies a popup closed by the user is reopened and re-gated.
///
/// **WHY THIS MATTERS**: The new popup is a fresh document; posting to it
/// before it is ready would silently lose the request.
///
/// **BUG THIS CATCHES**: Would catch a detached transport that keeps the old
/// readiness after reopening.
#[test]
fn given_detached_popup_closed_by_user_when_sending_then_reopens_and_waits_for_ready() {
    // GIVEN: A ready popup
    let host = MemoryHost::new();
    let mut dialog = dialog(&host, TransportKind::Detached);
    dialog.open().expect("open");
    dialog.accept(inbound(WALLET_ORIGIN, &Envelope::ready()));
    assert!(dialog.is_ready());
    assert_eq!(host.windows_opened(), 1);

    // WHEN: The user closes it and a new request is sent
    assert!(host.close_window_by_user());
    dialog
        .send_request(&request("2", Method::SignMessage), true)
        .expect("send");

    // THEN: A second window opened and the request waits for its ready
    assert_eq!(host.windows_opened(), 2);
    assert!(!dialog.is_ready());
    assert!(host.posted().is_empty());

    dialog.accept(inbound(WALLET_ORIGIN, &Envelope::ready()));
    assert_eq!(host.posted_requests().len(), 1);
    assert_eq!(host.posted_requests()[0].id, "2");
}

#[test]
fn given_blocked_popup_when_sending_then_request_stays_queued() {
    let host = MemoryHost::new().with_popups_blocked(true);
    let mut dialog = dialog(&host, TransportKind::Detached);

    dialog
        .send_request(&request("1", Method::Connect), true)
        .expect("blocked popup is not an error");

    assert_eq!(host.windows_opened(), 0);
    assert_eq!(host.blocked_popups(), 1);
    assert!(host.posted().is_empty());
}

#[test]
fn given_detached_dialog_when_closed_then_window_closed() {
    let host = MemoryHost::new();
    let mut dialog = dialog(&host, TransportKind::Detached);
    dialog.open().expect("open");
    assert!(host.window_open());

    dialog.close();

    assert!(!host.window_open());
    assert_eq!(dialog.visibility(), Visibility::Closed);
}

/// **VALUE**: Verifies closing a ready popup forgets its readiness.
///
/// **WHY THIS MATTERS**: If the next popup is blocked, a request posted
/// against stale readiness goes nowhere and its caller hangs.
///
/// **BUG THIS CATCHES**: Would catch the gate staying open after the popup it
/// described was closed.
#[test]
fn given_ready_popup_when_closed_and_next_blocked_then_request_queued() {
    // GIVEN: A ready popup that is then closed
    let host = MemoryHost::new();
    let mut dialog = dialog(&host, TransportKind::Detached);
    dialog.open().expect("open");
    dialog.accept(inbound(WALLET_ORIGIN, &Envelope::ready()));
    dialog.close();
    assert!(!dialog.is_ready());

    // WHEN: The next popup is blocked
    host.set_popups_blocked(true);
    dialog
        .send_request(&request("2", Method::SignMessage), true)
        .expect("blocked popup is not an error");

    // THEN: Nothing posted; it goes out once a window opens and says ready
    assert!(host.posted().is_empty());
    host.set_popups_blocked(false);
    dialog
        .send_request(&request("3", Method::Other("wallet_getCapabilities".into())), false)
        .expect("send");
    dialog.accept(inbound(WALLET_ORIGIN, &Envelope::ready()));

    let ids: Vec<String> = host.posted_requests().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["2", "3"]);
}

/// **VALUE**: Verifies a popup the user closed after `ready` does not leave
/// the gate open when its replacement is blocked.
///
/// **WHY THIS MATTERS**: The browser gives no close event. The next send is
/// the first moment the dead window is noticed, and if the reopen is blocked
/// the request has nowhere to go but the queue.
///
/// **BUG THIS CATCHES**: Would catch the request being handed to a missing
/// window and dropped while its caller waits forever.
#[test]
fn given_ready_popup_closed_by_user_when_reopen_blocked_then_request_queued() {
    // GIVEN: A ready popup the user closes
    let host = MemoryHost::new();
    let mut dialog = dialog(&host, TransportKind::Detached);
    dialog.open().expect("open");
    dialog.accept(inbound(WALLET_ORIGIN, &Envelope::ready()));
    assert!(host.close_window_by_user());

    // WHEN: The reopen is blocked
    host.set_popups_blocked(true);
    dialog
        .send_request(&request("2", Method::SignMessage), true)
        .expect("blocked popup is not an error");

    // THEN: Readiness is forgotten and nothing is posted
    assert!(!dialog.is_ready());
    assert!(host.posted().is_empty());

    // WHEN: A later send opens a window that says ready
    host.set_popups_blocked(false);
    dialog
        .send_request(&request("3", Method::Other("wallet_getCapabilities".into())), false)
        .expect("send");
    dialog.accept(inbound(WALLET_ORIGIN, &Envelope::ready()));

    // THEN: Both requests are delivered in order
    let ids: Vec<String> = host.posted_requests().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["2", "3"]);
}

#[test]
fn given_blocked_popup_when_opened_then_reported_closed_until_window_appears() {
    // GIVEN: Popups are blocked
    let host = MemoryHost::new().with_popups_blocked(true);
    let mut dialog = dialog(&host, TransportKind::Detached);

    // WHEN: Opening
    dialog.open().expect("blocked popup is not an error");

    // THEN: Nothing on screen, so nothing reported
    assert_eq!(dialog.visibility(), Visibility::Closed);
    assert!(!dialog.is_open());

    // WHEN: A background send gets a window through
    host.set_popups_blocked(false);
    dialog
        .send_request(&request("1", Method::Other("wallet_getCapabilities".into())), false)
        .expect("send");

    // THEN: The dialog is on screen and closing it closes the window
    assert!(host.window_open());
    assert_eq!(dialog.visibility(), Visibility::Open);
    dialog.close();
    assert!(!host.window_open());
    assert_eq!(dialog.visibility(), Visibility::Closed);
}

#[test]
fn given_open_popup_when_closed_by_user_then_reported_closed() {
    let host = MemoryHost::new();
    let mut dialog = dialog(&host, TransportKind::Detached);
    dialog.open().expect("open");
    assert_eq!(dialog.visibility(), Visibility::Open);

    assert!(host.close_window_by_user());

    assert_eq!(dialog.visibility(), Visibility::Closed);
}
