// Unit tests for request/response correlation

use crate::correlator::Correlator;
use crate::error::WalletError;
use crate::protocol::{Method, RpcResponse, codes};

use serde_json::json;

/// **VALUE**: Verifies ids are per-instance, start at 1 and increase.
///
/// **WHY THIS MATTERS**: The wallet echoes ids back verbatim. A shared or
/// restarting counter would let two bridges resolve each other's requests.
///
/// **BUG THIS CATCHES**: Would catch a global counter or an off-by-one start.
#[test]
fn given_two_correlators_when_issuing_then_each_counts_from_one() {
    // GIVEN: Two independent correlators
    let mut first = Correlator::new();
    let mut second = Correlator::new();

    // WHEN: Issuing requests on both
    let (a, _pa) = first.issue(Method::Connect, None);
    let (b, _pb) = first.issue(Method::SignMessage, None);
    let (c, _pc) = second.issue(Method::Connect, None);

    // THEN: Ids are sequential per instance
    assert_eq!(a.id, "1");
    assert_eq!(b.id, "2");
    assert_eq!(c.id, "1");
    assert_eq!(first.pending(), 2);
}

/// **VALUE**: Verifies every permutation of response arrival resolves the right caller.
///
/// **WHY THIS MATTERS**: The wallet answers in whatever order the user acts.
/// Matching must be by id only, never by arrival order.
///
/// **BUG THIS CATCHES**: Would catch FIFO-based resolution or id mix-ups.
#[tokio::test]
async fn given_three_pending_when_resolved_in_any_order_then_each_gets_own_result() {
    let permutations: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];

    for order in permutations {
        // GIVEN: Three pending requests
        let mut correlator = Correlator::new();
        let issued: Vec<_> = (0..3)
            .map(|_| correlator.issue(Method::Other("echo".to_string()), None))
            .collect();
        let requests: Vec<_> = issued.iter().map(|(r, _)| r.clone()).collect();

        // WHEN: Responses arrive in this permutation
        for index in order {
            let request = &requests[index];
            let response = RpcResponse::success(request, json!({ "echo": request.id }));
            assert!(correlator.resolve(response).is_some());
        }

        // THEN: Each waiter receives the value for its own id
        for (request, pending) in issued {
            let value = pending.wait().await.expect("resolved");
            assert_eq!(value, json!({ "echo": request.id }), "order {order:?}");
        }
        assert_eq!(correlator.pending(), 0);
    }
}

/// **VALUE**: Verifies unknown and duplicate responses have no effect.
///
/// **WHY THIS MATTERS**: A stale response (from a dropped caller or a replay)
/// must not complete an unrelated request or panic.
///
/// **BUG THIS CATCHES**: Would catch a resolve that completes the first pending
/// entry when the id does not match.
#[test]
fn given_unknown_or_duplicate_id_when_resolving_then_ignored() {
    // GIVEN: One pending request
    let mut correlator = Correlator::new();
    let (request, _pending) = correlator.issue(Method::Connect, None);

    // WHEN: A response for an unknown id arrives
    let mut stray = RpcResponse::success(&request, json!({}));
    stray.id = "99".to_string();
    let unknown = correlator.resolve(stray);

    // THEN: Nothing resolves and the real entry is still pending
    assert!(unknown.is_none());
    assert!(correlator.is_pending(&request.id));

    // WHEN: The real response arrives twice
    let first = correlator.resolve(RpcResponse::success(&request, json!({})));
    let second = correlator.resolve(RpcResponse::success(&request, json!({})));

    // THEN: Only the first one matches
    assert!(first.is_some());
    assert!(second.is_none());
}

/// **VALUE**: Verifies wallet errors reach the caller with code and message intact.
///
/// **WHY THIS MATTERS**: Applications branch on `4001` (user rejected) to
/// show the right UI. Losing the code turns every rejection into a generic failure.
///
/// **BUG THIS CATCHES**: Would catch error responses treated as successes or
/// codes rewritten on the way through.
#[tokio::test]
async fn given_error_response_when_resolved_then_caller_sees_remote_error() {
    // GIVEN: A pending sign request
    let mut correlator = Correlator::new();
    let (request, pending) = correlator.issue(Method::SignMessage, None);

    // WHEN: The wallet rejects it
    let resolution = correlator
        .resolve(RpcResponse::failure(
            &request,
            codes::USER_REJECTED,
            "User rejected the request",
        ))
        .expect("matched");

    // THEN: Both the resolution and the waiter carry the error
    assert!(resolution.interactive);
    assert_eq!(resolution.result.as_ref().err().map(|e| e.code), Some(4001));

    let error = pending.wait().await.expect_err("remote error");
    assert_eq!(error.code(), Some(codes::USER_REJECTED));
    assert_eq!(error.remote_message(), Some("User rejected the request"));
}

/// **VALUE**: Verifies dismissal only fails interactive requests.
///
/// **WHY THIS MATTERS**: Closing the dialog says nothing about a background
/// `disconnect` or pass-through call; those must still get their answer.
///
/// **BUG THIS CATCHES**: Would catch a dismissal that rejects everything.
#[tokio::test]
async fn given_mixed_pending_when_reject_interactive_then_only_interactive_fail() {
    // GIVEN: One interactive and one background request
    let mut correlator = Correlator::new();
    let (_sign, sign_pending) = correlator.issue(Method::SignMessage, None);
    let (background, _background_pending) = correlator.issue(Method::Disconnect, None);

    // WHEN: The dialog is dismissed
    let rejected = correlator.reject_interactive(|id| WalletError::dismissed(id));

    // THEN: Only the interactive request failed
    assert_eq!(rejected, 1);
    assert!(correlator.is_pending(&background.id));
    assert!(matches!(
        sign_pending.wait().await,
        Err(WalletError::Dismissed { ref id, .. }) if id == "1"
    ));
}

#[tokio::test]
async fn given_pending_when_abandon_all_then_waiters_see_abandoned() {
    let mut correlator = Correlator::new();
    let (_request, pending) = correlator.issue(Method::Connect, None);

    assert_eq!(correlator.abandon_all(), 1);

    assert!(matches!(
        pending.wait().await,
        Err(WalletError::Abandoned { .. })
    ));
}

#[test]
fn given_next_request_when_called_then_consumes_id_without_tracking() {
    let mut correlator = Correlator::new();

    let untracked = correlator.next_request(Method::Disconnect, None);
    let (tracked, _pending) = correlator.issue(Method::Connect, None);

    assert_eq!(untracked.id, "1");
    assert_eq!(tracked.id, "2");
    assert_eq!(correlator.pending(), 1);
    assert!(!correlator.discard(&untracked.id));
    assert!(correlator.discard(&tracked.id));
}
