use crate::ErrorLocation;

use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::here()` records this file and a real position.
///
/// **WHY THIS MATTERS**: Wallet errors (remote rejections, dismissals, transport
/// failures) are logged far away from the await point that produced them. The
/// location is the only breadcrumb back to the failing call.
///
/// **BUG THIS CATCHES**: Would catch if `#[track_caller]` is dropped from `here()`,
/// which would make every error point into `error_location.rs` in the common crate.
#[test]
fn given_here_called_in_test_when_captured_then_points_at_test_file() {
    // GIVEN / WHEN: Capturing the location directly in the test
    let location = ErrorLocation::here();

    // THEN: File is this test module and line/column are populated
    assert!(
        location.file.contains("tests"),
        "Should capture the calling file, got {}",
        location.file
    );
    assert!(location.line > 0, "Should capture a line number");
    assert!(location.column > 0, "Should capture a column number");
}

/// **VALUE**: Verifies that locations propagate through `#[track_caller]` helpers.
///
/// **WHY THIS MATTERS**: Error constructors such as `WalletError::not_connected()`
/// are helpers. If propagation breaks, every "not connected" error reports the
/// constructor instead of the signing call that failed the precondition.
///
/// **BUG THIS CATCHES**: Would catch a helper chain that silently stops forwarding
/// the caller location.
#[test]
fn given_track_caller_helper_when_called_twice_then_lines_differ() {
    // GIVEN: A helper that forwards the caller location
    #[track_caller]
    fn capture() -> ErrorLocation {
        ErrorLocation::here()
    }

    // WHEN: Calling from two adjacent lines
    let first = capture();
    let second = capture();

    // THEN: Same file, consecutive lines
    assert_eq!(first.file, second.file);
    assert_eq!(first.line + 1, second.line, "Lines should be sequential");
}

/// **VALUE**: Verifies the `[file:line:column]` display format.
///
/// **WHY THIS MATTERS**: Every error message in the workspace ends with this
/// suffix; log scrapers and humans rely on it.
///
/// **BUG THIS CATCHES**: Would catch format drift (missing brackets or separators).
#[test]
fn given_location_when_formatted_then_uses_bracketed_triplet() {
    // GIVEN: A location built from the panic location API
    let location = ErrorLocation::from(Location::caller());

    // WHEN: Formatting
    let formatted = location.to_string();

    // THEN: "[file:line:column]"
    assert_eq!(
        formatted,
        format!("[{}:{}:{}]", location.file, location.line, location.column)
    );
}

/// **VALUE**: Verifies that locations serialize as plain JSON objects.
///
/// **WHY THIS MATTERS**: The demo app reports failed scenarios as JSON; the
/// location must survive that trip.
///
/// **BUG THIS CATCHES**: Would catch removal of the `Serialize` derive.
#[test]
fn given_location_when_serialized_then_contains_fields() {
    let location = ErrorLocation::here();

    let json = serde_json::to_value(location).expect("location should serialize");

    assert_eq!(json["line"], location.line);
    assert_eq!(json["column"], location.column);
    assert!(json["file"].is_string());
}
