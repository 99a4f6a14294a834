// Unit tests for the simulated wallet's deterministic signatures

use crate::simulator::{Policy, signature_for};

#[test]
fn given_same_bytes_when_signed_then_same_64_byte_signature() {
    let first = signature_for(b"Hi");
    let second = signature_for(b"Hi");

    assert_eq!(first.len(), 64);
    assert_eq!(first, second);
    assert_ne!(first, signature_for(b"Ho"));
    assert_eq!(signature_for(&[]).len(), 64);
}

#[test]
fn given_policy_when_rejecting_then_methods_collected() {
    let policy = Policy::approve_all("ABC")
        .rejecting("signMessage")
        .rejecting("signMessage");

    assert_eq!(policy.account, "ABC");
    assert_eq!(policy.reject.len(), 1);
    assert!(policy.reject.contains("signMessage"));
}
