// Unit tests for origin derivation

use crate::origin::Origin;

use url::Url;

#[test]
fn given_urls_when_origin_derived_then_default_ports_elided() {
    let cases = [
        ("https://wallet.liquidroute.com/wallet", "https://wallet.liquidroute.com"),
        ("https://wallet.liquidroute.com:443/wallet", "https://wallet.liquidroute.com"),
        ("http://localhost:3001/wallet", "http://localhost:3001"),
        ("http://localhost:80/wallet?x=1#y", "http://localhost"),
    ];

    for (url, expected) in cases {
        let url = Url::parse(url).expect("valid");
        assert_eq!(Origin::from_url(&url).expect("tuple").as_str(), expected);
    }
}

/// **VALUE**: Verifies matching is exact string equality.
///
/// **WHY THIS MATTERS**: `startsWith`-style checks accept
/// `https://wallet.liquidroute.com.attacker.net`.
///
/// **BUG THIS CATCHES**: Would catch prefix, suffix or case-insensitive matching.
#[test]
fn given_origin_when_matching_then_only_exact_equal_passes() {
    let origin = Origin::parse("https://wallet.liquidroute.com").expect("valid");

    assert!(origin.matches("https://wallet.liquidroute.com"));
    assert!(!origin.matches("https://wallet.liquidroute.com/"));
    assert!(!origin.matches("https://wallet.liquidroute.com.attacker.net"));
    assert!(!origin.matches("https://WALLET.liquidroute.com"));
    assert!(!origin.matches("null"));
}

#[test]
fn given_opaque_url_when_parsed_then_rejected() {
    assert!(Origin::parse("data:text/plain,hello").is_err());
    assert!(Origin::parse("not a url").is_err());
}
