// Unit tests for wallet config load/save/validate and host resolution

use crate::config::{WalletConfig, default_host};
use crate::error::ConfigError;
use crate::{DEV_WALLET_HOST, PRODUCTION_WALLET_HOST, WALLET_HOST_ENV};

use serial_test::serial;
use tempfile::TempDir;

struct EnvGuard {
    previous: Option<String>,
}

impl EnvGuard {
    fn set(value: Option<&str>) -> Self {
        let previous = std::env::var(WALLET_HOST_ENV).ok();
        // SAFETY: env-mutating tests are #[serial]
        unsafe {
            match value {
                Some(v) => std::env::set_var(WALLET_HOST_ENV, v),
                None => std::env::remove_var(WALLET_HOST_ENV),
            }
        }
        Self { previous }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: env-mutating tests are #[serial]
        unsafe {
            match &self.previous {
                Some(v) => std::env::set_var(WALLET_HOST_ENV, v),
                None => std::env::remove_var(WALLET_HOST_ENV),
            }
        }
    }
}

/// **VALUE**: Verifies a missing config file yields defaults instead of an error.
///
/// **WHY THIS MATTERS**: First run has no config. Failing there would make the
/// demo unusable out of the box.
///
/// **BUG THIS CATCHES**: Would catch `load` treating NotFound as a read error.
#[test]
fn given_missing_file_when_load_then_returns_defaults() {
    // GIVEN: An empty directory
    let dir = TempDir::new().expect("temp dir");

    // WHEN: Loading
    let config = WalletConfig::load(dir.path()).expect("defaults");

    // THEN: Defaults
    assert_eq!(config, WalletConfig::default());
    assert!(!config.prefer_popup);
}

/// **VALUE**: Verifies save writes camelCase JSON that load reads back.
///
/// **WHY THIS MATTERS**: The file is shared with the JavaScript side of the
/// project, which uses `preferPopup`.
///
/// **BUG THIS CATCHES**: Would catch a lost `rename_all` or a non-atomic write
/// leaving the temp file behind.
#[test]
fn given_saved_config_when_loaded_then_matches_and_uses_camel_case() {
    // GIVEN: A config with both fields set
    let dir = TempDir::new().expect("temp dir");
    let config = WalletConfig::new()
        .with_host("https://wallet.example.com")
        .with_prefer_popup(true);

    // WHEN: Saved and loaded
    config.save(dir.path()).expect("save");
    let loaded = WalletConfig::load(dir.path()).expect("load");

    // THEN: Same values, camelCase on disk, no temp file
    assert_eq!(loaded, config);
    let raw = std::fs::read_to_string(dir.path().join("wallet.json")).expect("file");
    assert!(raw.contains("\"preferPopup\": true"), "got {raw}");
    assert!(!dir.path().join("wallet.json.tmp").exists());
}

#[test]
fn given_malformed_file_when_load_then_parse_error() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("wallet.json"), "{ not json").expect("write");

    let result = WalletConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

/// **VALUE**: Verifies hosts that cannot serve the wallet are rejected up front.
///
/// **WHY THIS MATTERS**: A bad host yields an opaque or wrong origin, which
/// would make every inbound message fail the origin check silently.
///
/// **BUG THIS CATCHES**: Would catch validation that only checks "is a URL".
#[test]
fn given_invalid_hosts_when_validate_then_validation_error() {
    for host in ["", "not a url", "ftp://wallet.example.com", "data:text/plain,hi"] {
        let config = WalletConfig::new().with_host(host);
        assert!(
            matches!(config.validate(), Err(ConfigError::ValidationError { .. })),
            "host {host:?} should be rejected"
        );
    }
}

#[test]
fn given_invalid_file_contents_when_load_then_validation_error() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(
        dir.path().join("wallet.json"),
        r#"{ "host": "ftp://wallet.example.com" }"#,
    )
    .expect("write");

    assert!(matches!(
        WalletConfig::load(dir.path()),
        Err(ConfigError::ValidationError { .. })
    ));
}

/// **VALUE**: Verifies the wallet URL and origin derived from an explicit host.
///
/// **WHY THIS MATTERS**: The origin is the only thing standing between the
/// bridge and forged messages. A default port left in would reject every
/// genuine message.
///
/// **BUG THIS CATCHES**: Would catch double slashes in the URL or a port kept
/// in the origin.
#[test]
fn given_explicit_host_when_resolve_then_builds_wallet_url_and_origin() {
    let config = WalletConfig::new().with_host("https://wallet.example.com:443/");

    let resolved = config.resolve(Some("shop.example.com")).expect("resolves");

    assert_eq!(resolved.wallet_url.as_str(), "https://wallet.example.com/wallet");
    assert_eq!(resolved.origin.as_str(), "https://wallet.example.com");
}

#[test]
fn given_dev_page_when_default_host_then_local_wallet() {
    assert_eq!(default_host(Some("localhost")), DEV_WALLET_HOST);
    assert_eq!(default_host(Some("127.0.0.1")), DEV_WALLET_HOST);
    assert_eq!(DEV_WALLET_HOST, "http://localhost:3001");

    let resolved = WalletConfig::new()
        .resolve(Some("localhost"))
        .expect("resolves");
    assert_eq!(resolved.wallet_url.as_str(), "http://localhost:3001/wallet");
    assert_eq!(resolved.origin.as_str(), "http://localhost:3001");
}

/// **VALUE**: Verifies the environment override applies only off localhost.
///
/// **WHY THIS MATTERS**: Staging deployments point at a staging wallet via
/// `LIQUIDROUTE_WALLET_HOST`; local development must keep using port 3001.
///
/// **BUG THIS CATCHES**: Would catch env lookup taking priority over the dev
/// page rule, or the production fallback being lost.
#[test]
#[serial]
fn given_env_override_when_default_host_then_env_wins_off_localhost() {
    {
        let _guard = EnvGuard::set(Some("https://staging-wallet.example.com"));
        assert_eq!(
            default_host(Some("app.example.com")),
            "https://staging-wallet.example.com"
        );
        assert_eq!(default_host(Some("localhost")), DEV_WALLET_HOST);
    }

    let _guard = EnvGuard::set(None);
    assert_eq!(default_host(Some("app.example.com")), PRODUCTION_WALLET_HOST);
    assert_eq!(default_host(None), PRODUCTION_WALLET_HOST);
}

#[test]
#[serial]
fn given_blank_env_override_when_default_host_then_production() {
    let _guard = EnvGuard::set(Some("   "));
    assert_eq!(default_host(None), PRODUCTION_WALLET_HOST);
}
