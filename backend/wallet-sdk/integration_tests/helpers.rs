//! Test helpers for wallet integration tests.
//!
//! Every test drives a real [`Wallet`] over a [`MemoryHost`]; the test plays
//! the wallet document through a [`RemoteEndpoint`]:
//! - Building wallets bound to the in-memory host
//! - Waiting for posted requests with a timeout
//! - Running the connect handshake

use wallet_sdk::WalletConfig;
use wallet_sdk::protocol::{Method, RpcRequest};
use wallet_sdk::session::AccountId;
use wallet_sdk::transport::Host;
use wallet_sdk::transport::memory::{MemoryHost, RemoteEndpoint};
use wallet_sdk::wallet::Wallet;

use std::pin::pin;
use std::rc::Rc;
use std::time::Duration;

use futures_util::poll;
use serde_json::json;
use tokio::time::timeout;

pub const WALLET_HOST: &str = "https://wallet.liquidroute.com";
pub const WALLET_ORIGIN: &str = "https://wallet.liquidroute.com";
pub const TEST_ACCOUNT: &str = "ABC";

/// Upper bound for any single step; nothing here does real I/O.
pub const STEP_TIMEOUT: Duration = Duration::from_secs(2);

pub fn wallet_on(host: &MemoryHost, config: WalletConfig) -> Wallet {
    let host: Rc<dyn Host> = Rc::new(host.clone());
    Wallet::new(config, host).expect("wallet config is valid")
}

/// Wallet using the embedded transport on a secure Chrome page.
pub fn embedded_wallet() -> (MemoryHost, Wallet, RemoteEndpoint) {
    let host = MemoryHost::new();
    let wallet = wallet_on(&host, WalletConfig::new().with_host(WALLET_HOST));
    let remote = host.remote(WALLET_ORIGIN);
    (host, wallet, remote)
}

/// Wallet using the detached (popup) transport.
pub fn detached_wallet() -> (MemoryHost, Wallet, RemoteEndpoint) {
    let host = MemoryHost::new();
    let config = WalletConfig::new()
        .with_host(WALLET_HOST)
        .with_prefer_popup(true);
    let wallet = wallet_on(&host, config);
    let remote = host.remote(WALLET_ORIGIN);
    (host, wallet, remote)
}

/// Next request the bridge posted to the wallet document.
pub async fn next_request(host: &MemoryHost) -> RpcRequest {
    timeout(STEP_TIMEOUT, host.next_request())
        .await
        .expect("Timed out waiting for a posted request")
        .expect("Host inbox closed")
}

/// Full connect handshake: ready, connect request, success response.
pub async fn connect(
    host: &MemoryHost,
    wallet: &Wallet,
    remote: &RemoteEndpoint,
    account: &str,
) -> AccountId {
    let mut connecting = pin!(wallet.connect());
    assert!(
        poll!(connecting.as_mut()).is_pending(),
        "Connect should wait for the wallet"
    );

    remote.signal_ready();
    let request = next_request(host).await;
    assert_eq!(request.method, Method::Connect);
    remote.respond_ok(&request, json!({ "account": account }));

    timeout(STEP_TIMEOUT, connecting)
        .await
        .expect("Connect timed out")
        .expect("Connect should succeed")
}
