pub mod adapter;
pub mod codec;
pub mod config;
pub mod correlator;
pub mod dialog;
pub mod error;
pub mod events;
pub mod gate;
pub mod origin;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod wallet;

#[cfg(test)]
mod tests;

pub use adapter::LiquidRouteAdapter;
pub use config::WalletConfig;
pub use error::{ConfigError, SdkError, TransportError, WalletError};
pub use events::{EventKind, WalletEvent};
pub use session::AccountId;
pub use wallet::Wallet;

pub const WALLET_NAME: &str = "LiquidRoute Wallet";
pub const PRODUCTION_WALLET_HOST: &str = "https://wallet.liquidroute.com";
pub const DEV_WALLET_HOSTNAME: &str = "localhost";
pub const DEV_WALLET_PORT: u16 = 3001;
pub const DEV_WALLET_HOST: &str =
    const_format::concatcp!("http://", DEV_WALLET_HOSTNAME, ":", DEV_WALLET_PORT);
pub const DEV_PAGE_HOSTNAMES: &[&str] = &["localhost", "127.0.0.1"];
pub const WALLET_PATH: &str = "/wallet";
pub const WALLET_HOST_ENV: &str = "LIQUIDROUTE_WALLET_HOST";
