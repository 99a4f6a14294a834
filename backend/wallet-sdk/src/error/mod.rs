pub mod config;
pub mod transport;
pub mod wallet;

pub use config::ConfigError;
pub use transport::TransportError;
pub use wallet::WalletError;

use common::ErrorLocation;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The caller's raw transaction sender failed after signing succeeded.
    #[error("Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },
}

impl SdkError {
    #[track_caller]
    pub fn send(message: impl Into<String>) -> Self {
        SdkError::Send {
            message: message.into(),
            location: ErrorLocation::here(),
        }
    }

    /// The wallet error underneath, if any.
    pub fn as_wallet(&self) -> Option<&WalletError> {
        match self {
            SdkError::Wallet(error) => Some(error),
            _ => None,
        }
    }
}
