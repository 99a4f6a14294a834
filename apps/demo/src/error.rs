use common::ErrorLocation;

use wallet_sdk::{ConfigError, WalletError};

use thiserror::Error;

/// Errors raised by the demo host application.
///
/// Wallet failures inside a scenario are reported in the run summary rather
/// than returned; these are the failures that stop the demo itself.
#[derive(Debug, Error)]
pub enum DemoError {
    /// Error from this App
    #[error("Demo Error: {message} {location}")]
    Demo {
        message: String,
        location: ErrorLocation,
    },

    /// Scenario book could not be parsed or is inconsistent
    #[error("Scenario Error: {message} {location}")]
    Scenario {
        message: String,
        location: ErrorLocation,
    },

    /// Wallet configuration could not be loaded or resolved
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Wallet operation failed outside a scenario (e.g. the initial connect)
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

impl DemoError {
    #[track_caller]
    pub fn demo(message: impl Into<String>) -> Self {
        DemoError::Demo {
            message: message.into(),
            location: ErrorLocation::here(),
        }
    }

    #[track_caller]
    pub fn scenario(message: impl Into<String>) -> Self {
        DemoError::Scenario {
            message: message.into(),
            location: ErrorLocation::here(),
        }
    }
}
