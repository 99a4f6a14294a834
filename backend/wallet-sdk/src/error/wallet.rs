use crate::error::transport::TransportError;
use crate::protocol::{RpcErrorObject, codes};

use common::ErrorLocation;

use serde_json::Value;
use thiserror::Error as ThisError;

/// Failures surfaced to callers of [`Wallet`](crate::wallet::Wallet) operations.
///
/// Remote rejections keep the wallet's `code` and `message` untouched so the
/// application can show them verbatim or map codes onto its own UI.
#[derive(Debug, ThisError)]
pub enum WalletError {
    #[error("Not Connected Error: Wallet not connected {location}")]
    NotConnected { location: ErrorLocation },

    #[error("Remote Error: {message} (code {code}) {location}")]
    Remote {
        code: i64,
        message: String,
        data: Option<Value>,
        location: ErrorLocation,
    },

    #[error("Unsupported Error: {message} {location}")]
    Unsupported {
        message: String,
        location: ErrorLocation,
    },

    #[error("Dismissed Error: Request {id} was dismissed by the user {location}")]
    Dismissed { id: String, location: ErrorLocation },

    #[error("Abandoned Error: Request {id} was abandoned before a response arrived {location}")]
    Abandoned { id: String, location: ErrorLocation },

    #[error("Destroyed Error: Wallet has been destroyed {location}")]
    Destroyed { location: ErrorLocation },

    #[error("Codec Error: {message} {location}")]
    Codec {
        message: String,
        location: ErrorLocation,
    },

    #[error("Protocol Error: {message} {location}")]
    Protocol {
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl WalletError {
    #[track_caller]
    pub fn not_connected() -> Self {
        WalletError::NotConnected {
            location: ErrorLocation::here(),
        }
    }

    #[track_caller]
    pub fn remote(error: RpcErrorObject) -> Self {
        WalletError::Remote {
            code: error.code,
            message: error.message,
            data: error.data,
            location: ErrorLocation::here(),
        }
    }

    #[track_caller]
    pub fn unsupported(message: impl Into<String>) -> Self {
        WalletError::Unsupported {
            message: message.into(),
            location: ErrorLocation::here(),
        }
    }

    #[track_caller]
    pub fn dismissed(id: impl Into<String>) -> Self {
        WalletError::Dismissed {
            id: id.into(),
            location: ErrorLocation::here(),
        }
    }

    #[track_caller]
    pub fn abandoned(id: impl Into<String>) -> Self {
        WalletError::Abandoned {
            id: id.into(),
            location: ErrorLocation::here(),
        }
    }

    #[track_caller]
    pub fn destroyed() -> Self {
        WalletError::Destroyed {
            location: ErrorLocation::here(),
        }
    }

    #[track_caller]
    pub fn codec(message: impl Into<String>) -> Self {
        WalletError::Codec {
            message: message.into(),
            location: ErrorLocation::here(),
        }
    }

    #[track_caller]
    pub fn protocol(message: impl Into<String>) -> Self {
        WalletError::Protocol {
            message: message.into(),
            location: ErrorLocation::here(),
        }
    }

    /// Error code in the wallet's numbering.
    ///
    /// Remote rejections keep the wallet's own code. Local session failures
    /// map onto the well-known codes: no session is `UNAUTHORIZED`, and a
    /// torn-down bridge is `DISCONNECTED`.
    pub fn code(&self) -> Option<i64> {
        match self {
            WalletError::Remote { code, .. } => Some(*code),
            WalletError::NotConnected { .. } => Some(codes::UNAUTHORIZED),
            WalletError::Abandoned { .. } | WalletError::Destroyed { .. } => {
                Some(codes::DISCONNECTED)
            }
            _ => None,
        }
    }

    /// Message reported by the remote wallet, if this is a remote rejection.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            WalletError::Remote { message, .. } => Some(message),
            _ => None,
        }
    }

    /// True for failures produced locally, before any round trip.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            WalletError::NotConnected { .. }
                | WalletError::Unsupported { .. }
                | WalletError::Destroyed { .. }
        )
    }
}

impl From<serde_json::Error> for WalletError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        WalletError::Protocol {
            message: error.to_string(),
            location: ErrorLocation::here(),
        }
    }
}

impl From<base64::DecodeError> for WalletError {
    #[track_caller]
    fn from(error: base64::DecodeError) -> Self {
        WalletError::Codec {
            message: error.to_string(),
            location: ErrorLocation::here(),
        }
    }
}
