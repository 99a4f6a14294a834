//! Byte payload encoding for the wire.
//!
//! Message and transaction bytes travel as standard base64 strings. The
//! bridge never inspects transaction contents; [`WalletTransaction`] is the
//! seam where a caller's transaction type is turned into bytes and back.

use crate::error::WalletError;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode(field: &str, encoded: &str) -> Result<Vec<u8>, WalletError> {
    STANDARD
        .decode(encoded)
        .map_err(|e| WalletError::codec(format!("Field '{field}' is not valid base64: {e}")))
}

/// A transaction the wallet can sign.
pub trait WalletTransaction: Sized {
    /// Wire bytes for the wallet. Must not require existing signatures nor
    /// verify them: the wallet may be the only signer or one of several.
    fn serialize_unchecked(&self) -> Result<Vec<u8>, WalletError>;

    /// Rebuilds the caller's representation from the signed bytes.
    fn from_wire(bytes: &[u8]) -> Result<Self, WalletError>;
}

/// Opaque transaction blob tagged with its format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireTransaction {
    Legacy(Vec<u8>),
    Versioned(Vec<u8>),
}

impl WireTransaction {
    pub fn bytes(&self) -> &[u8] {
        match self {
            WireTransaction::Legacy(bytes) | WireTransaction::Versioned(bytes) => bytes,
        }
    }
}

impl WalletTransaction for WireTransaction {
    fn serialize_unchecked(&self) -> Result<Vec<u8>, WalletError> {
        match self {
            WireTransaction::Legacy(bytes) => Ok(bytes.clone()),
            WireTransaction::Versioned(_) => Err(WalletError::unsupported(
                "Versioned transactions not yet supported",
            )),
        }
    }

    fn from_wire(bytes: &[u8]) -> Result<Self, WalletError> {
        Ok(WireTransaction::Legacy(bytes.to_vec()))
    }
}
