//! Connection state held by a [`Wallet`](crate::wallet::Wallet).

use serde::{Deserialize, Serialize};

/// Account identifier returned by the wallet on connect.
///
/// Opaque to the bridge: the remote wallet hands out a base58 public key but
/// nothing here decodes or validates it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `abcd1234...wxyz89` style label for logs.
    pub fn short(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 14 {
            return self.0.clone();
        }
        let head: String = chars[..8].iter().collect();
        let tail: String = chars[chars.len() - 6..].iter().collect();
        format!("{head}...{tail}")
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AccountId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    account: Option<AccountId>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }

    pub fn account(&self) -> Option<&AccountId> {
        self.account.as_ref()
    }

    pub fn connect(&mut self, account: AccountId) {
        self.account = Some(account);
    }

    /// Returns whether a session was actually cleared.
    pub fn clear(&mut self) -> bool {
        self.account.take().is_some()
    }
}
