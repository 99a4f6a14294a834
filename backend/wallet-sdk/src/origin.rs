//! Origin derivation and comparison.
//!
//! The origin is the security boundary of the bridge: it is computed once from
//! the wallet URL and every inbound message is compared against it with exact
//! string equality.

use crate::error::ConfigError;

use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin(String);

impl Origin {
    /// `scheme://host[:port]` of `url`, with default ports elided.
    pub fn from_url(url: &Url) -> Result<Self, ConfigError> {
        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(ConfigError::invalid(format!(
                "URL has an opaque origin: {url}"
            )));
        }
        Ok(Self(origin.ascii_serialization()))
    }

    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(value)
            .map_err(|e| ConfigError::invalid(format!("Invalid origin '{value}': {e}")))?;
        Self::from_url(&url)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact comparison against an origin reported by the platform.
    pub fn matches(&self, reported: &str) -> bool {
        self.0 == reported
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
