//! Bridge configuration: which wallet host to embed and how to present it.
//!
//! The wallet runs on a different origin than the embedding application. When
//! no host is configured one is picked from the page's own hostname and the
//! environment, see [`default_host`].

use crate::error::config::ConfigError;
use crate::origin::Origin;
use crate::{
    DEV_PAGE_HOSTNAMES, DEV_WALLET_HOST, PRODUCTION_WALLET_HOST, WALLET_HOST_ENV, WALLET_PATH,
};

use common::ErrorLocation;

use std::panic::Location;
use std::path::Path;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use url::Url;

const CONFIG_FILE_NAME: &str = "wallet.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletConfig {
    /// Wallet host URL, e.g. `https://wallet.liquidroute.com`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Use a detached popup window instead of an embedded iframe.
    #[serde(default)]
    pub prefer_popup: bool,
}

/// A validated config with everything derived from the host computed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub host: Url,
    pub wallet_url: Url,
    pub origin: Origin,
    pub prefer_popup: bool,
}

impl WalletConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_prefer_popup(mut self, prefer_popup: bool) -> Self {
        self.prefer_popup = prefer_popup;
        self
    }

    /// Load config from {config_dir}/wallet.json.
    ///
    /// A missing file yields defaults. A present but unreadable, malformed or
    /// invalid file is an error.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Wallet config not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read wallet config: {}", e);
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config: WalletConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse wallet config JSON: {}", e);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Wallet config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/wallet.json via temp file + rename.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{CONFIG_FILE_NAME}.tmp"));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Wallet config saved to {}", config_path.display());
        Ok(())
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if the host is set but is not an
    /// absolute http(s) URL with a hostname.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref host) = self.host {
            parse_host(host)?;
        }
        Ok(())
    }

    /// Resolve the wallet host, document URL and origin.
    ///
    /// `page_hostname` is the hostname of the embedding page, used to pick the
    /// development wallet when the app itself runs on localhost.
    pub fn resolve(&self, page_hostname: Option<&str>) -> Result<ResolvedConfig, ConfigError> {
        let host_str = match self.host.as_deref() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => default_host(page_hostname),
        };

        let host = parse_host(&host_str)?;
        let wallet_url = Url::parse(&format!(
            "{}{}",
            host_str.trim_end_matches('/'),
            WALLET_PATH
        ))
        .map_err(|e| ConfigError::invalid(format!("Invalid wallet URL for {host_str}: {e}")))?;
        let origin = Origin::from_url(&wallet_url)?;

        debug!("Resolved wallet URL {wallet_url} (origin {origin})");

        Ok(ResolvedConfig {
            host,
            wallet_url,
            origin,
            prefer_popup: self.prefer_popup,
        })
    }
}

/// Wallet host used when none is configured.
///
/// Development pages (`localhost`, `127.0.0.1`) talk to the wallet on
/// `http://localhost:3001`. Otherwise `LIQUIDROUTE_WALLET_HOST` (process
/// environment or `.env`) wins over the production host.
pub fn default_host(page_hostname: Option<&str>) -> String {
    if let Some(hostname) = page_hostname {
        if DEV_PAGE_HOSTNAMES.contains(&hostname) {
            return DEV_WALLET_HOST.to_string();
        }
    }

    match dotenvy::var(WALLET_HOST_ENV) {
        Ok(host) if !host.trim().is_empty() => host.trim().to_string(),
        _ => PRODUCTION_WALLET_HOST.to_string(),
    }
}

fn parse_host(host: &str) -> Result<Url, ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::invalid("host cannot be empty string"));
    }

    let url = Url::parse(host)
        .map_err(|e| ConfigError::invalid(format!("Invalid host URL '{host}': {e}")))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::invalid(format!(
            "Invalid host scheme '{}' (expected http or https)",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::invalid(format!("Host URL has no hostname: {host}")));
    }

    Ok(url)
}
