//! Cross-document transport layer.
//!
//! The bridge never touches the platform directly. A [`Host`] provides the
//! primitives (create an embedded frame, open a window, listen for messages)
//! and a [`Transport`] turns them into a channel bound to one origin.
//!
//! # Variants
//!
//! - [`EmbeddedTransport`]: iframe inside an overlay container on the page
//! - [`DetachedTransport`]: separate top-level popup window
//!
//! The variant is chosen once per dialog by [`select_kind`] and never changes.
//!
//! # Hosts
//!
//! - [`memory::MemoryHost`]: in-process host for tests and the demo app
//! - `web::BrowserHost` (wasm32 only): `web-sys` bindings

mod detached;
mod embedded;
pub mod memory;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use detached::DetachedTransport;
pub use embedded::EmbeddedTransport;

use crate::config::ResolvedConfig;
use crate::error::TransportError;
use crate::origin::Origin;
use crate::protocol::Envelope;

use std::rc::Rc;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use url::Url;

/// A message delivered by the platform, before any origin check.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub origin: String,
    pub data: Value,
}

pub type MessageListener = Rc<dyn Fn(InboundMessage)>;

/// Invoked when the user dismisses an embedded frame (backdrop click).
pub type DismissListener = Rc<dyn Fn()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// A remote browsing context that can receive posted messages.
pub trait RemoteContext {
    fn post_message(&self, envelope: &Envelope, target_origin: &Origin)
    -> Result<(), TransportError>;
}

/// An embedded frame plus the overlay container that hosts it.
pub trait FrameHandle: RemoteContext {
    fn set_visible(&self, visible: bool);
    fn remove(&self);
}

/// A separately opened top-level window.
pub trait WindowHandle: RemoteContext {
    fn is_closed(&self) -> bool;
    fn focus(&self);
    fn close(&self);
}

/// Platform primitives the bridge is built on.
///
/// Implementations must deliver inbound messages and dismissals from outside
/// any call into the host (event-loop semantics); listeners are never invoked
/// re-entrantly from `post_message`, `create_frame` or `open_window`.
pub trait Host {
    fn page_hostname(&self) -> Option<String>;
    fn user_agent(&self) -> Option<String>;
    fn is_secure_context(&self) -> bool;

    fn create_frame(
        &self,
        spec: &FrameSpec,
        on_dismiss: DismissListener,
    ) -> Result<Box<dyn FrameHandle>, TransportError>;

    /// `None` when the platform refused to open the window (popup blocker).
    fn open_window(&self, spec: &WindowSpec) -> Option<Box<dyn WindowHandle>>;

    fn add_message_listener(&self, listener: MessageListener) -> ListenerId;
    fn remove_message_listener(&self, id: ListenerId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Embedded,
    Detached,
}

/// Channel to the remote wallet document, bound to one origin for life.
pub trait Transport {
    fn kind(&self) -> TransportKind;
    fn origin(&self) -> &Origin;

    /// Makes sure a remote document exists, creating it hidden if needed.
    /// Returns `true` when the previous document is gone, in which case any
    /// earlier readiness no longer holds.
    fn ensure(&mut self) -> Result<bool, TransportError>;

    /// Shows (or focuses) the remote document, creating it if needed.
    /// Returns `true` on the same condition as [`Transport::ensure`].
    fn show(&mut self) -> Result<bool, TransportError>;

    /// Whether a remote document currently exists to be seen. A blocked or
    /// user-closed popup is not displayed.
    fn is_displayed(&self) -> bool;

    fn hide(&mut self);

    fn post(&mut self, envelope: &Envelope) -> Result<(), TransportError>;

    fn teardown(&mut self);
}

const FRAME_TITLE: &str = "LiquidRoute Wallet";
const FRAME_TEST_ID: &str = "liquidroute-wallet";
const FRAME_SANDBOX: &str =
    "allow-forms allow-scripts allow-same-origin allow-popups allow-popups-to-escape-sandbox";
const CONTAINER_CSS: &str = "position: fixed; top: 0; left: 0; right: 0; bottom: 0; \
    z-index: 2147483647; background: rgba(0, 0, 0, 0.5); backdrop-filter: blur(4px); \
    display: none;";
const FRAME_CSS: &str = "position: absolute; top: 50%; left: 50%; \
    transform: translate(-50%, -50%); width: 440px; max-width: 95vw; height: 680px; \
    max-height: 95vh; border: none; border-radius: 16px; background: white; \
    box-shadow: 0 25px 50px -12px rgba(0, 0, 0, 0.25);";

const WINDOW_NAME: &str = "liquidroute-wallet";
const WINDOW_FEATURES: &str = "width=440,height=680,resizable,scrollbars=yes";

/// Everything a host needs to build the embedded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSpec {
    pub url: Url,
    pub title: &'static str,
    pub test_id: &'static str,
    /// Permissions policy (`allow` attribute).
    pub allow: String,
    pub sandbox: &'static str,
    pub container_css: &'static str,
    pub frame_css: &'static str,
}

impl FrameSpec {
    /// WebAuthn is delegated to the wallet origin only; Firefox rejects
    /// `clipboard-write` in the allow list so it is left out there.
    pub fn new(url: &Url, origin: &Origin, user_agent: Option<&str>) -> Self {
        let mut allow = vec![
            format!("publickey-credentials-get {origin}"),
            format!("publickey-credentials-create {origin}"),
        ];
        if !user_agent.is_some_and(is_firefox) {
            allow.push("clipboard-write".to_string());
        }

        Self {
            url: url.clone(),
            title: FRAME_TITLE,
            test_id: FRAME_TEST_ID,
            allow: allow.join("; "),
            sandbox: FRAME_SANDBOX,
            container_css: CONTAINER_CSS,
            frame_css: FRAME_CSS,
        }
    }
}

/// Everything a host needs to open the popup window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSpec {
    pub url: Url,
    pub name: &'static str,
    pub features: &'static str,
}

impl WindowSpec {
    pub fn new(url: &Url) -> Self {
        Self {
            url: url.clone(),
            name: WINDOW_NAME,
            features: WINDOW_FEATURES,
        }
    }
}

static SAFARI: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)safari").expect("valid regex"));
static NOT_SAFARI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)chrome|android").expect("valid regex"));
static FIREFOX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)firefox").expect("valid regex"));

/// Safari proper; Chrome and Android browsers also advertise "Safari".
pub fn is_safari(user_agent: &str) -> bool {
    SAFARI.is_match(user_agent) && !NOT_SAFARI.is_match(user_agent)
}

pub fn is_firefox(user_agent: &str) -> bool {
    FIREFOX.is_match(user_agent)
}

/// Whether an embedded frame can host the wallet.
///
/// Safari does not allow WebAuthn inside cross-origin iframes, and outside a
/// secure context only a localhost wallet can be framed.
pub fn is_iframe_supported(host: &dyn Host, wallet_host: &Url) -> bool {
    if host.user_agent().as_deref().is_some_and(is_safari) {
        debug!("Safari detected, iframe transport unsupported");
        return false;
    }

    let wallet_is_localhost = wallet_host
        .host_str()
        .is_some_and(|h| h.contains("localhost"));
    if !host.is_secure_context() && !wallet_is_localhost {
        debug!("Insecure context with remote wallet host, iframe transport unsupported");
        return false;
    }

    true
}

pub fn select_kind(config: &ResolvedConfig, host: &dyn Host) -> TransportKind {
    if config.prefer_popup || !is_iframe_supported(host, &config.host) {
        TransportKind::Detached
    } else {
        TransportKind::Embedded
    }
}
