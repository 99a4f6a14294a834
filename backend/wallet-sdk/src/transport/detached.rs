use crate::error::TransportError;
use crate::origin::Origin;
use crate::protocol::Envelope;
use crate::transport::{Host, Transport, TransportKind, WindowHandle, WindowSpec};

use std::rc::Rc;

use log::{debug, info, warn};
use url::Url;

/// Wallet document in a separate popup window.
///
/// A hidden popup has no equivalent, so hiding closes the window and the next
/// send reopens it. Each reopen is a fresh document that must announce
/// readiness again.
pub struct DetachedTransport {
    host: Rc<dyn Host>,
    spec: WindowSpec,
    origin: Origin,
    window: Option<Box<dyn WindowHandle>>,
}

impl DetachedTransport {
    pub fn new(host: Rc<dyn Host>, wallet_url: &Url, origin: Origin) -> Self {
        Self {
            host,
            spec: WindowSpec::new(wallet_url),
            origin,
            window: None,
        }
    }

    fn live_window(&self) -> Option<&dyn WindowHandle> {
        self.window.as_deref().filter(|window| !window.is_closed())
    }

    /// Opens the popup when absent or closed by the user.
    ///
    /// Returns `true` whenever the previous document is gone, even if the
    /// browser blocked its replacement: readiness must be announced again
    /// either way. A blocked popup is logged and otherwise ignored.
    fn open_if_needed(&mut self) -> bool {
        if self.live_window().is_some() {
            return false;
        }

        match self.host.open_window(&self.spec) {
            Some(window) => {
                info!("Wallet popup opened for {}", self.spec.url);
                self.window = Some(window);
            }
            None => {
                warn!("Wallet popup for {} was blocked", self.spec.url);
                self.window = None;
            }
        }
        true
    }
}

impl Transport for DetachedTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Detached
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }

    fn ensure(&mut self) -> Result<bool, TransportError> {
        Ok(self.open_if_needed())
    }

    fn show(&mut self) -> Result<bool, TransportError> {
        let fresh = self.open_if_needed();
        if !fresh {
            if let Some(window) = self.live_window() {
                window.focus();
            }
        }
        Ok(fresh)
    }

    fn is_displayed(&self) -> bool {
        self.live_window().is_some()
    }

    fn hide(&mut self) {
        if let Some(window) = self.window.take() {
            window.close();
            debug!("Wallet popup closed");
        }
    }

    fn post(&mut self, envelope: &Envelope) -> Result<(), TransportError> {
        match self.live_window() {
            Some(window) => {
                debug!("Posting '{}' to wallet popup", envelope.topic);
                window.post_message(envelope, &self.origin)
            }
            None => {
                warn!(
                    "No wallet popup to receive '{}', message dropped",
                    envelope.topic
                );
                Ok(())
            }
        }
    }

    fn teardown(&mut self) {
        self.hide();
    }
}
