use crate::error::TransportError;
use crate::origin::Origin;
use crate::protocol::Envelope;
use crate::transport::{DismissListener, FrameHandle, FrameSpec, Host, Transport, TransportKind};

use std::rc::Rc;

use log::{debug, info};
use url::Url;

/// Wallet document inside an iframe overlaid on the embedding page.
///
/// The container and frame are created on first use and then only shown or
/// hidden, so reopening the dialog keeps the wallet document (and its
/// readiness) alive.
pub struct EmbeddedTransport {
    host: Rc<dyn Host>,
    spec: FrameSpec,
    origin: Origin,
    on_dismiss: DismissListener,
    frame: Option<Box<dyn FrameHandle>>,
}

impl EmbeddedTransport {
    pub fn new(
        host: Rc<dyn Host>,
        wallet_url: &Url,
        origin: Origin,
        on_dismiss: DismissListener,
    ) -> Self {
        let spec = FrameSpec::new(wallet_url, &origin, host.user_agent().as_deref());
        Self {
            host,
            spec,
            origin,
            on_dismiss,
            frame: None,
        }
    }

    fn frame(&mut self) -> Result<(&dyn FrameHandle, bool), TransportError> {
        let fresh = if self.frame.is_none() {
            let frame = self
                .host
                .create_frame(&self.spec, Rc::clone(&self.on_dismiss))?;
            info!("Embedded wallet frame created for {}", self.spec.url);
            self.frame = Some(frame);
            true
        } else {
            false
        };

        match self.frame.as_deref() {
            Some(frame) => Ok((frame, fresh)),
            None => Err(TransportError::mount("Embedded frame missing after creation")),
        }
    }
}

impl Transport for EmbeddedTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Embedded
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }

    fn ensure(&mut self) -> Result<bool, TransportError> {
        self.frame().map(|(_, fresh)| fresh)
    }

    fn show(&mut self) -> Result<bool, TransportError> {
        let (frame, fresh) = self.frame()?;
        frame.set_visible(true);
        Ok(fresh)
    }

    fn is_displayed(&self) -> bool {
        self.frame.is_some()
    }

    fn hide(&mut self) {
        if let Some(frame) = self.frame.as_deref() {
            frame.set_visible(false);
        }
    }

    fn post(&mut self, envelope: &Envelope) -> Result<(), TransportError> {
        let origin = self.origin.clone();
        let (frame, _) = self.frame()?;
        debug!("Posting '{}' to embedded wallet", envelope.topic);
        frame.post_message(envelope, &origin)
    }

    fn teardown(&mut self) {
        if let Some(frame) = self.frame.take() {
            frame.remove();
            info!("Embedded wallet frame removed");
        }
    }
}
