//! Presentation lifecycle of the remote wallet.
//!
//! A [`Dialog`] owns the transport and readiness gate for one wallet session.
//! Its resources are created on first use and torn down exactly once:
//!
//! ```text
//! Uninitialized --open/send--> Initialized --destroy--> Destroyed
//! ```
//!
//! Visibility (`Closed`/`Open`) is tracked separately; the transport survives
//! a close so reopening the embedded frame is cheap.

use crate::error::{TransportError, WalletError};
use crate::gate::ReadinessGate;
use crate::origin::Origin;
use crate::protocol::{Envelope, RpcRequest, RpcResponse, Topic};
use crate::transport::{
    DetachedTransport, DismissListener, EmbeddedTransport, Host, InboundMessage, ListenerId,
    MessageListener, Transport, TransportKind,
};

use std::rc::Rc;

use log::{debug, error, info, warn};
use url::Url;

/// Whether the wallet is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Closed,
    Open,
}

/// A queued request that could not be delivered once the wallet became ready.
#[derive(Debug)]
pub struct FailedSend {
    pub request_id: String,
    pub error: TransportError,
}

/// What an accepted inbound message means for the wallet.
#[derive(Debug)]
pub enum DialogEvent {
    Ready(Vec<FailedSend>),
    Response(RpcResponse),
    Dismissed,
}

struct DialogResources {
    transport: Box<dyn Transport>,
    listener: ListenerId,
}

enum DialogState {
    Uninitialized,
    Initialized(DialogResources),
    Destroyed,
}

/// The wallet's presentation and transport for one bridge.
///
/// Owns the readiness gate: every request passes through it, so nothing
/// reaches a wallet document before that document has said `ready`.
pub struct Dialog {
    host: Rc<dyn Host>,
    kind: TransportKind,
    wallet_url: Url,
    origin: Origin,
    state: DialogState,
    visibility: Visibility,
    gate: ReadinessGate,
    on_message: MessageListener,
    on_dismiss: DismissListener,
}

impl Dialog {
    /// Creates an uninitialized dialog. `on_message` receives every platform
    /// message once the listener is installed; `on_dismiss` fires on a
    /// backdrop click.
    pub fn new(
        host: Rc<dyn Host>,
        kind: TransportKind,
        wallet_url: Url,
        origin: Origin,
        on_message: MessageListener,
        on_dismiss: DismissListener,
    ) -> Self {
        Self {
            host,
            kind,
            wallet_url,
            origin,
            state: DialogState::Uninitialized,
            visibility: Visibility::Closed,
            gate: ReadinessGate::new(),
            on_message,
            on_dismiss,
        }
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// What the user actually sees.
    ///
    /// An open dialog whose popup was blocked or closed by the user reports
    /// `Closed` until a window is back on screen.
    pub fn visibility(&self) -> Visibility {
        match &self.state {
            DialogState::Initialized(resources)
                if self.visibility == Visibility::Open && !resources.transport.is_displayed() =>
            {
                Visibility::Closed
            }
            _ => self.visibility,
        }
    }

    pub fn is_open(&self) -> bool {
        self.visibility() == Visibility::Open
    }

    /// Whether the current wallet document has announced `ready`.
    pub fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    /// Whether transport and listener exist.
    pub fn is_initialized(&self) -> bool {
        matches!(self.state, DialogState::Initialized(_))
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self.state, DialogState::Destroyed)
    }

    /// Shows the wallet, creating transport and listener on first use.
    ///
    /// A blocked popup is not an error. The dialog stays open in intent, so a
    /// window opened by a later send is closed again with it.
    ///
    /// # Errors
    ///
    /// Returns an error if the dialog was destroyed or the frame could not be
    /// mounted.
    pub fn open(&mut self) -> Result<(), WalletError> {
        self.initialize()?;
        let Some((transport, gate)) = self.parts() else {
            return Err(WalletError::destroyed());
        };

        if transport.show()? {
            gate.reset();
        }

        if self.visibility == Visibility::Closed {
            debug!("Dialog opened");
        }
        self.visibility = Visibility::Open;
        Ok(())
    }

    /// Hides the wallet. Closing a popup also forgets its readiness.
    pub fn close(&mut self) {
        if self.visibility == Visibility::Closed {
            return;
        }

        if let Some((transport, gate)) = self.parts() {
            transport.hide();
            // A hidden popup is a closed popup; its successor must announce itself.
            if transport.kind() == TransportKind::Detached {
                gate.reset();
            }
        }
        self.visibility = Visibility::Closed;
        debug!("Dialog closed");
    }

    /// User-initiated close. Returns whether the dialog was open.
    pub fn dismiss(&mut self) -> bool {
        let was_open = self.visibility == Visibility::Open;
        self.close();
        info!("Dialog dismissed by user");
        was_open
    }

    /// Tears everything down. The dialog cannot be used afterwards.
    pub fn destroy(&mut self) {
        if let DialogState::Initialized(mut resources) =
            std::mem::replace(&mut self.state, DialogState::Destroyed)
        {
            resources.transport.teardown();
            self.host.remove_message_listener(resources.listener);
        }

        self.visibility = Visibility::Closed;
        let dropped = self.gate.clear();
        if dropped > 0 {
            debug!("Dropped {dropped} queued message(s) on destroy");
        }
        info!("Dialog destroyed");
    }

    /// Posts a request through the readiness gate. Interactive requests also
    /// make the dialog visible.
    ///
    /// Before the current document is ready the request is queued and goes
    /// out, in order, when `ready` arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be encoded, the dialog was
    /// destroyed, or the transport refuses the post.
    pub fn send_request(
        &mut self,
        request: &RpcRequest,
        interactive: bool,
    ) -> Result<(), WalletError> {
        let envelope = Envelope::request(request).map_err(TransportError::from)?;

        if interactive {
            self.open()?;
        } else {
            self.initialize()?;
        }

        let Some((transport, gate)) = self.parts() else {
            return Err(WalletError::destroyed());
        };

        if !interactive && transport.ensure()? {
            gate.reset();
        }

        if let Some(envelope) = gate.submit(envelope) {
            transport.post(&envelope)?;
        }
        Ok(())
    }

    /// Best-effort send that never creates, shows or queues anything.
    /// Returns whether the request was posted.
    pub fn notify(&mut self, request: &RpcRequest) -> Result<bool, WalletError> {
        let envelope = Envelope::request(request).map_err(TransportError::from)?;
        let Some((transport, gate)) = self.parts() else {
            return Ok(false);
        };
        if !gate.is_ready() {
            return Ok(false);
        }

        transport.post(&envelope)?;
        Ok(true)
    }

    /// Filters and decodes a platform message.
    ///
    /// Messages from any origin other than the wallet's are dropped here and
    /// never reach the correlator.
    pub fn accept(&mut self, inbound: InboundMessage) -> Option<DialogEvent> {
        if !self.origin.matches(&inbound.origin) {
            warn!(
                "Rejected message from {}, expected {}",
                inbound.origin, self.origin
            );
            return None;
        }

        let envelope: Envelope = match serde_json::from_value(inbound.data) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!("Ignoring non-envelope message from {}: {}", inbound.origin, e);
                return None;
            }
        };

        match envelope.topic() {
            Some(Topic::Ready) => Some(DialogEvent::Ready(self.release())),
            Some(Topic::RpcResponse) => match serde_json::from_value(envelope.payload) {
                Ok(response) => Some(DialogEvent::Response(response)),
                Err(e) => {
                    warn!("Malformed rpc-response from wallet: {e}");
                    None
                }
            },
            Some(Topic::Close) => {
                self.dismiss();
                Some(DialogEvent::Dismissed)
            }
            Some(other) => {
                debug!("Ignoring '{}' message from wallet", other.as_str());
                None
            }
            None => {
                debug!("Ignoring unknown topic '{}'", envelope.topic);
                None
            }
        }
    }

    fn initialize(&mut self) -> Result<(), WalletError> {
        match self.state {
            DialogState::Initialized(_) => Ok(()),
            DialogState::Destroyed => Err(WalletError::destroyed()),
            DialogState::Uninitialized => {
                let transport: Box<dyn Transport> = match self.kind {
                    TransportKind::Embedded => Box::new(EmbeddedTransport::new(
                        Rc::clone(&self.host),
                        &self.wallet_url,
                        self.origin.clone(),
                        Rc::clone(&self.on_dismiss),
                    )),
                    TransportKind::Detached => Box::new(DetachedTransport::new(
                        Rc::clone(&self.host),
                        &self.wallet_url,
                        self.origin.clone(),
                    )),
                };
                let listener = self.host.add_message_listener(Rc::clone(&self.on_message));

                info!(
                    "Dialog initialized ({:?} transport, origin {})",
                    self.kind, self.origin
                );
                self.state = DialogState::Initialized(DialogResources {
                    transport,
                    listener,
                });
                Ok(())
            }
        }
    }

    fn parts(&mut self) -> Option<(&mut dyn Transport, &mut ReadinessGate)> {
        match &mut self.state {
            DialogState::Initialized(resources) => {
                Some((resources.transport.as_mut(), &mut self.gate))
            }
            _ => None,
        }
    }

    fn release(&mut self) -> Vec<FailedSend> {
        let Some((transport, gate)) = self.parts() else {
            return Vec::new();
        };

        let queued = gate.open();
        info!("Wallet ready, releasing {} queued message(s)", queued.len());

        let mut failed = Vec::new();
        for envelope in queued {
            if let Err(error) = transport.post(&envelope) {
                error!("Failed to deliver queued '{}': {}", envelope.topic, error);
                if let Some(id) = envelope.request_id() {
                    failed.push(FailedSend {
                        request_id: id.to_string(),
                        error,
                    });
                }
            }
        }
        failed
    }
}
