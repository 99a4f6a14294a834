//! The bridge client.
//!
//! [`Wallet`] is what applications hold. It owns one dialog, one correlator
//! and one session, all behind a single `Rc<RefCell<_>>` shared with the
//! platform message listener. Operations are `async` and suspend on a
//! one-shot completion until the wallet document answers.
//!
//! # Borrow discipline
//!
//! The shared state is never borrowed across an `.await`, and subscriber
//! handlers run only after the borrow that produced their event is released.

use crate::codec::{self, WalletTransaction};
use crate::config::{ResolvedConfig, WalletConfig};
use crate::correlator::Correlator;
use crate::dialog::{Dialog, DialogEvent, Visibility};
use crate::error::{ConfigError, WalletError};
use crate::events::{
    Event, EventKind, EventRegistry, Handler, SubscriptionId, WalletEvent, dispatch,
};
use crate::protocol::{
    ConnectResult, Method, RpcResponse, SignMessageParams, SignMessageResult,
    SignTransactionParams, SignTransactionResult, decode_result,
};
use crate::session::{AccountId, Session};
use crate::transport::{
    DismissListener, Host, InboundMessage, MessageListener, TransportKind, select_kind,
};

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::{debug, error, info, warn};
use serde_json::Value;

const MESSAGE_DISPLAY_UTF8: &str = "utf8";

type Emission = (Vec<Handler<WalletEvent>>, WalletEvent);

struct WalletState {
    session: Session,
    dialog: Dialog,
    correlator: Correlator,
    events: EventRegistry<WalletEvent>,
}

impl WalletState {
    fn emit(&self, event: WalletEvent) -> Emission {
        (self.events.handlers_for(event.kind()), event)
    }

    fn check_alive(&self) -> Result<(), WalletError> {
        if self.dialog.is_destroyed() {
            return Err(WalletError::destroyed());
        }
        Ok(())
    }

    /// Resolves the matching request and applies its session side effects.
    fn apply_response(&mut self, response: RpcResponse) -> Option<Emission> {
        let resolution = self.correlator.resolve(response)?;

        if resolution.interactive {
            self.dialog.close();
        }

        match (&resolution.request.method, resolution.result) {
            (Method::Connect, Ok(value)) => match serde_json::from_value::<ConnectResult>(value) {
                Ok(result) => {
                    info!("Connected to wallet as {}", result.account.short());
                    self.session.connect(result.account.clone());
                    Some(self.emit(WalletEvent::Connect(result.account)))
                }
                Err(e) => {
                    warn!("Connect result carried no account: {e}");
                    None
                }
            },
            (Method::Disconnect, outcome) => {
                if let Err(error) = outcome {
                    warn!(
                        "Wallet reported error on disconnect ({}), clearing session anyway",
                        error.code
                    );
                }
                self.session.clear();
                info!("Disconnected from wallet");
                Some(self.emit(WalletEvent::Disconnect))
            }
            (method, Err(error)) => {
                debug!(
                    "Request {} ({}) rejected: {} (code {})",
                    resolution.request.id, method, error.message, error.code
                );
                None
            }
            _ => None,
        }
    }

    fn reject_dismissed(&mut self) {
        let rejected = self
            .correlator
            .reject_interactive(|id| WalletError::dismissed(id));
        if rejected > 0 {
            info!("Rejected {rejected} pending request(s) after dismissal");
        }
    }
}

/// Client for one remote wallet session.
///
/// Every operation is a future that resolves when the wallet answers. There
/// is no built-in timeout; wrap calls in `tokio::time::timeout` where a
/// bound is needed. The client is single-threaded and must stay on the task
/// that created it.
pub struct Wallet {
    shared: Rc<RefCell<WalletState>>,
    config: ResolvedConfig,
}

impl Wallet {
    /// Resolves `config` against the host and picks the transport. Nothing is
    /// created on the page until the first operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the host URL is invalid or has no usable origin.
    pub fn new(config: WalletConfig, host: Rc<dyn Host>) -> Result<Self, ConfigError> {
        config.validate()?;
        let resolved = config.resolve(host.page_hostname().as_deref())?;
        let kind = select_kind(&resolved, host.as_ref());
        info!(
            "Wallet bridge for {} using {:?} transport",
            resolved.wallet_url, kind
        );

        let wallet_url = resolved.wallet_url.clone();
        let origin = resolved.origin.clone();
        let shared = Rc::new_cyclic(|weak: &Weak<RefCell<WalletState>>| {
            let on_message: MessageListener = {
                let weak = weak.clone();
                Rc::new(move |message: InboundMessage| {
                    if let Some(shared) = weak.upgrade() {
                        handle_inbound(&shared, message);
                    }
                })
            };
            let on_dismiss: DismissListener = {
                let weak = weak.clone();
                Rc::new(move || {
                    if let Some(shared) = weak.upgrade() {
                        handle_dismissal(&shared);
                    }
                })
            };

            RefCell::new(WalletState {
                session: Session::new(),
                dialog: Dialog::new(host, kind, wallet_url, origin, on_message, on_dismiss),
                correlator: Correlator::new(),
                events: EventRegistry::new(),
            })
        });

        Ok(Self {
            shared,
            config: resolved,
        })
    }

    /// The config this bridge was built with, host and origin resolved.
    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.shared.borrow().session.is_connected()
    }

    pub fn account(&self) -> Option<AccountId> {
        self.shared.borrow().session.account().cloned()
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.shared.borrow().dialog.kind()
    }

    /// Whether the wallet is on screen right now.
    pub fn dialog_visibility(&self) -> Visibility {
        self.shared.borrow().dialog.visibility()
    }

    /// Whether the current wallet document has announced `ready`.
    pub fn is_ready(&self) -> bool {
        self.shared.borrow().dialog.is_ready()
    }

    /// Requests sent and not yet answered, queued ones included.
    pub fn pending_requests(&self) -> usize {
        self.shared.borrow().correlator.pending()
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.borrow().dialog.is_destroyed()
    }

    /// Connects, or returns the current account without a round trip.
    ///
    /// Opens the dialog so the user can approve. On success the session is
    /// stored and `Connect` is emitted.
    ///
    /// # Errors
    ///
    /// Returns the wallet's rejection, [`WalletError::Dismissed`] if the user
    /// closes the dialog, or [`WalletError::Destroyed`] after `destroy`.
    pub async fn connect(&self) -> Result<AccountId, WalletError> {
        if let Some(account) = self.account() {
            debug!("Already connected as {}", account.short());
            return Ok(account);
        }

        let value = self.call(Method::Connect, None).await?;
        let result: ConnectResult = decode_result(&Method::Connect, value)?;
        Ok(result.account)
    }

    /// Ends the session. Never opens the dialog.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::NotConnected`] without a session.
    pub async fn disconnect(&self) -> Result<(), WalletError> {
        self.require_session()?;

        self.call(Method::Disconnect, None).await?;
        Ok(())
    }

    /// Signs arbitrary bytes and returns the raw signature.
    ///
    /// The message travels base64 encoded with a `utf8` display hint.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::NotConnected`] without a session, otherwise the
    /// same failures as any interactive call.
    pub async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, WalletError> {
        self.require_session()?;

        let params = SignMessageParams {
            message: codec::encode(message),
            display: MESSAGE_DISPLAY_UTF8.to_string(),
        };
        let value = self
            .call(Method::SignMessage, Some(serde_json::to_value(params)?))
            .await?;
        let result: SignMessageResult = decode_result(&Method::SignMessage, value)?;
        codec::decode("signature", &result.signature)
    }

    /// Signs a transaction and returns it rebuilt from the signed wire bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Unsupported`] for a transaction that cannot be
    /// serialized, before anything is sent.
    pub async fn sign_transaction<T: WalletTransaction>(
        &self,
        transaction: &T,
    ) -> Result<T, WalletError> {
        self.require_session()?;

        let bytes = transaction.serialize_unchecked()?;
        let params = SignTransactionParams {
            transaction: codec::encode(&bytes),
        };
        let value = self
            .call(Method::SignTransaction, Some(serde_json::to_value(params)?))
            .await?;
        let result: SignTransactionResult = decode_result(&Method::SignTransaction, value)?;
        let signed = codec::decode("signedTransaction", &result.signed_transaction)?;
        T::from_wire(&signed)
    }

    /// Signs one after another; the first failure stops the batch.
    pub async fn sign_all_transactions<T: WalletTransaction>(
        &self,
        transactions: &[T],
    ) -> Result<Vec<T>, WalletError> {
        self.require_session()?;

        let mut signed = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            signed.push(self.sign_transaction(transaction).await?);
        }
        Ok(signed)
    }

    /// Raw RPC pass-through. Session side effects still apply to
    /// `connect`/`disconnect` sent this way.
    pub async fn request(
        &self,
        method: impl Into<Method>,
        params: Option<Value>,
    ) -> Result<Value, WalletError> {
        self.call(method.into(), params).await
    }

    /// Subscribes to one kind of wallet event. Handlers run after the
    /// wallet's state is updated and may call back into the wallet.
    pub fn on(
        &self,
        kind: EventKind,
        handler: impl Fn(&WalletEvent) + 'static,
    ) -> SubscriptionId {
        self.shared
            .borrow_mut()
            .events
            .subscribe(kind, Rc::new(handler))
    }

    /// Removes a subscription. Returns `false` if it was already gone.
    pub fn off(&self, id: SubscriptionId) -> bool {
        self.shared.borrow_mut().events.unsubscribe(id)
    }

    /// Tears the bridge down for good.
    ///
    /// A connected session is ended locally (the wallet is told when its
    /// document is ready to hear it) and `Disconnect` is emitted. Pending
    /// callers resolve with [`WalletError::Abandoned`].
    pub fn destroy(&self) {
        let emission = {
            let Ok(mut state) = self.shared.try_borrow_mut() else {
                error!("Wallet busy, destroy skipped");
                return;
            };
            if state.dialog.is_destroyed() {
                return;
            }

            let emission = if state.session.is_connected() {
                let request = state.correlator.next_request(Method::Disconnect, None);
                match state.dialog.notify(&request) {
                    Ok(true) => debug!("Sent disconnect {} before teardown", request.id),
                    Ok(false) => debug!("Wallet not ready, skipped disconnect notice"),
                    Err(e) => warn!("Failed to notify wallet of disconnect: {e}"),
                }
                state.session.clear();
                Some(state.emit(WalletEvent::Disconnect))
            } else {
                None
            };

            state.dialog.destroy();
            state.events.clear();
            let abandoned = state.correlator.abandon_all();
            if abandoned > 0 {
                info!("Abandoned {abandoned} pending request(s)");
            }
            emission
        };

        if let Some((handlers, event)) = emission {
            dispatch(&handlers, &event);
        }
    }

    fn require_session(&self) -> Result<(), WalletError> {
        let state = self.shared.borrow();
        state.check_alive()?;
        if !state.session.is_connected() {
            return Err(WalletError::not_connected());
        }
        Ok(())
    }

    async fn call(&self, method: Method, params: Option<Value>) -> Result<Value, WalletError> {
        let pending = {
            let mut state = self.shared.borrow_mut();
            state.check_alive()?;

            let interactive = method.is_interactive();
            let (request, pending) = state.correlator.issue(method, params);
            if let Err(e) = state.dialog.send_request(&request, interactive) {
                error!("Failed to send request {}: {}", request.id, e);
                state.correlator.discard(&request.id);
                if interactive {
                    state.dialog.close();
                }
                return Err(e);
            }
            pending
        };

        pending.wait().await
    }
}

fn handle_inbound(shared: &RefCell<WalletState>, message: InboundMessage) {
    let emission = {
        let Ok(mut state) = shared.try_borrow_mut() else {
            error!("Wallet busy, message from {} dropped", message.origin);
            return;
        };

        match state.dialog.accept(message) {
            Some(DialogEvent::Ready(failed)) => {
                for failure in failed {
                    state
                        .correlator
                        .reject(&failure.request_id, WalletError::from(failure.error));
                }
                None
            }
            Some(DialogEvent::Response(response)) => state.apply_response(response),
            Some(DialogEvent::Dismissed) => {
                state.reject_dismissed();
                None
            }
            None => None,
        }
    };

    if let Some((handlers, event)) = emission {
        dispatch(&handlers, &event);
    }
}

fn handle_dismissal(shared: &RefCell<WalletState>) {
    let Ok(mut state) = shared.try_borrow_mut() else {
        error!("Wallet busy, dismissal dropped");
        return;
    };

    state.dialog.dismiss();
    state.reject_dismissed();
}
