//! Signer-adapter shim over [`Wallet`].
//!
//! Wallet-adapter frameworks expect a long-lived object with a ready state,
//! a `connecting` flag and error events. [`LiquidRouteAdapter`] provides that
//! surface and creates the underlying [`Wallet`] only on first connect, so
//! constructing an adapter touches nothing on the page.

use crate::codec::WalletTransaction;
use crate::config::WalletConfig;
use crate::error::{SdkError, WalletError};
use crate::events::{
    Event, EventKind as WalletEventKind, EventRegistry, SubscriptionId, WalletEvent, dispatch,
};
use crate::session::AccountId;
use crate::transport::Host;
use crate::wallet::Wallet;
use crate::{PRODUCTION_WALLET_HOST, WALLET_NAME};

use std::cell::{Cell, RefCell};
use std::fmt::Display;
use std::rc::Rc;

use log::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// Nothing installed; the wallet loads on demand.
    Loadable,
    /// A wallet session has been established at least once.
    Installed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterEventKind {
    Connect,
    Disconnect,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterEvent {
    Connect(AccountId),
    Disconnect,
    Error(String),
}

impl Event for AdapterEvent {
    type Kind = AdapterEventKind;

    fn kind(&self) -> AdapterEventKind {
        match self {
            AdapterEvent::Connect(_) => AdapterEventKind::Connect,
            AdapterEvent::Disconnect => AdapterEventKind::Disconnect,
            AdapterEvent::Error(_) => AdapterEventKind::Error,
        }
    }
}

/// Submits signed transaction bytes to a network.
#[allow(async_fn_in_trait)]
pub trait RawTransactionSender {
    type Signature;
    type Error: Display;

    async fn send_raw_transaction(&self, bytes: Vec<u8>) -> Result<Self::Signature, Self::Error>;
}

/// The conventional signer interface.
#[allow(async_fn_in_trait)]
pub trait SignerAdapter {
    fn name(&self) -> &'static str;
    fn url(&self) -> &'static str;
    fn ready_state(&self) -> ReadyState;
    fn account(&self) -> Option<AccountId>;
    fn connecting(&self) -> bool;
    fn connected(&self) -> bool;

    async fn connect(&self) -> Result<(), SdkError>;
    async fn disconnect(&self) -> Result<(), SdkError>;
    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, SdkError>;
    async fn sign_transaction<T: WalletTransaction>(&self, transaction: &T)
    -> Result<T, SdkError>;
    async fn sign_all_transactions<T: WalletTransaction>(
        &self,
        transactions: &[T],
    ) -> Result<Vec<T>, SdkError>;
    async fn send_transaction<T: WalletTransaction, S: RawTransactionSender>(
        &self,
        transaction: &T,
        sender: &S,
    ) -> Result<S::Signature, SdkError>;
}

pub struct LiquidRouteAdapter {
    config: WalletConfig,
    host: Rc<dyn Host>,
    wallet: RefCell<Option<Rc<Wallet>>>,
    account: Rc<RefCell<Option<AccountId>>>,
    events: Rc<RefCell<EventRegistry<AdapterEvent>>>,
    connecting: Cell<bool>,
    ready_state: Cell<ReadyState>,
}

impl LiquidRouteAdapter {
    pub fn new(config: WalletConfig, host: Rc<dyn Host>) -> Self {
        Self {
            config,
            host,
            wallet: RefCell::new(None),
            account: Rc::new(RefCell::new(None)),
            events: Rc::new(RefCell::new(EventRegistry::new())),
            connecting: Cell::new(false),
            ready_state: Cell::new(ReadyState::Loadable),
        }
    }

    /// Only legacy transactions are signed.
    pub fn supports_versioned_transactions(&self) -> bool {
        false
    }

    /// The wrapped wallet, once created by `connect`.
    pub fn wallet(&self) -> Option<Rc<Wallet>> {
        self.wallet.borrow().clone()
    }

    pub fn on(
        &self,
        kind: AdapterEventKind,
        handler: impl Fn(&AdapterEvent) + 'static,
    ) -> SubscriptionId {
        self.events.borrow_mut().subscribe(kind, Rc::new(handler))
    }

    pub fn off(&self, id: SubscriptionId) -> bool {
        self.events.borrow_mut().unsubscribe(id)
    }

    fn emit(events: &RefCell<EventRegistry<AdapterEvent>>, event: AdapterEvent) {
        let handlers = events.borrow().handlers_for(event.kind());
        dispatch(&handlers, &event);
    }

    /// Emits the failure as an error event and hands it back.
    fn fail(&self, error: impl Into<SdkError>) -> SdkError {
        let error = error.into();
        warn!("Wallet adapter error: {error}");
        Self::emit(&self.events, AdapterEvent::Error(error.to_string()));
        error
    }

    fn connected_wallet(&self) -> Result<Rc<Wallet>, SdkError> {
        match self.wallet() {
            Some(wallet) if self.connected() => Ok(wallet),
            _ => Err(WalletError::not_connected().into()),
        }
    }

    fn wallet_or_init(&self) -> Result<Rc<Wallet>, SdkError> {
        if let Some(wallet) = self.wallet() {
            return Ok(wallet);
        }

        let wallet = Rc::new(Wallet::new(self.config.clone(), Rc::clone(&self.host))?);

        let account = Rc::clone(&self.account);
        let events = Rc::clone(&self.events);
        wallet.on(WalletEventKind::Connect, move |event| {
            if let WalletEvent::Connect(id) = event {
                *account.borrow_mut() = Some(id.clone());
                Self::emit(&events, AdapterEvent::Connect(id.clone()));
            }
        });

        let account = Rc::clone(&self.account);
        let events = Rc::clone(&self.events);
        wallet.on(WalletEventKind::Disconnect, move |_| {
            if account.borrow_mut().take().is_some() {
                Self::emit(&events, AdapterEvent::Disconnect);
            }
        });

        debug!("Wallet created for adapter");
        *self.wallet.borrow_mut() = Some(Rc::clone(&wallet));
        Ok(wallet)
    }

    async fn connect_inner(&self) -> Result<(), SdkError> {
        let wallet = self.wallet_or_init()?;
        let account = wallet.connect().await?;

        info!("Adapter connected as {}", account.short());
        *self.account.borrow_mut() = Some(account);
        self.ready_state.set(ReadyState::Installed);
        Ok(())
    }
}

impl SignerAdapter for LiquidRouteAdapter {
    fn name(&self) -> &'static str {
        WALLET_NAME
    }

    fn url(&self) -> &'static str {
        PRODUCTION_WALLET_HOST
    }

    fn ready_state(&self) -> ReadyState {
        self.ready_state.get()
    }

    fn account(&self) -> Option<AccountId> {
        self.account.borrow().clone()
    }

    fn connecting(&self) -> bool {
        self.connecting.get()
    }

    fn connected(&self) -> bool {
        self.wallet.borrow().is_some() && self.account.borrow().is_some()
    }

    async fn connect(&self) -> Result<(), SdkError> {
        if self.connected() || self.connecting() {
            debug!("Adapter connect ignored (connected or connecting)");
            return Ok(());
        }

        self.connecting.set(true);
        let result = self.connect_inner().await;
        self.connecting.set(false);
        result.map_err(|e| self.fail(e))
    }

    /// Disconnects and destroys the wallet; the next connect starts fresh.
    async fn disconnect(&self) -> Result<(), SdkError> {
        let wallet = self.wallet.borrow_mut().take();

        let mut result = Ok(());
        if let Some(wallet) = wallet {
            if wallet.is_connected() {
                result = wallet.disconnect().await;
            }
            wallet.destroy();
        }

        self.ready_state.set(ReadyState::Loadable);
        if self.account.borrow_mut().take().is_some() {
            Self::emit(&self.events, AdapterEvent::Disconnect);
        }

        result.map_err(|e| self.fail(e))
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, SdkError> {
        let wallet = self.connected_wallet()?;
        wallet.sign_message(message).await.map_err(|e| self.fail(e))
    }

    async fn sign_transaction<T: WalletTransaction>(
        &self,
        transaction: &T,
    ) -> Result<T, SdkError> {
        let wallet = self.connected_wallet()?;
        wallet
            .sign_transaction(transaction)
            .await
            .map_err(|e| self.fail(e))
    }

    async fn sign_all_transactions<T: WalletTransaction>(
        &self,
        transactions: &[T],
    ) -> Result<Vec<T>, SdkError> {
        let mut signed = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            signed.push(self.sign_transaction(transaction).await?);
        }
        Ok(signed)
    }

    async fn send_transaction<T: WalletTransaction, S: RawTransactionSender>(
        &self,
        transaction: &T,
        sender: &S,
    ) -> Result<S::Signature, SdkError> {
        let wallet = self.connected_wallet()?;

        let signed = wallet
            .sign_transaction(transaction)
            .await
            .map_err(|e| self.fail(e))?;
        let bytes = signed.serialize_unchecked().map_err(|e| self.fail(e))?;

        sender
            .send_raw_transaction(bytes)
            .await
            .map_err(|e| self.fail(SdkError::send(e.to_string())))
    }
}
