//! Subscriber registry for session events.
//!
//! Handlers are invoked synchronously, in subscription order, on the thread
//! that applied the state change. The registry hands out a snapshot of
//! handlers so callers can release their own borrows before invoking them;
//! a handler may subscribe or unsubscribe without affecting the current
//! delivery.

use crate::session::AccountId;

use std::hash::Hash;
use std::rc::Rc;

/// Events that can be dispatched through an [`EventRegistry`].
pub trait Event {
    type Kind: Copy + Eq + Hash + std::fmt::Debug;

    fn kind(&self) -> Self::Kind;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Handler<E> = Rc<dyn Fn(&E)>;

struct Subscription<E: Event> {
    id: SubscriptionId,
    kind: E::Kind,
    handler: Handler<E>,
}

pub struct EventRegistry<E: Event> {
    next_id: u64,
    subscriptions: Vec<Subscription<E>>,
}

impl<E: Event> Default for EventRegistry<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            subscriptions: Vec::new(),
        }
    }
}

impl<E: Event> EventRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: E::Kind, handler: Handler<E>) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscriptions.push(Subscription { id, kind, handler });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    pub fn handlers_for(&self, kind: E::Kind) -> Vec<Handler<E>> {
        self.subscriptions
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| Rc::clone(&s.handler))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}

/// Invokes a snapshot of handlers. Never call while holding a borrow of the
/// state the handlers may touch.
pub fn dispatch<E: Event>(handlers: &[Handler<E>], event: &E) {
    for handler in handlers {
        handler(event);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connect,
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    Connect(AccountId),
    Disconnect,
}

impl Event for WalletEvent {
    type Kind = EventKind;

    fn kind(&self) -> EventKind {
        match self {
            WalletEvent::Connect(_) => EventKind::Connect,
            WalletEvent::Disconnect => EventKind::Disconnect,
        }
    }
}
