//! Readiness handshake.
//!
//! The wallet document announces itself with a `ready` message once its
//! scripts are running. Anything posted before that would be lost, so sends
//! are queued here and released in submission order when `ready` arrives.

use crate::protocol::Envelope;

use std::collections::VecDeque;

use log::debug;

#[derive(Debug, Default)]
pub struct ReadinessGate {
    ready: bool,
    pending: VecDeque<Envelope>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn queued(&self) -> usize {
        self.pending.len()
    }

    /// Hands the envelope back when it can go out now, otherwise queues it.
    ///
    /// An envelope never overtakes one that is already queued.
    pub fn submit(&mut self, envelope: Envelope) -> Option<Envelope> {
        if self.ready && self.pending.is_empty() {
            return Some(envelope);
        }

        debug!(
            "Remote not ready, queueing '{}' ({} queued)",
            envelope.topic,
            self.pending.len() + 1
        );
        self.pending.push_back(envelope);
        None
    }

    /// Marks the remote ready and returns the queued envelopes in FIFO order.
    ///
    /// A repeated `ready` returns nothing.
    pub fn open(&mut self) -> Vec<Envelope> {
        if self.ready {
            debug!("Duplicate ready signal ignored");
            return Vec::new();
        }
        self.ready = true;
        self.pending.drain(..).collect()
    }

    /// A new remote document replaced the old one; wait for its `ready`.
    /// Queued envelopes are kept for the new document.
    pub fn reset(&mut self) {
        self.ready = false;
    }

    /// Drops everything, used on teardown.
    pub fn clear(&mut self) -> usize {
        self.ready = false;
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}
