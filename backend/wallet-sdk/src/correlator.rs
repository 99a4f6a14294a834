//! Request/response correlation.
//!
//! Every outgoing request gets a fresh id and a one-shot completion. Responses
//! are matched purely by id, so they may arrive in any order.

use crate::error::WalletError;
use crate::protocol::{Method, RpcErrorObject, RpcRequest, RpcResponse};

use std::collections::HashMap;

use log::{debug, warn};
use serde_json::Value;
use tokio::sync::oneshot;

type Completion = oneshot::Sender<Result<Value, WalletError>>;

struct PendingEntry {
    request: RpcRequest,
    interactive: bool,
    completion: Completion,
}

/// The receiving half of a pending request.
#[derive(Debug)]
pub struct PendingResponse {
    id: String,
    receiver: oneshot::Receiver<Result<Value, WalletError>>,
}

impl PendingResponse {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Waits for the wallet's answer. A completion dropped without an answer
    /// (wallet destroyed) surfaces as [`WalletError::Abandoned`].
    pub async fn wait(self) -> Result<Value, WalletError> {
        match self.receiver.await {
            Ok(result) => result,
            Err(_) => Err(WalletError::abandoned(self.id)),
        }
    }
}

/// A matched response, handed back so the caller can apply side effects.
#[derive(Debug)]
pub struct Resolution {
    pub request: RpcRequest,
    pub interactive: bool,
    pub result: Result<Value, RpcErrorObject>,
}

/// Table of requests awaiting an answer, keyed by id.
///
/// Ids are decimal strings counting up from 1 for each correlator and are
/// never reused. Each entry is completed exactly once: by its response, by a
/// local rejection, or by being dropped.
pub struct Correlator {
    next_id: u64,
    pending: HashMap<String, PendingEntry>,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            pending: HashMap::new(),
        }
    }

    /// Number of requests awaiting an answer.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    /// Builds a request with a fresh id without tracking it.
    pub fn next_request(&mut self, method: Method, params: Option<Value>) -> RpcRequest {
        let id = self.next_id.to_string();
        self.next_id += 1;
        RpcRequest { id, method, params }
    }

    /// Builds and tracks a request.
    ///
    /// Interactive requests are remembered as such so a dismissal can fail
    /// them without touching background calls.
    pub fn issue(
        &mut self,
        method: Method,
        params: Option<Value>,
    ) -> (RpcRequest, PendingResponse) {
        let request = self.next_request(method, params);
        let interactive = request.method.is_interactive();
        let (completion, receiver) = oneshot::channel();

        debug!("Issued request {} ({})", request.id, request.method);
        self.pending.insert(
            request.id.clone(),
            PendingEntry {
                request: request.clone(),
                interactive,
                completion,
            },
        );

        let pending = PendingResponse {
            id: request.id.clone(),
            receiver,
        };
        (request, pending)
    }

    /// Completes the pending request matching `response.id`.
    ///
    /// Returns `None` for unknown or already completed ids; those responses
    /// have no effect.
    pub fn resolve(&mut self, response: RpcResponse) -> Option<Resolution> {
        let Some(entry) = self.pending.remove(&response.id) else {
            warn!("Response for unknown request {} ignored", response.id);
            return None;
        };

        if let Some(echoed) = &response.originating_request {
            if echoed.method != entry.request.method {
                warn!(
                    "Response {} echoes method {} but request was {}",
                    response.id, echoed.method, entry.request.method
                );
            }
        }

        let result = response.outcome();
        let delivered = match &result {
            Ok(value) => Ok(value.clone()),
            Err(error) => Err(WalletError::remote(error.clone())),
        };
        if entry.completion.send(delivered).is_err() {
            debug!("Caller for request {} is gone", response.id);
        }

        Some(Resolution {
            request: entry.request,
            interactive: entry.interactive,
            result,
        })
    }

    /// Fails one pending request locally.
    pub fn reject(&mut self, id: &str, error: WalletError) -> bool {
        match self.pending.remove(id) {
            Some(entry) => {
                let _ = entry.completion.send(Err(error));
                true
            }
            None => false,
        }
    }

    /// Fails every pending interactive request, e.g. after the user closed the dialog.
    pub fn reject_interactive<F>(&mut self, error: F) -> usize
    where
        F: Fn(&str) -> WalletError,
    {
        let ids: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, entry)| entry.interactive)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &ids {
            self.reject(id, error(id));
        }
        ids.len()
    }

    /// Stops tracking a request whose send failed before it left the page.
    pub fn discard(&mut self, id: &str) -> bool {
        self.pending.remove(id).is_some()
    }

    /// Drops every completion; waiting callers observe [`WalletError::Abandoned`].
    pub fn abandon_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }
}
