//! A stand-in for the remote wallet document.
//!
//! The simulator watches the in-memory host: every new frame or popup gets a
//! `ready`, and every posted request gets an answer according to its
//! [`Policy`]. Signatures are deterministic filler, not cryptography.

use wallet_sdk::codec;
use wallet_sdk::protocol::{Method, RpcRequest, codes};
use wallet_sdk::transport::memory::{MemoryHost, RemoteEndpoint};

use std::collections::HashSet;

use log::{debug, info, warn};
use serde_json::{Value, json};

const SIGNATURE_LEN: usize = 64;
const SIGNATURE_MASK: u8 = 0x5a;

/// How the simulated user responds to prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub account: String,
    /// Methods the simulated user rejects with code 4001.
    pub reject: HashSet<String>,
}

impl Policy {
    pub fn approve_all(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            reject: HashSet::new(),
        }
    }

    pub fn rejecting(mut self, method: impl Into<String>) -> Self {
        self.reject.insert(method.into());
        self
    }
}

pub struct SimulatedWallet {
    host: MemoryHost,
    remote: RemoteEndpoint,
    policy: Policy,
    documents: usize,
    batches: u64,
}

impl SimulatedWallet {
    pub fn new(host: MemoryHost, origin: &str, policy: Policy) -> Self {
        let remote = host.remote(origin);
        Self {
            host,
            remote,
            policy,
            documents: 0,
            batches: 0,
        }
    }

    /// Serves until the host's inbox closes or the task is aborted.
    pub async fn run(mut self) {
        info!("Simulated wallet serving {}", self.remote.origin());
        loop {
            tokio::select! {
                documents = self.host.next_document(self.documents) => {
                    self.documents = documents;
                    debug!("Simulated wallet document #{documents} loaded");
                    self.remote.signal_ready();
                }
                request = self.host.next_request() => match request {
                    Some(request) => self.answer(&request),
                    None => break,
                },
            }
        }
        info!("Simulated wallet stopped");
    }

    fn answer(&mut self, request: &RpcRequest) {
        let method = request.method.as_str();
        if self.policy.reject.contains(method) {
            info!("Simulated user rejected {method} ({})", request.id);
            self.remote
                .respond_err(request, codes::USER_REJECTED, "User rejected the request");
            return;
        }

        match self.result_for(request) {
            Ok(result) => self.remote.respond_ok(request, result),
            Err((code, message)) => {
                warn!("Simulated wallet failed {method}: {message}");
                self.remote.respond_err(request, code, &message);
            }
        }
    }

    fn result_for(&mut self, request: &RpcRequest) -> Result<Value, (i64, String)> {
        match &request.method {
            Method::Connect => Ok(json!({ "account": self.policy.account })),
            Method::Disconnect => Ok(Value::Null),
            Method::SignMessage => {
                let message = payload(request, "message")?;
                Ok(json!({ "signature": codec::encode(&signature_for(&message)) }))
            }
            Method::SignTransaction => {
                let transaction = payload(request, "transaction")?;
                let mut signed = signature_for(&transaction);
                signed.extend_from_slice(&transaction);
                Ok(json!({ "signedTransaction": codec::encode(&signed) }))
            }
            Method::Other(name) if name == "wallet_sendCalls" => {
                self.batches += 1;
                Ok(json!({ "id": format!("0x{:x}", self.batches) }))
            }
            Method::Other(name) => Err((
                codes::UNSUPPORTED_METHOD,
                format!("Method '{name}' is not supported"),
            )),
        }
    }
}

/// Decodes the base64 field `name` of the request params.
fn payload(request: &RpcRequest, name: &str) -> Result<Vec<u8>, (i64, String)> {
    let encoded = request
        .params
        .as_ref()
        .and_then(|params| params.get(name))
        .and_then(Value::as_str)
        .ok_or_else(|| (codes::INVALID_PARAMS, format!("Missing '{name}' param")))?;
    codec::decode(name, encoded).map_err(|e| (codes::INVALID_PARAMS, e.to_string()))
}

pub fn signature_for(bytes: &[u8]) -> Vec<u8> {
    (0..SIGNATURE_LEN)
        .map(|i| {
            let byte = if bytes.is_empty() { 0 } else { bytes[i % bytes.len()] };
            byte ^ SIGNATURE_MASK ^ i as u8
        })
        .collect()
}
