//! Wire protocol spoken with the remote wallet document.
//!
//! Every cross-document message is an [`Envelope`] `{ topic, payload }`. The
//! RPC layer rides on two topics: `rpc-request` (payload [`RpcRequest`]) and
//! `rpc-response` (payload [`RpcResponse`]). `ready` and `close` are control
//! topics sent by the wallet without RPC semantics.

use crate::error::WalletError;
use crate::session::AccountId;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Message topics understood on the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Ready,
    Close,
    RpcRequest,
    RpcResponse,
    Success,
    Internal,
}

impl Topic {
    pub const fn as_str(self) -> &'static str {
        match self {
            Topic::Ready => "ready",
            Topic::Close => "close",
            Topic::RpcRequest => "rpc-request",
            Topic::RpcResponse => "rpc-response",
            Topic::Success => "success",
            Topic::Internal => "__internal",
        }
    }

    /// Parses a wire topic. Unknown topics yield `None` and are ignored by the dialog.
    pub fn from_wire(topic: &str) -> Option<Self> {
        match topic {
            "ready" => Some(Topic::Ready),
            "close" => Some(Topic::Close),
            "rpc-request" => Some(Topic::RpcRequest),
            "rpc-response" => Some(Topic::RpcResponse),
            "success" => Some(Topic::Success),
            "__internal" => Some(Topic::Internal),
            _ => None,
        }
    }
}

/// `{ topic, payload }` message posted across the origin boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub topic: String,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    pub fn new(topic: Topic, payload: Value) -> Self {
        Self {
            topic: topic.as_str().to_string(),
            payload,
        }
    }

    pub fn ready() -> Self {
        Self::new(Topic::Ready, Value::Null)
    }

    pub fn request(request: &RpcRequest) -> Result<Self, serde_json::Error> {
        Ok(Self::new(Topic::RpcRequest, serde_json::to_value(request)?))
    }

    pub fn response(response: &RpcResponse) -> Result<Self, serde_json::Error> {
        Ok(Self::new(Topic::RpcResponse, serde_json::to_value(response)?))
    }

    pub fn topic(&self) -> Option<Topic> {
        Topic::from_wire(&self.topic)
    }

    /// Request id carried by an `rpc-request` envelope.
    pub fn request_id(&self) -> Option<&str> {
        match self.topic() {
            Some(Topic::RpcRequest) => self.payload.get("id").and_then(Value::as_str),
            _ => None,
        }
    }
}

/// RPC method names. Anything outside the catalogue passes through as [`Method::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Connect,
    Disconnect,
    SignMessage,
    SignTransaction,
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Connect => "connect",
            Method::Disconnect => "disconnect",
            Method::SignMessage => "signMessage",
            Method::SignTransaction => "signTransaction",
            Method::Other(name) => name,
        }
    }

    /// Interactive methods need the dialog visible so the user can act.
    pub fn is_interactive(&self) -> bool {
        matches!(
            self,
            Method::Connect | Method::SignMessage | Method::SignTransaction
        )
    }
}

impl From<&str> for Method {
    fn from(name: &str) -> Self {
        match name {
            "connect" => Method::Connect,
            "disconnect" => Method::Disconnect,
            "signMessage" => Method::SignMessage,
            "signTransaction" => Method::SignTransaction,
            other => Method::Other(other.to_string()),
        }
    }
}

impl From<String> for Method {
    fn from(name: String) -> Self {
        Method::from(name.as_str())
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Method {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Method {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Method::from)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: String,
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
    #[serde(
        rename = "_request",
        alias = "originatingRequest",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub originating_request: Option<RpcRequest>,
}

impl RpcResponse {
    pub fn success(request: &RpcRequest, result: Value) -> Self {
        Self {
            id: request.id.clone(),
            result: Some(result),
            error: None,
            originating_request: Some(request.clone()),
        }
    }

    pub fn failure(request: &RpcRequest, code: i64, message: impl Into<String>) -> Self {
        Self {
            id: request.id.clone(),
            result: None,
            error: Some(RpcErrorObject {
                code,
                message: message.into(),
                data: None,
            }),
            originating_request: Some(request.clone()),
        }
    }

    /// `Err` when the wallet reported a failure; `error` wins over `result`.
    pub fn outcome(&self) -> Result<Value, RpcErrorObject> {
        match &self.error {
            Some(error) => Err(error.clone()),
            None => Ok(self.result.clone().unwrap_or(Value::Null)),
        }
    }
}

/// Well-known wallet error codes (EIP-1193 numbering, shared by the remote wallet).
pub mod codes {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNAUTHORIZED: i64 = 4100;
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    pub const DISCONNECTED: i64 = 4900;
    pub const INVALID_PARAMS: i64 = -32602;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectResult {
    #[serde(alias = "publicKey")]
    pub account: AccountId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignMessageParams {
    pub message: String,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignMessageResult {
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignTransactionParams {
    pub transaction: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignTransactionResult {
    pub signed_transaction: String,
}

/// Decodes a successful RPC result into the method's typed result.
pub fn decode_result<T: DeserializeOwned>(method: &Method, value: Value) -> Result<T, WalletError> {
    serde_json::from_value(value)
        .map_err(|e| WalletError::protocol(format!("Malformed {method} result: {e}")))
}
