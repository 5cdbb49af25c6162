//! Client error types.

use bhojpur_protocol::ErrorObject;
use serde_json::Value;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors surfaced by the connection bootstrap and by remote calls.
///
/// Nothing is retried internally; every failure reaches the immediate
/// caller (or the awaiter of the affected call).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The remote proxy was read before the handshake bound it.
    #[error("not connected to Bhojpur server")]
    NotConnected,

    /// A remote proxy was bound twice.
    #[error("remote server proxy is already bound")]
    AlreadyBound,

    /// `connect` was called while a session is still open.
    #[error("a session is already open; close it before connecting again")]
    AlreadyConnected,

    /// The endpoint is not a usable WebSocket address.
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// The rejected endpoint.
        endpoint: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A handshake header name or value contains bytes HTTP does not allow.
    #[error("invalid handshake header '{name}': {reason}")]
    InvalidHeader {
        /// Header name.
        name: String,
        /// Validation failure.
        reason: String,
    },

    /// The WebSocket handshake or socket failed.
    #[error("websocket transport error: {0}")]
    Transport(#[source] Box<tungstenite::Error>),

    /// The server answered a call with an error frame.
    #[error("{method} failed: [{code}] {message}")]
    Rpc {
        /// Method that failed.
        method: String,
        /// JSON-RPC error code.
        code: i64,
        /// Server message.
        message: String,
        /// Optional structured details.
        data: Option<Value>,
    },

    /// The session closed while the call was pending (or before it was sent).
    #[error("session closed before a response arrived")]
    SessionClosed,

    /// The result did not have the expected shape.
    #[error("failed to decode {method} result: {source}")]
    Decode {
        /// Method whose result failed to decode.
        method: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// The request parameters could not be serialized.
    #[error("failed to encode {method} request: {source}")]
    Encode {
        /// Method whose request failed to encode.
        method: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

/// Coarse classification of a [`ClientError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Programmer error: API used out of order.
    Sequencing,
    /// Could not establish or use the transport.
    Transport,
    /// Remote side rejected a specific call.
    Rpc,
    /// Pending call cut off by session shutdown.
    SessionClosed,
    /// Payload (de)serialization failed.
    Codec,
}

impl ClientError {
    /// Build an [`ClientError::Rpc`] from a server error object.
    pub fn rpc(method: impl Into<String>, error: ErrorObject) -> Self {
        Self::Rpc {
            method: method.into(),
            code: error.code,
            message: error.message,
            data: error.data,
        }
    }

    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotConnected | Self::AlreadyBound | Self::AlreadyConnected => {
                ErrorKind::Sequencing
            }
            Self::InvalidEndpoint { .. }
            | Self::InvalidHeader { .. }
            | Self::Transport(_) => ErrorKind::Transport,
            Self::Rpc { .. } => ErrorKind::Rpc,
            Self::SessionClosed => ErrorKind::SessionClosed,
            Self::Decode { .. } | Self::Encode { .. } => ErrorKind::Codec,
        }
    }
}

impl From<tungstenite::Error> for ClientError {
    fn from(err: tungstenite::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
