//! # bhojpur-protocol
//!
//! Wire vocabulary shared by the Bhojpur Server client crates:
//!
//! - **JSON-RPC 2.0 envelopes**: [`Request`], [`Response`], [`Notification`],
//!   and the [`Incoming`] classifier for frames read off the socket
//! - **Error objects**: [`ErrorObject`] with the standard reserved codes
//! - **Method names**: the Bhojpur function names in [`methods`]
//! - **Entities**: [`User`], [`SendHeartBeatOptions`], [`ApplicationInstance`]

#![deny(unsafe_code)]

pub mod entities;
pub mod jsonrpc;
pub mod methods;

pub use entities::{
    ApplicationInstance, ApplicationInstanceStatus, Identity, SendHeartBeatOptions, User,
};
pub use jsonrpc::{ErrorObject, Incoming, Notification, Request, RequestId, Response};
