//! Remote proxy: [`BhojpurServer`] calls turned into JSON-RPC requests.

use std::sync::Arc;

use bhojpur_protocol::{SendHeartBeatOptions, User, methods};
use serde::Serialize;
use serde::de::{DeserializeOwned, Error as _, Unexpected};
use serde_json::Value;

use crate::contract::{BhojpurServer, Deferred};
use crate::endpoint::RpcEndpoint;
use crate::errors::ClientError;

/// Sends every call over one session's endpoint.
///
/// Parameters go out as a positional array; results are decoded into the
/// method's typed return value.
pub struct RemoteProxy {
    endpoint: Arc<RpcEndpoint>,
}

impl RemoteProxy {
    /// Proxy bound to `endpoint`.
    pub fn new(endpoint: Arc<RpcEndpoint>) -> Self {
        Self { endpoint }
    }

    fn request<T>(
        &self,
        method: &'static str,
        params: Vec<Value>,
        decode: fn(Value) -> serde_json::Result<T>,
    ) -> Deferred<T>
    where
        T: Send + 'static,
    {
        let rx = self.endpoint.call(method, Value::Array(params));
        Box::pin(async move {
            let value = rx.await.map_err(|_| ClientError::SessionClosed)??;
            decode(value).map_err(|source| ClientError::Decode {
                method: method.to_owned(),
                source,
            })
        })
    }

    fn encode<P: Serialize>(method: &'static str, param: &P) -> Result<Value, ClientError> {
        serde_json::to_value(param).map_err(|source| ClientError::Encode {
            method: method.to_owned(),
            source,
        })
    }
}

/// Decode a record result. Records must arrive as JSON objects; serde would
/// otherwise fill struct fields from an array by position.
pub fn decode_record<T: DeserializeOwned>(value: Value) -> serde_json::Result<T> {
    if value.is_object() {
        return serde_json::from_value(value);
    }
    let unexpected = match &value {
        Value::Array(_) => Unexpected::Seq,
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::String(s) => Unexpected::Str(s),
        _ => Unexpected::Other("number"),
    };
    Err(serde_json::Error::invalid_type(unexpected, &"a JSON object"))
}

impl BhojpurServer for RemoteProxy {
    fn get_logged_in_user(&self) -> Deferred<User> {
        self.request(methods::GET_LOGGED_IN_USER, Vec::new(), decode_record)
    }

    fn send_heart_beat(&self, options: SendHeartBeatOptions) -> Deferred<()> {
        match Self::encode(methods::SEND_HEART_BEAT, &options) {
            Ok(param) => self.request(methods::SEND_HEART_BEAT, vec![param], serde_json::from_value),
            Err(e) => Box::pin(std::future::ready(Err(e))),
        }
    }
}
