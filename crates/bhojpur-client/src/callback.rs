//! The local callback object bound to a session.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use bhojpur_protocol::{ApplicationInstance, ErrorObject, methods};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::contract::BhojpurServer;
use crate::endpoint::LocalService;
use crate::errors::{ClientError, Result};
use crate::proxy::decode_record;

const INSTANCE_UPDATE_CAPACITY: usize = 64;

/// Client side of a Bhojpur session.
///
/// Holds the remote proxy once the handshake has bound it and serves the
/// calls the server pushes back (`onInstanceUpdate`).
pub struct BhojpurClient {
    server: OnceLock<Arc<dyn BhojpurServer>>,
    instance_updates: broadcast::Sender<ApplicationInstance>,
}

impl BhojpurClient {
    /// A client with no remote proxy yet.
    pub fn new() -> Self {
        let (instance_updates, _) = broadcast::channel(INSTANCE_UPDATE_CAPACITY);
        Self {
            server: OnceLock::new(),
            instance_updates,
        }
    }

    /// Record the remote proxy. Only the first binding is accepted.
    pub fn bind_server(&self, server: Arc<dyn BhojpurServer>) -> Result<()> {
        self.server
            .set(server)
            .map_err(|_| ClientError::AlreadyBound)
    }

    /// The remote proxy, or [`ClientError::NotConnected`] before binding.
    pub fn server(&self) -> Result<Arc<dyn BhojpurServer>> {
        self.server.get().cloned().ok_or(ClientError::NotConnected)
    }

    /// Whether a remote proxy has been bound.
    pub fn is_bound(&self) -> bool {
        self.server.get().is_some()
    }

    /// Receive every application instance update pushed by the server.
    ///
    /// Updates arriving while nobody is subscribed are dropped.
    pub fn subscribe_instance_updates(&self) -> broadcast::Receiver<ApplicationInstance> {
        self.instance_updates.subscribe()
    }

    /// Receive updates for one instance; an empty `instance_id` means all.
    pub fn instance_updates(&self, instance_id: impl Into<String>) -> InstanceUpdates {
        InstanceUpdates {
            instance_id: instance_id.into(),
            rx: self.instance_updates.subscribe(),
        }
    }

    fn publish_instance_update(&self, params: Option<Value>) -> std::result::Result<(), ErrorObject> {
        // Accept both the bare object and a one-element positional array.
        let payload = match params {
            Some(Value::Array(mut items)) if items.len() == 1 => items.remove(0),
            Some(value) => value,
            None => return Err(ErrorObject::invalid_params("missing instance")),
        };
        let instance: ApplicationInstance = decode_record(payload)
            .map_err(|e| ErrorObject::invalid_params(e.to_string()))?;

        debug!(instance_id = %instance.id, "instance update");
        let _ = self.instance_updates.send(instance);
        Ok(())
    }
}

/// Instance updates filtered to one instance id.
pub struct InstanceUpdates {
    instance_id: String,
    rx: broadcast::Receiver<ApplicationInstance>,
}

impl InstanceUpdates {
    /// Next matching update, or `None` once the client is dropped.
    ///
    /// Updates missed because the receiver fell behind are skipped.
    pub async fn recv(&mut self) -> Option<ApplicationInstance> {
        loop {
            match self.rx.recv().await {
                Ok(instance)
                    if self.instance_id.is_empty() || instance.id == self.instance_id =>
                {
                    return Some(instance);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, instance_id = %self.instance_id, "instance updates lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Default for BhojpurClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BhojpurClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BhojpurClient")
            .field("bound", &self.is_bound())
            .field("subscribers", &self.instance_updates.receiver_count())
            .finish()
    }
}

#[async_trait]
impl LocalService for BhojpurClient {
    async fn handle_request(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> std::result::Result<Value, ErrorObject> {
        match method {
            methods::ON_INSTANCE_UPDATE => {
                self.publish_instance_update(params)?;
                Ok(Value::Null)
            }
            _ => Err(ErrorObject::method_not_found(method)),
        }
    }

    fn handle_notification(&self, method: &str, params: Option<Value>) {
        match method {
            methods::ON_INSTANCE_UPDATE => {
                if let Err(e) = self.publish_instance_update(params) {
                    warn!(error = %e, "dropping malformed instance update");
                }
            }
            _ => debug!(method, "ignoring unhandled notification"),
        }
    }
}
