//! JSON-RPC 2.0 endpoint: request/response correlation and dispatch of
//! peer-initiated calls into a [`LocalService`].
//!
//! The endpoint never touches the socket directly. Outgoing frames go
//! through an unbounded channel drained by the session's writer task;
//! incoming frames are fed to [`dispatch`] by the reader task.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use bhojpur_protocol::{ErrorObject, Incoming, Request, RequestId, Response};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::errors::{ClientError, Result};

/// Target of calls initiated by the peer.
#[async_trait]
pub trait LocalService: Send + Sync {
    /// Answer a peer request.
    async fn handle_request(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> std::result::Result<Value, ErrorObject>;

    /// Consume a peer notification.
    fn handle_notification(&self, method: &str, params: Option<Value>);
}

struct PendingCall {
    method: String,
    tx: oneshot::Sender<Result<Value>>,
}

/// In-flight calls plus the closed flag, guarded together so a call can
/// never be registered after the shutdown drain.
#[derive(Default)]
struct CallTable {
    closed: bool,
    calls: HashMap<i64, PendingCall>,
}

/// One side of a JSON-RPC session.
pub struct RpcEndpoint {
    outgoing: mpsc::UnboundedSender<Message>,
    table: Mutex<CallTable>,
    next_id: AtomicI64,
}

impl RpcEndpoint {
    /// Create an endpoint writing frames into `outgoing`.
    pub fn new(outgoing: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            outgoing,
            table: Mutex::new(CallTable::default()),
            next_id: AtomicI64::new(0),
        }
    }

    /// Issue a request.
    ///
    /// The frame is queued before this returns. The receiver resolves with
    /// the response outcome, or with [`ClientError::SessionClosed`] if the
    /// session ends first.
    pub fn call(&self, method: &str, params: Value) -> oneshot::Receiver<Result<Value>> {
        let (tx, rx) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let frame = match serde_json::to_string(&Request::new(id, method, params)) {
            Ok(frame) => frame,
            Err(source) => {
                let _ = tx.send(Err(ClientError::Encode {
                    method: method.to_owned(),
                    source,
                }));
                return rx;
            }
        };

        {
            let mut table = self.table.lock();
            if table.closed {
                let _ = tx.send(Err(ClientError::SessionClosed));
                return rx;
            }
            let _ = table.calls.insert(
                id,
                PendingCall {
                    method: method.to_owned(),
                    tx,
                },
            );
        }

        if self.outgoing.send(Message::Text(frame.into())).is_err() {
            // Writer is gone; the session is closing.
            if let Some(call) = self.table.lock().calls.remove(&id) {
                let _ = call.tx.send(Err(ClientError::SessionClosed));
            }
            return rx;
        }

        debug!(id, method, "request sent");
        rx
    }

    /// Whether the session behind this endpoint has ended.
    pub fn is_closed(&self) -> bool {
        self.table.lock().closed
    }

    /// Number of calls still waiting for a response.
    pub fn pending_count(&self) -> usize {
        self.table.lock().calls.len()
    }

    /// Resolve the pending call a response belongs to.
    pub fn complete(&self, response: Response) {
        let id = match &response.id {
            Some(RequestId::Number(id)) => *id,
            other => {
                warn!(id = ?other, "response with foreign id");
                return;
            }
        };
        let Some(call) = self.table.lock().calls.remove(&id) else {
            warn!(id, "response for unknown call");
            return;
        };

        let outcome = response
            .into_result()
            .map_err(|error| ClientError::rpc(&call.method, error));
        debug!(id, method = %call.method, ok = outcome.is_ok(), "call completed");
        let _ = call.tx.send(outcome);
    }

    /// Mark the endpoint closed and fail every pending call.
    ///
    /// Returns how many calls were failed. Idempotent.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<PendingCall> = {
            let mut table = self.table.lock();
            table.closed = true;
            table.calls.drain().map(|(_, call)| call).collect()
        };
        let failed = drained.len();
        for call in drained {
            let _ = call.tx.send(Err(ClientError::SessionClosed));
        }
        failed
    }

    /// Queue a frame for the writer. Returns `false` if it could not be queued.
    pub fn send_frame(&self, frame: &impl Serialize) -> bool {
        match serde_json::to_string(frame) {
            Ok(json) => self.outgoing.send(Message::Text(json.into())).is_ok(),
            Err(e) => {
                warn!(error = %e, "failed to serialize frame");
                false
            }
        }
    }
}

/// Route one incoming text frame.
///
/// Responses resolve pending calls; requests run on their own task so a
/// slow local handler never stalls the reader; notifications are handled
/// inline.
pub fn dispatch(text: &str, endpoint: &Arc<RpcEndpoint>, local: &Arc<dyn LocalService>) {
    match Incoming::parse(text) {
        Ok(Incoming::Response(response)) => endpoint.complete(response),
        Ok(Incoming::Request(request)) => {
            debug!(id = %request.id, method = %request.method, "peer request");
            let endpoint = endpoint.clone();
            let local = local.clone();
            let _ = tokio::spawn(async move {
                let Request {
                    id, method, params, ..
                } = request;
                let response = match local.handle_request(&method, params).await {
                    Ok(result) => Response::success(id, result),
                    Err(error) => Response::failure(Some(id), error),
                };
                if !endpoint.send_frame(&response) {
                    debug!(method, "session closed before response could be sent");
                }
            });
        }
        Ok(Incoming::Notification(notification)) => {
            debug!(method = %notification.method, "peer notification");
            local.handle_notification(&notification.method, notification.params);
        }
        Err(e) => {
            warn!(error = %e, "unparseable frame");
            let _ = endpoint.send_frame(&Response::failure(None, ErrorObject::parse_error(e)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn make_endpoint() -> (Arc<RpcEndpoint>, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(RpcEndpoint::new(tx)), rx)
    }

    fn next_frame(rx: &mut mpsc::UnboundedReceiver<Message>) -> Value {
        match rx.try_recv().unwrap() {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    struct Echo;

    #[async_trait]
    impl LocalService for Echo {
        async fn handle_request(
            &self,
            method: &str,
            params: Option<Value>,
        ) -> std::result::Result<Value, ErrorObject> {
            if method == "echo" {
                Ok(params.unwrap_or(Value::Null))
            } else {
                Err(ErrorObject::method_not_found(method))
            }
        }

        fn handle_notification(&self, _method: &str, _params: Option<Value>) {}
    }

    // ── Outgoing calls ──────────────────────────────────────────────

    #[test]
    fn call_queues_request_frame_with_sequential_ids() {
        let (endpoint, mut rx) = make_endpoint();
        let _a = endpoint.call("getLoggedInUser", json!([]));
        let _b = endpoint.call("sendHeartBeat", json!([{"instanceId": "i"}]));

        let first = next_frame(&mut rx);
        let second = next_frame(&mut rx);
        assert_eq!(first["jsonrpc"], "2.0");
        assert_eq!(first["id"], 0);
        assert_eq!(first["method"], "getLoggedInUser");
        assert_eq!(first["params"], json!([]));
        assert_eq!(second["id"], 1);
        assert_eq!(endpoint.pending_count(), 2);
    }

    #[tokio::test]
    async fn response_resolves_matching_call_only() {
        let (endpoint, _rx) = make_endpoint();
        let first = endpoint.call("a", json!([]));
        let second = endpoint.call("b", json!([]));

        endpoint.complete(Response::success(RequestId::Number(1), json!("b-result")));
        assert_eq!(second.await.unwrap().unwrap(), json!("b-result"));
        assert_eq!(endpoint.pending_count(), 1);

        endpoint.complete(Response::success(RequestId::Number(0), json!("a-result")));
        assert_eq!(first.await.unwrap().unwrap(), json!("a-result"));
    }

    #[tokio::test]
    async fn error_response_becomes_rpc_error() {
        let (endpoint, _rx) = make_endpoint();
        let pending = endpoint.call("getLoggedInUser", json!([]));
        endpoint.complete(Response::failure(
            Some(RequestId::Number(0)),
            ErrorObject::new(-32001, "Unauthorized"),
        ));
        assert_matches!(
            pending.await.unwrap(),
            Err(ClientError::Rpc { method, code: -32001, .. }) if method == "getLoggedInUser"
        );
    }

    #[test]
    fn unknown_response_ids_are_ignored() {
        let (endpoint, _rx) = make_endpoint();
        let _pending = endpoint.call("a", json!([]));
        endpoint.complete(Response::success(RequestId::Number(99), json!(1)));
        endpoint.complete(Response::success(RequestId::String("0".into()), json!(1)));
        assert_eq!(endpoint.pending_count(), 1);
    }

    // ── Shutdown ────────────────────────────────────────────────────

    #[tokio::test]
    async fn shutdown_fails_pending_calls() {
        let (endpoint, _rx) = make_endpoint();
        let a = endpoint.call("a", json!([]));
        let b = endpoint.call("b", json!([]));
        assert_eq!(endpoint.shutdown(), 2);
        assert_matches!(a.await.unwrap(), Err(ClientError::SessionClosed));
        assert_matches!(b.await.unwrap(), Err(ClientError::SessionClosed));
        assert!(endpoint.is_closed());
        assert_eq!(endpoint.shutdown(), 0);
    }

    #[tokio::test]
    async fn call_after_shutdown_fails_immediately() {
        let (endpoint, mut rx) = make_endpoint();
        let _ = endpoint.shutdown();
        let pending = endpoint.call("a", json!([]));
        assert_matches!(pending.await.unwrap(), Err(ClientError::SessionClosed));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn call_with_writer_gone_fails() {
        let (endpoint, rx) = make_endpoint();
        drop(rx);
        let pending = endpoint.call("a", json!([]));
        assert_matches!(pending.await.unwrap(), Err(ClientError::SessionClosed));
        assert_eq!(endpoint.pending_count(), 0);
    }

    // ── Dispatch ────────────────────────────────────────────────────

    #[tokio::test]
    async fn dispatch_answers_peer_request() {
        let (endpoint, mut rx) = make_endpoint();
        let local: Arc<dyn LocalService> = Arc::new(Echo);
        dispatch(
            r#"{"jsonrpc":"2.0","id":"s1","method":"echo","params":[1,2]}"#,
            &endpoint,
            &local,
        );
        let Some(Message::Text(text)) = rx.recv().await else {
            panic!("expected response frame");
        };
        let v: Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(v["id"], "s1");
        assert_eq!(v["result"], json!([1, 2]));
    }

    #[tokio::test]
    async fn dispatch_reports_unknown_peer_method() {
        let (endpoint, mut rx) = make_endpoint();
        let local: Arc<dyn LocalService> = Arc::new(Echo);
        dispatch(
            r#"{"jsonrpc":"2.0","id":7,"method":"nope"}"#,
            &endpoint,
            &local,
        );
        let Some(Message::Text(text)) = rx.recv().await else {
            panic!("expected response frame");
        };
        let v: Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(v["id"], 7);
        assert_eq!(v["error"]["code"], ErrorObject::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn dispatch_answers_negative_peer_id() {
        let (endpoint, mut rx) = make_endpoint();
        let local: Arc<dyn LocalService> = Arc::new(Echo);
        dispatch(
            r#"{"jsonrpc":"2.0","id":-3,"method":"echo","params":["x"]}"#,
            &endpoint,
            &local,
        );
        let Some(Message::Text(text)) = rx.recv().await else {
            panic!("expected response frame");
        };
        let v: Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(v["id"], -3);
        assert_eq!(v["result"], json!(["x"]));
    }

    #[test]
    fn dispatch_answers_garbage_with_parse_error() {
        let (endpoint, mut rx) = make_endpoint();
        let local: Arc<dyn LocalService> = Arc::new(Echo);
        dispatch("{not json", &endpoint, &local);
        let v = next_frame(&mut rx);
        assert!(v["id"].is_null());
        assert_eq!(v["error"]["code"], ErrorObject::PARSE_ERROR);
    }

    #[tokio::test]
    async fn dispatch_routes_response_to_pending_call() {
        let (endpoint, _rx) = make_endpoint();
        let local: Arc<dyn LocalService> = Arc::new(Echo);
        let pending = endpoint.call("getLoggedInUser", json!([]));
        dispatch(
            r#"{"jsonrpc":"2.0","id":0,"result":{"id":"u1"}}"#,
            &endpoint,
            &local,
        );
        assert_eq!(pending.await.unwrap().unwrap()["id"], "u1");
    }
}
