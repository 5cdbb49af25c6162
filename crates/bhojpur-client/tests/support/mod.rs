//! In-process stand-in for the Bhojpur Server.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{HeaderMap, StatusCode};

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub struct FakeServer {
    listener: TcpListener,
    url: String,
}

impl FakeServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/api/v1", listener.local_addr().unwrap());
        Self { listener, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Accept one upgrade, capturing the handshake headers.
    pub async fn accept(&self) -> FakePeer {
        let (tcp, _) = self.listener.accept().await.unwrap();
        let mut captured = None;
        let ws = accept_hdr_async(tcp, |req: &Request, resp: Response| {
            captured = Some(req.headers().clone());
            Ok(resp)
        })
        .await
        .unwrap();
        FakePeer {
            headers: captured.unwrap(),
            ws,
        }
    }

    /// Refuse one upgrade with `status`.
    pub async fn reject(&self, status: StatusCode) {
        let (tcp, _) = self.listener.accept().await.unwrap();
        let result = accept_hdr_async(tcp, move |_: &Request, _: Response| {
            let mut denied = ErrorResponse::new(Some("unauthorized".into()));
            *denied.status_mut() = status;
            Err(denied)
        })
        .await;
        assert!(result.is_err());
    }
}

pub struct FakePeer {
    headers: HeaderMap,
    ws: WebSocketStream<TcpStream>,
}

impl FakePeer {
    /// All values of a handshake header.
    pub fn header(&self, name: &str) -> Vec<String> {
        self.headers
            .get_all(name)
            .iter()
            .map(|v| v.to_str().unwrap().to_owned())
            .collect()
    }

    /// Next JSON frame, or `None` once the client closed.
    pub async fn next_frame(&mut self) -> Option<Value> {
        loop {
            let frame = timeout(TIMEOUT, self.ws.next()).await.unwrap();
            match frame {
                Some(Ok(Message::Text(text))) => {
                    return Some(serde_json::from_str(text.as_str()).unwrap());
                }
                Some(Ok(Message::Close(_)) | Err(_)) | None => return None,
                Some(Ok(_)) => {}
            }
        }
    }

    /// Next frame, which must be a request.
    pub async fn next_request(&mut self) -> Value {
        let frame = self.next_frame().await.expect("client closed");
        assert!(frame.get("method").is_some(), "not a request: {frame}");
        frame
    }

    pub async fn send(&mut self, frame: Value) {
        self.ws
            .send(Message::Text(frame.to_string().into()))
            .await
            .unwrap();
    }

    pub async fn reply(&mut self, request: &Value, result: Value) {
        self.send(json!({"jsonrpc": "2.0", "id": request["id"], "result": result}))
            .await;
    }

    pub async fn reply_error(&mut self, request: &Value, code: i64, message: &str) {
        self.send(json!({
            "jsonrpc": "2.0",
            "id": request["id"],
            "error": {"code": code, "message": message},
        }))
        .await;
    }

    pub async fn close(&mut self) {
        self.ws.close(None).await.unwrap();
    }
}
