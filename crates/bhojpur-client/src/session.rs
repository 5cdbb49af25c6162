//! A live WebSocket session: reader and writer tasks around one
//! [`RpcEndpoint`].

use std::sync::Arc;

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::endpoint::{LocalService, RpcEndpoint, dispatch};

/// Reader and writer tasks bound to one socket.
///
/// The session ends when the peer closes, the socket fails, or
/// [`Session::close`] is called. In every case pending calls are failed
/// with [`crate::ClientError::SessionClosed`].
pub struct Session {
    id: String,
    endpoint: Arc<RpcEndpoint>,
    cancel: CancellationToken,
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
}

impl Session {
    /// Start serving `stream`, routing peer calls into `local`.
    pub fn bind<S>(stream: S, local: Arc<dyn LocalService>) -> Self
    where
        S: Stream<Item = Result<Message, tungstenite::Error>>
            + Sink<Message, Error = tungstenite::Error>
            + Send
            + 'static,
    {
        let id = Uuid::now_v7().to_string();
        let (sink, source) = stream.split();
        let (tx, rx) = mpsc::unbounded_channel();
        let endpoint = Arc::new(RpcEndpoint::new(tx));
        let cancel = CancellationToken::new();

        let span = info_span!("session", conn_id = %id);
        let writer = tokio::spawn(
            write_loop(sink, rx, cancel.clone()).instrument(span.clone()),
        );
        let reader = tokio::spawn(
            read_loop(source, endpoint.clone(), local, cancel.clone()).instrument(span),
        );

        debug!(conn_id = %id, "session bound");
        Self {
            id,
            endpoint,
            cancel,
            reader: Some(reader),
            writer: Some(writer),
        }
    }

    /// Connection id used in log spans.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The JSON-RPC endpoint of this session.
    pub fn endpoint(&self) -> Arc<RpcEndpoint> {
        self.endpoint.clone()
    }

    /// Whether the session can still carry calls.
    pub fn is_open(&self) -> bool {
        !self.endpoint.is_closed() && !self.cancel.is_cancelled()
    }

    /// Close the socket and wait for both tasks to finish.
    ///
    /// Idempotent; safe to call after the peer already closed.
    pub async fn close(&mut self) {
        self.cancel.cancel();
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.await {
                warn!(conn_id = %self.id, error = %e, "writer task failed");
            }
        }
        if let Some(reader) = self.reader.take() {
            if let Err(e) = reader.await {
                warn!(conn_id = %self.id, error = %e, "reader task failed");
            }
        }
        let _ = self.endpoint.shutdown();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn read_loop<R>(
    mut source: R,
    endpoint: Arc<RpcEndpoint>,
    local: Arc<dyn LocalService>,
    cancel: CancellationToken,
) where
    R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        let frame = tokio::select! {
            () = cancel.cancelled() => break,
            frame = source.next() => frame,
        };
        match frame {
            Some(Ok(Message::Text(text))) => dispatch(text.as_str(), &endpoint, &local),
            Some(Ok(Message::Binary(bytes))) => {
                warn!(len = bytes.len(), "ignoring binary frame");
            }
            Some(Ok(Message::Close(frame))) => {
                debug!(?frame, "peer closed session");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(error = %e, "websocket read failed");
                break;
            }
            None => {
                debug!("websocket stream ended");
                break;
            }
        }
    }

    let failed = endpoint.shutdown();
    cancel.cancel();
    info!(failed_calls = failed, "session ended");
}

async fn write_loop<W>(
    mut sink: W,
    mut outgoing: mpsc::UnboundedReceiver<Message>,
    cancel: CancellationToken,
) where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            msg = outgoing.recv() => match msg {
                Some(msg) => {
                    if let Err(e) = sink.send(msg).await {
                        warn!(error = %e, "websocket write failed");
                        break;
                    }
                }
                None => break,
            },
        }
    }

    // Peer may already be gone; close is best effort.
    let _ = sink.send(Message::Close(None)).await;
    let _ = sink.close().await;
    cancel.cancel();
}
