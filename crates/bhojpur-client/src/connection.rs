//! Connection bootstrap: handshake, binding, and teardown.

use std::sync::Arc;

use tokio_tungstenite::connect_async;
use tracing::{debug, info, instrument, warn};

use crate::callback::BhojpurClient;
use crate::contract::BhojpurServer;
use crate::errors::{ClientError, Result};
use crate::handshake::{ConnectOptions, HandshakePolicy};
use crate::proxy::RemoteProxy;
use crate::session::Session;

/// Lifecycle of a [`ServerConnection`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection attempted yet, or the last attempt failed.
    Unconnected,
    /// Handshake in flight.
    Connecting,
    /// A session was established. Check [`ServerConnection::is_open`] to
    /// see whether the server has since closed it.
    Connected,
    /// Closed by [`ServerConnection::close`].
    Closed,
}

/// Owns at most one session with a Bhojpur Server.
pub struct ServerConnection {
    session: Option<Session>,
    state: ConnectionState,
}

impl ServerConnection {
    /// A connection with no session.
    pub fn new() -> Self {
        Self {
            session: None,
            state: ConnectionState::Unconnected,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether a session is open and can carry calls.
    pub fn is_open(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_open)
    }

    /// Open a session to `uri` sending `Origin: origin` and
    /// `Authorization: Bearer token` on the upgrade request.
    ///
    /// Returns the local callback object with its remote proxy bound.
    pub async fn connect(
        &mut self,
        uri: &str,
        origin: &str,
        token: &str,
    ) -> Result<Arc<BhojpurClient>> {
        let options = ConnectOptions::new(uri)
            .with_origin(origin)
            .with_token(token);
        self.connect_with(&options).await
    }

    /// Open a session described by `options`.
    ///
    /// Fails with [`ClientError::AlreadyConnected`] while a session is open.
    /// A session the server already closed is discarded first. On any
    /// failure no session is recorded.
    #[instrument(skip_all, fields(endpoint = %options.endpoint))]
    pub async fn connect_with(&mut self, options: &ConnectOptions) -> Result<Arc<BhojpurClient>> {
        if self.is_open() {
            return Err(ClientError::AlreadyConnected);
        }
        if let Some(mut stale) = self.session.take() {
            debug!(conn_id = %stale.id(), "discarding closed session");
            stale.close().await;
            self.state = ConnectionState::Unconnected;
        }

        let request = HandshakePolicy::from_options(options)?.build_request(&options.endpoint)?;

        self.state = ConnectionState::Connecting;
        let (stream, response) = match connect_async(request).await {
            Ok(connected) => connected,
            Err(e) => {
                warn!(error = %e, "handshake failed");
                self.state = ConnectionState::Unconnected;
                return Err(e.into());
            }
        };
        debug!(status = %response.status(), "upgrade accepted");

        let client = Arc::new(BhojpurClient::new());
        let mut session = Session::bind(stream, client.clone());
        let proxy: Arc<dyn BhojpurServer> = Arc::new(RemoteProxy::new(session.endpoint()));
        if let Err(e) = client.bind_server(proxy) {
            session.close().await;
            self.state = ConnectionState::Unconnected;
            return Err(e);
        }

        info!(conn_id = %session.id(), "connected to Bhojpur server");
        self.session = Some(session);
        self.state = ConnectionState::Connected;
        Ok(client)
    }

    /// Close the session, if any, failing its pending calls.
    ///
    /// Never fails and may be called any number of times.
    pub async fn close(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        session.close().await;
        self.state = ConnectionState::Closed;
        info!(conn_id = %session.id(), "connection closed");
    }
}

impl Default for ServerConnection {
    fn default() -> Self {
        Self::new()
    }
}
