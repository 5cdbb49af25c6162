//! # bhojpur-client
//!
//! JSON-RPC 2.0 client for the Bhojpur Server over an authenticated
//! WebSocket.
//!
//! - **Bootstrap**: [`ServerConnection`] performs the upgrade with `Origin`
//!   and `Authorization: Bearer` headers and binds a session
//! - **Callback object**: [`BhojpurClient`] holds the remote proxy and
//!   serves server-pushed `onInstanceUpdate` calls
//! - **Remote contract**: [`BhojpurServer`] with deferred results
//! - **Engine**: [`RpcEndpoint`] correlates requests and responses over one
//!   [`Session`]
//!
//! # Example
//!
//! ```no_run
//! use bhojpur_client::{ServerConnection, SendHeartBeatOptions};
//!
//! # async fn demo() -> bhojpur_client::Result<()> {
//! let mut conn = ServerConnection::new();
//! let client = conn
//!     .connect("wss://bhojpur.net/api/v1", "https://bhojpur.net/", "token")
//!     .await?;
//! let server = client.server()?;
//! let user = server.get_logged_in_user().await?;
//! server
//!     .send_heart_beat(SendHeartBeatOptions::new("instance", false))
//!     .await?;
//! conn.close().await;
//! # let _ = user;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod callback;
pub mod connection;
pub mod contract;
pub mod endpoint;
pub mod errors;
pub mod handshake;
pub mod proxy;
pub mod session;

pub use bhojpur_protocol::{ApplicationInstance, SendHeartBeatOptions, User};
pub use callback::{BhojpurClient, InstanceUpdates};
pub use connection::{ConnectionState, ServerConnection};
pub use contract::{BhojpurServer, Deferred};
pub use endpoint::{LocalService, RpcEndpoint};
pub use errors::{ClientError, ErrorKind, Result};
pub use handshake::{AuthContext, ConnectOptions, HandshakePolicy, default_origin};
pub use proxy::{RemoteProxy, decode_record};
pub use session::Session;
