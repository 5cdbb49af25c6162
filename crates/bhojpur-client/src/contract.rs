//! The remote Bhojpur Server surface.

use std::future::Future;
use std::pin::Pin;

use bhojpur_protocol::{SendHeartBeatOptions, User};

use crate::errors::Result;

/// Eventual outcome of a remote call.
///
/// The request is already on the wire when a `Deferred` is handed out;
/// awaiting it only waits for the matching response. Deferred values of
/// different calls resolve independently of each other.
pub type Deferred<T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'static>>;

/// Operations served by the Bhojpur Server.
pub trait BhojpurServer: Send + Sync {
    /// Identity of the user the session is authenticated as.
    fn get_logged_in_user(&self) -> Deferred<User>;

    /// Report application liveness.
    fn send_heart_beat(&self, options: SendHeartBeatOptions) -> Deferred<()>;
}
