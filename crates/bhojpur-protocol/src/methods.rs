//! Bhojpur Server function names as they appear in the `method` field.

/// Fetch the user bound to the authenticated session.
pub const GET_LOGGED_IN_USER: &str = "getLoggedInUser";

/// Report application liveness to the server.
pub const SEND_HEART_BEAT: &str = "sendHeartBeat";

/// Server → client push of an application instance change.
pub const ON_INSTANCE_UPDATE: &str = "onInstanceUpdate";
