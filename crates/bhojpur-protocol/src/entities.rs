//! Payload records exchanged with the Bhojpur Server.
//!
//! All fields are optional on the wire; absent values decode to their
//! defaults and default values are omitted when encoding.

use serde::{Deserialize, Serialize};

fn is_false(b: &bool) -> bool {
    !*b
}

/// An authenticated Bhojpur user.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    /// The user id.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Login name.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Avatar image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// When the user entry was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    /// Blocked from using the service (e.g. terms violation).
    #[serde(skip_serializing_if = "is_false")]
    pub blocked: bool,
    /// May run applications in privileged mode.
    #[serde(skip_serializing_if = "is_false")]
    pub privileged: bool,
    /// Logically deleted.
    #[serde(skip_serializing_if = "is_false")]
    pub marked_deleted: bool,
    /// Opted in to marketing mail.
    #[serde(skip_serializing_if = "is_false")]
    pub allows_marketing_communication: bool,
    /// Roles and permissions granted to the user.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles_or_permissions: Vec<String>,
    /// Linked auth provider identities.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub identities: Vec<Identity>,
}

/// A user's identity at one auth provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Identity {
    /// Auth provider the identity belongs to.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub auth_provider_id: String,
    /// Provider-side user id.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub auth_id: String,
    /// Provider-side user name.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub auth_name: String,
    /// Primary email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_email: Option<String>,
    /// Identity cannot be modified.
    #[serde(skip_serializing_if = "is_false")]
    pub readonly: bool,
    /// Marked for hard deletion.
    #[serde(skip_serializing_if = "is_false")]
    pub deleted: bool,
}

/// Parameters of `sendHeartBeat`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SendHeartBeatOptions {
    /// Application instance the heartbeat is for.
    pub instance_id: String,
    /// Whether the instance's frontend was closed.
    pub was_closed: bool,
    /// Measured round trip time in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_trip_time: Option<f64>,
}

impl SendHeartBeatOptions {
    /// Heartbeat for `instance_id` with the given closed flag.
    pub fn new(instance_id: impl Into<String>, was_closed: bool) -> Self {
        Self {
            instance_id: instance_id.into(),
            was_closed,
            round_trip_time: None,
        }
    }

    /// Attach a measured round trip time.
    #[must_use]
    pub fn with_round_trip_time(mut self, millis: f64) -> Self {
        self.round_trip_time = Some(millis);
        self
    }
}

/// A running (or stopped) application instance, pushed by the server.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationInstance {
    /// Instance id.
    pub id: String,
    /// Owning application.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub application_id: String,
    /// Creation timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
    /// Start timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_time: Option<String>,
    /// Stop timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_time: Option<String>,
    /// IDE URL of the running instance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ide_url: Option<String>,
    /// Cluster region.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Current lifecycle status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ApplicationInstanceStatus>,
}

/// Lifecycle status of an [`ApplicationInstance`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationInstanceStatus {
    /// Phase name (e.g. `running`, `stopping`).
    pub phase: String,
    /// Status message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Node the instance is scheduled on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    /// Configured timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}
