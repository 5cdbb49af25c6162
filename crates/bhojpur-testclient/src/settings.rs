//! Layered settings for the test client.
//!
//! Loading order, lowest priority first:
//! 1. Compiled [`TestClientSettings::default()`]
//! 2. JSON file (`~/.bhojpur/testclient.json` unless `--config` is given)
//! 3. `BHOJPUR_*` environment variables
//! 4. Command-line flags
//!
//! A missing settings file is not an error.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A provider failed or a value had the wrong type.
    #[error("failed to load settings: {0}")]
    Load(#[source] Box<figment::Error>),
    /// A settings value was present but unusable.
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

impl From<figment::Error> for SettingsError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Resolved test client settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestClientSettings {
    /// WebSocket endpoint of the Bhojpur Server.
    pub endpoint: String,
    /// `Origin` header; derived from the endpoint when unset.
    pub origin: Option<String>,
    /// Bearer token.
    pub token: String,
    /// Instance id reported in the heartbeat.
    pub instance_id: String,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit logs as JSON lines instead of compact text.
    pub log_json: bool,
}

impl Default for TestClientSettings {
    fn default() -> Self {
        Self {
            endpoint: "wss://bhojpur.net/api/v1".into(),
            origin: None,
            token: String::new(),
            instance_id: "CHANGE-ME".into(),
            log_level: "warn".into(),
            log_json: false,
        }
    }
}

/// Command-line values; `None` leaves the lower layers in place.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_json: Option<bool>,
}

/// Default settings file (`~/.bhojpur/testclient.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".bhojpur").join("testclient.json")
}

impl TestClientSettings {
    /// Load and validate settings from all layers.
    pub fn load(path: &Path, overrides: &Overrides) -> Result<Self> {
        debug!(?path, "loading settings");
        let settings: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Json::file(path))
            .merge(Env::prefixed("BHOJPUR_"))
            .merge(Serialized::defaults(overrides))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// `Origin` header to send: the configured one or the endpoint's.
    pub fn resolved_origin(&self) -> Result<String> {
        match &self.origin {
            Some(origin) => Ok(origin.clone()),
            None => bhojpur_client::default_origin(&self.endpoint)
                .map_err(|e| SettingsError::InvalidValue(e.to_string())),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "token is required (set BHOJPUR_TOKEN or pass --token)".into(),
            ));
        }
        if self.instance_id.trim().is_empty() {
            return Err(SettingsError::InvalidValue("instance_id must not be empty".into()));
        }
        let _ = bhojpur_client::default_origin(&self.endpoint)
            .map_err(|e| SettingsError::InvalidValue(e.to_string()))?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
