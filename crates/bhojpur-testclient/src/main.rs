//! # bhojpur-testclient
//!
//! Sample consumer of the Bhojpur Server client: connects with a bearer
//! token, prints the logged-in user, sends one heartbeat, and always closes
//! the session before exiting.

#![deny(unsafe_code)]

mod consumer;
mod logging;
mod settings;

use std::path::PathBuf;

use anyhow::{Context, Result};
use bhojpur_client::ServerConnection;
use clap::Parser;
use tracing::info;

use settings::{Overrides, TestClientSettings};

/// Bhojpur Server test client.
#[derive(Parser, Debug)]
#[command(name = "bhojpur-testclient", about = "Bhojpur Server test client")]
struct Cli {
    /// WebSocket endpoint (`ws://` or `wss://`).
    #[arg(long)]
    endpoint: Option<String>,

    /// `Origin` header (derived from the endpoint if omitted).
    #[arg(long)]
    origin: Option<String>,

    /// Bearer token.
    #[arg(long)]
    token: Option<String>,

    /// Instance id sent with the heartbeat.
    #[arg(long)]
    instance_id: Option<String>,

    /// Settings file (defaults to `~/.bhojpur/testclient.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            endpoint: self.endpoint.clone(),
            origin: self.origin.clone(),
            token: self.token.clone(),
            instance_id: self.instance_id.clone(),
            log_level: self.log_level.clone(),
            log_json: self.log_json.then_some(true),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = cli.config.clone().unwrap_or_else(settings::settings_path);
    let settings = TestClientSettings::load(&path, &cli.overrides())
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    logging::init_subscriber(&settings.log_level, settings.log_json);

    let origin = settings.resolved_origin()?;
    info!(endpoint = %settings.endpoint, %origin, "starting test client");

    let mut conn = ServerConnection::new();
    let outcome = async {
        let client = conn
            .connect(&settings.endpoint, &origin, &settings.token)
            .await
            .with_context(|| format!("Failed to connect to {}", settings.endpoint))?;
        let server = client.server()?;
        consumer::run(server.as_ref(), &settings.instance_id, &mut std::io::stdout()).await
    }
    .await;

    conn.close().await;
    outcome
}
