//! The demo sequence: fetch the logged-in user, then send one heartbeat.

use std::io::Write;

use anyhow::{Context, Result};
use bhojpur_client::BhojpurServer;
use bhojpur_protocol::SendHeartBeatOptions;
use tracing::info;

/// Run both remote operations against `server`, printing each result.
pub async fn run(server: &dyn BhojpurServer, instance_id: &str, out: &mut impl Write) -> Result<()> {
    let user = server
        .get_logged_in_user()
        .await
        .context("getLoggedInUser failed")?;
    info!(user_id = %user.id, "fetched logged-in user");
    writeln!(out, "logged in user: {user:?}")?;

    server
        .send_heart_beat(SendHeartBeatOptions::new(instance_id, false))
        .await
        .context("sendHeartBeat failed")?;
    writeln!(out, "send heart beat: ok")?;
    Ok(())
}
