//! Runs a planning poker server.
//!
//! ```text
//! CARDROOM_ADDR=127.0.0.1:9000 RUST_LOG=cardroom=debug cargo run -p planning-room
//! ```
//!
//! Optional settings, all in seconds: `CARDROOM_IDLE_TIMEOUT`,
//! `CARDROOM_RECONNECT_GRACE`, `CARDROOM_ROOM_TTL`.

use std::time::Duration;

use cardroom::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";

fn env_secs(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(secs) => Some(secs),
        Err(_) => {
            tracing::warn!(%name, value = %raw, "ignoring non-numeric setting");
            None
        }
    }
}

async fn build_server(addr: &str) -> Result<CardroomServer, CardroomError> {
    let mut server_config = ServerConfig::default();
    if let Some(secs) = env_secs("CARDROOM_IDLE_TIMEOUT") {
        server_config.idle_timeout = Duration::from_secs(secs);
    }
    let mut session_config = SessionConfig::default();
    if let Some(secs) = env_secs("CARDROOM_RECONNECT_GRACE") {
        session_config.reconnect_grace_secs = secs;
    }
    let mut room_config = RoomConfig::default();
    if let Some(secs) = env_secs("CARDROOM_ROOM_TTL") {
        room_config.idle_ttl = Duration::from_secs(secs);
    }

    CardroomServer::builder()
        .bind(addr)
        .server_config(server_config)
        .session_config(session_config)
        .room_config(room_config)
        .build()
        .await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("CARDROOM_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let server = build_server(&addr).await?;
    tracing::info!(addr = %server.local_addr()?, "planning room listening");

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "cannot listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
