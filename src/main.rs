//! MineDuel Server
//!
//! Room authority and sync relay for turn-based minesweeper duels.
//! Boards are derived client-side from the shared seed; this process owns
//! turn order, deadlines, and terminal results.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use mineduel::network::http::{self, HttpConfig};
use mineduel::network::room::{RoomConfig, RoomManager};
use mineduel::network::server::{SyncServer, SyncServerConfig};
use mineduel::{ROOM_MAX_IDLE_SECS, TURN_WINDOW_SECS, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "mineduel=info".into()),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("MineDuel Server v{}", VERSION);
    info!("Turn window: {}s", TURN_WINDOW_SECS);
    info!("Idle room eviction after: {}s", ROOM_MAX_IDLE_SECS);

    // The room manager and its sweeper live exactly as long as the process.
    let rooms = Arc::new(RoomManager::new(RoomConfig::default()));
    let sweeper = rooms.spawn_sweeper();

    let sync_server = Arc::new(SyncServer::new(SyncServerConfig::default(), rooms.clone()));

    let http_rooms = rooms.clone();
    let http_task =
        tokio::spawn(async move { http::serve(HttpConfig::default(), http_rooms).await });

    let ws = sync_server.clone();
    let ws_task = tokio::spawn(async move { ws.run().await });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");

    sync_server.shutdown();
    sweeper.abort();
    http_task.abort();
    let _ = ws_task.await;

    Ok(())
}
