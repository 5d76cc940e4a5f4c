//! # hearth-server
//!
//! Realtime delivery server for Hearth.
//!
//! This binary provides:
//! - **Presence**: online/offline broadcast to every connected client
//! - **Direct messages** persisted to SQLite and pushed to online receivers
//! - **Typing indicators** and **read receipts** relayed between peers
//! - **Notifications** (like, comment, follow, message) with per-user
//!   unread counters
//! - **WebSocket + REST API** (axum) authenticated with signed access tokens

mod api;
mod auth;
mod config;
mod error;
mod hub;
mod messaging;
mod notifications;
mod presence;
mod receipts;
mod registry;
mod storage;
mod typing;
mod ws;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use hearth_store::SharedDatabase;

use crate::api::AppState;
use crate::auth::TokenVerifier;
use crate::config::ServerConfig;
use crate::hub::Hub;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,hearth_server=debug,hearth_store=info")
            }),
        )
        .init();

    info!("Starting Hearth server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");
    if config.auth_issuer_pubkey == [0u8; 32] {
        tracing::warn!("AUTH_ISSUER_PUBKEY not set, every connection will be rejected");
    }
    info!(
        instance = %config.instance_name,
        liveness = config.liveness_enabled(),
        buffer = config.connection_buffer,
        "Realtime settings"
    );

    // -----------------------------------------------------------------------
    // 3. Open the database and build the hub
    // -----------------------------------------------------------------------
    let db = SharedDatabase::open_at(&config.database_path)?;
    info!(path = %config.database_path.display(), "Database ready");

    let hub = Hub::new(Arc::new(db), config.connection_buffer);

    let http_addr = config.http_addr;
    let app_state = AppState {
        hub,
        verifier: TokenVerifier::new(config.auth_issuer_pubkey),
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Serve HTTP + WebSocket until shutdown
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
