//! # Sequent Bridge Agent
//!
//! Bridges a stack of Sequent Microsystems I/O cards to an MQTT broker.
//!
//! ## Architecture
//!
//! Two concurrent loops share one [`SyncEngine`]:
//! 1. **Inbound**: drives the MQTT event loop, applies output commands and
//!    publishes the confirmed read-back
//! 2. **Tick**: once a second polls every board, publishes changes, reloads
//!    the hardware watchdogs, emits telemetry and enforces the heartbeat

use anyhow::{Context, Result};
use sequent_bridge_agent::{Bridge, BridgeConfig};
use sequent_bridge_boards::{open, SimBus};
use sequent_bridge_core::SyncEngine;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Sequent Bridge Agent"
    );

    // Load configuration
    let config = BridgeConfig::from_env()?;

    // Attach boards
    let bus = SimBus::new();
    tracing::warn!("No hardware bus driver linked, boards run on the in-memory bus");
    let adapters = config
        .boards
        .iter()
        .map(|board| {
            tracing::info!(%board, "Board attached");
            open(*board, bus.clone())
        })
        .collect();
    let engine = SyncEngine::new(adapters).context("Invalid board configuration")?;

    // Run bridge
    Bridge::new(config, engine).run().await?;

    Ok(())
}
