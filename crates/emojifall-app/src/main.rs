//! Emojifall server binary.
//!
//! Wires together the dropper directory, the broadcast bus, and the HTTP
//! server. Loads configuration, seeds identities, starts the server on a
//! background task, and waits for `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `emojifall-config.yaml`
//! 3. Build the dropper directory and register the seeded identities
//! 4. Build the application state (fresh broadcast bus)
//! 5. Spawn the HTTP server
//! 6. Wait for `Ctrl-C` and shut down

mod config;
mod error;

use std::path::Path;
use std::sync::Arc;

use emojifall_directory::DropperDirectory;
use emojifall_server::AppState;
use emojifall_types::{Dropper, DropperId};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::error::AppError;

/// Application entry point for the Emojifall server.
///
/// # Errors
///
/// Returns an error if configuration loading, identity seeding, or
/// server startup fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("emojifall starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        host = config.server.host,
        port = config.server.port,
        seeded_droppers = config.droppers.len(),
        "Configuration loaded"
    );

    // 3. Build and seed the dropper directory.
    let directory = Arc::new(DropperDirectory::new());
    seed_directory(&directory, &config).await?;
    info!(droppers = directory.len().await, "Dropper directory ready");

    // 4. Build the application state (fresh bus, zero viewers).
    let state = Arc::new(AppState::new(Arc::clone(&directory)));

    // 5. Spawn the HTTP server.
    let server_handle = emojifall_server::spawn_server(config.server.port, Arc::clone(&state))
        .await
        .map_err(AppError::Server)?;
    info!(port = config.server.port, "Drop server started");

    // 6. Wait for shutdown.
    tokio::select! {
        _ = server_handle => {
            tracing::error!("drop server exited unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
        }
    }

    info!(
        drops_published = state.drops_published(),
        "emojifall shutdown complete"
    );

    Ok(())
}

/// Load the application configuration from `emojifall-config.yaml`.
///
/// Looks for the config file relative to the current working directory;
/// missing file falls back to defaults.
fn load_config() -> Result<AppConfig, AppError> {
    let config_path = Path::new("emojifall-config.yaml");
    if config_path.exists() {
        Ok(AppConfig::from_file(config_path)?)
    } else {
        info!("Config file not found, using defaults");
        Ok(AppConfig::default())
    }
}

/// Register every configured dropper identity.
async fn seed_directory(
    directory: &DropperDirectory,
    config: &AppConfig,
) -> Result<(), AppError> {
    for seed in &config.droppers {
        match &seed.id {
            Some(id) => {
                directory
                    .register(Dropper {
                        id: DropperId::from(id.clone()),
                        emoji: seed.emoji.clone(),
                        pseudonym: seed.pseudonym.clone(),
                    })
                    .await?;
            }
            None => {
                directory
                    .register_generated(&seed.emoji, &seed.pseudonym)
                    .await?;
            }
        }
    }
    Ok(())
}
