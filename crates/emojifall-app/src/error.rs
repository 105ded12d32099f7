//! Error type for the Emojifall server binary.

use emojifall_directory::DirectoryError;
use emojifall_server::startup::StartupError;

use crate::config::ConfigError;

/// Errors that can abort server startup.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A seeded dropper identity was invalid.
    #[error("directory seed error: {0}")]
    Directory(#[from] DirectoryError),

    /// The HTTP server failed to start.
    #[error("server error: {0}")]
    Server(#[from] StartupError),
}
