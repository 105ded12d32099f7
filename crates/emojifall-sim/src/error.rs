//! Error types for the `emojifall-sim` crate.

/// Errors that can occur when building or mutating the simulation world.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The world configuration is unusable.
    #[error("invalid world configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },

    /// A spawned body had no emoji to display.
    #[error("cannot spawn a body with a blank emoji")]
    BlankEmoji,
}
