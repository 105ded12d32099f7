//! Gravity simulation for dropped emoji.
//!
//! Each viewing session owns one [`SimulationWorld`]: a box with a ground
//! plane, two invisible walls, and an optional static obstacle at the
//! center where the QR code is projected. Every drop event injects one
//! [`EmojiBody`] that falls, bounces, piles up, and is removed exactly
//! once when its lifetime (five minutes by default) ends.
//!
//! The simulation is headless: rendering is the consumer's concern. The
//! [`runner`] module provides the periodic tick task and the per-body
//! removal timer.
//!
//! # Modules
//!
//! - [`vec2`] -- 2D vector math
//! - [`config`] -- world tuning parameters
//! - [`body`] -- dynamic bodies and static colliders
//! - [`world`] -- the simulation world and its step function
//! - [`runner`] -- tick task, cancellation, body removal timers
//! - [`error`] -- error types

pub mod body;
pub mod config;
pub mod error;
pub mod runner;
pub mod vec2;
pub mod world;

// Re-export primary types for convenience.
pub use body::{BodyId, BodySnapshot, EmojiBody, StaticBody, StaticKind};
pub use config::WorldConfig;
pub use error::SimError;
pub use runner::{RunnerHandle, SharedWorld, schedule_removal, share, spawn_runner, with_world};
pub use vec2::Vec2;
pub use world::SimulationWorld;
