//! Shared type definitions for the Emojifall drop pipeline.
//!
//! This crate is the single source of truth for the wire types used across
//! the Emojifall workspace. Types defined here flow downstream to
//! `TypeScript` via `ts-rs` for the browser client.
//!
//! # Modules
//!
//! - [`ids`] -- Opaque dropper identifier
//! - [`events`] -- Drop event wire types and the ingest batch envelope

pub mod events;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use events::{
    ChangeFeed, DropEvent, Dropper, EnrichedDropEvent, EVENT_NEW_EMOJI_DROP, TOPIC_DROP,
};
pub use ids::DropperId;
