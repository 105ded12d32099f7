//! HTTP server for the Emojifall drop pipeline.
//!
//! This crate provides an Axum server that bridges the stateless write
//! path (batch drop ingestion over `POST`) to the stateful many-reader
//! broadcast path (one long-lived server-sent event stream per viewer):
//!
//! - **Ingest endpoint** (`POST /resources/emoji-drop`) publishes each
//!   batch item to the in-process broadcast bus, fire-and-forget
//! - **Stream endpoint** (`GET /resources/emoji-drop`) subscribes to the
//!   bus, resolves dropper identities per event, and pushes named
//!   `new-emoji-drop` events until the viewer disconnects
//! - **Status surface** (`GET /`, `GET /api/stats`) for operators
//!
//! # Architecture
//!
//! The bus and the dropper directory live in [`AppState`], constructed
//! once at startup and injected into handlers. Each viewer connection
//! owns a bounded forwarding channel plus a bus [`Subscription`] that is
//! released when the connection's stream drops, so viewer churn never
//! leaks bus registrations.
//!
//! [`Subscription`]: emojifall_bus::Subscription

pub mod error;
pub mod handlers;
pub mod ingest;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod stream;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::spawn_server;
pub use state::AppState;
