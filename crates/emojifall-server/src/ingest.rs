//! Ingest endpoint: the write path of the drop pipeline.
//!
//! The upstream submission flow has already validated and persisted each
//! drop before calling this endpoint, so ingest does exactly one thing:
//! hand every payload item to the broadcast bus, fire-and-forget. The
//! response never depends on whether any viewer is connected.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use emojifall_types::{ChangeFeed, TOPIC_DROP};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::state::AppState;

/// Handle `POST /resources/emoji-drop`.
///
/// Accepts a [`ChangeFeed`] batch and publishes each item independently
/// to the `drop` topic. Responds `200 OK` once every item has been handed
/// to the bus. A batch that does not match the expected shape is rejected
/// with `400` before anything is published.
// Axum's routing requires handlers to be async; publishing itself never
// awaits, which is what makes ingest fire-and-forget.
#[allow(clippy::unused_async)]
pub async fn ingest_drops(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    let feed: ChangeFeed = serde_json::from_value(raw)
        .map_err(|e| AppError::BadRequest(format!("invalid drop batch: {e}")))?;

    if feed.length != feed.payload.len() {
        warn!(
            claimed = feed.length,
            actual = feed.payload.len(),
            "batch length field disagrees with payload"
        );
    }

    let mut delivered: usize = 0;
    for event in &feed.payload {
        delivered = delivered.saturating_add(state.bus.publish(TOPIC_DROP, event));
    }

    state.record_published(u64::try_from(feed.payload.len()).unwrap_or(u64::MAX));
    debug!(
        batch = feed.payload.len(),
        delivered,
        viewers = state.viewer_count(),
        "drop batch published"
    );

    Ok((StatusCode::OK, "OK"))
}
