//! Axum router construction for the drop server.
//!
//! Assembles the status pages and the drop resource (stream + ingest)
//! into a single [`Router`] with CORS middleware enabled so the phone
//! submission page and the viewer page can live on other origins.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::ingest;
use crate::state::AppState;
use crate::stream;

/// Build the complete Axum router for the drop server.
///
/// Routes:
/// - `GET /` -- minimal HTML status page
/// - `GET /api/stats` -- pipeline counters
/// - `GET /resources/emoji-drop` -- server-sent drop event stream
/// - `POST /resources/emoji-drop` -- publish a batch of drops
///
/// Any other verb on `/resources/emoji-drop` is answered with `405` and
/// an `Allow` header listing the registered methods.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/api/stats", get(handlers::stats))
        .route(
            "/resources/emoji-drop",
            get(stream::stream_drops).post(ingest::ingest_drops),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
