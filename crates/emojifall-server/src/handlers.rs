//! Status endpoints for the drop server.
//!
//! The real viewing surface is the browser client; these handlers exist
//! for operators and smoke tests.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/stats` | Pipeline counters as JSON |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// Counters reported by `GET /api/stats`.
#[derive(Debug, Serialize)]
pub struct StatsSnapshot {
    /// Viewer streams currently connected.
    pub viewers: usize,
    /// Drops published to the bus since startup.
    pub drops_published: u64,
    /// Registered dropper identities.
    pub droppers_registered: usize,
    /// Seconds since the server state was created.
    pub uptime_seconds: u64,
}

/// Serve a minimal HTML page showing pipeline status and endpoints.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let viewers = state.viewer_count();
    let drops = state.drops_published();
    let droppers = state.directory.len().await;

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Emojifall</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        a:hover {{ text-decoration: underline; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        .status {{ color: #3fb950; font-weight: bold; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Emojifall</h1>
    <p class="subtitle">Live emoji drop fan-out</p>

    <p>Status: <span class="status">RUNNING</span></p>

    <div>
        <div class="metric">
            <div class="label">Viewers</div>
            <div class="value">{viewers}</div>
        </div>
        <div class="metric">
            <div class="label">Drops</div>
            <div class="value">{drops}</div>
        </div>
        <div class="metric">
            <div class="label">Droppers</div>
            <div class="value">{droppers}</div>
        </div>
    </div>

    <hr>

    <h2>Endpoints</h2>
    <ul>
        <li>GET <a href="/api/stats">/api/stats</a> -- Pipeline counters</li>
        <li>GET /resources/emoji-drop -- Live drop event stream (SSE)</li>
        <li>POST /resources/emoji-drop -- Publish a batch of drops</li>
    </ul>
</body>
</html>"#
    ))
}

/// Return the pipeline counters as JSON.
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let snapshot = StatsSnapshot {
        viewers: state.viewer_count(),
        drops_published: state.drops_published(),
        droppers_registered: state.directory.len().await,
        uptime_seconds: state.uptime().as_secs(),
    };

    Ok(Json(serde_json::to_value(&snapshot)?))
}
