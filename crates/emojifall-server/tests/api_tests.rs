//! Integration tests for the drop server endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. The stream endpoint is exercised by reading
//! the response body as a byte stream and parsing the server-sent event
//! frames out of it.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use emojifall_directory::DropperDirectory;
use emojifall_server::router::build_router;
use emojifall_server::state::AppState;
use emojifall_types::{Dropper, DropperId};
use futures::StreamExt;
use serde_json::Value;
use tower::ServiceExt;

const KNOWN_DROPPER: &str = "dropper-known";

async fn make_test_state() -> Arc<AppState> {
    let directory = DropperDirectory::new();
    directory
        .register(Dropper {
            id: DropperId::from(KNOWN_DROPPER),
            emoji: String::from("🦉"),
            pseudonym: String::from("Watchful Owl"),
        })
        .await
        .unwrap();
    Arc::new(AppState::new(Arc::new(directory)))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn drop_batch(items: &[(&str, &str)]) -> String {
    let payload: Vec<Value> = items
        .iter()
        .map(|(emoji, dropped_by)| {
            serde_json::json!({ "emoji": emoji, "droppedBy": dropped_by })
        })
        .collect();
    serde_json::json!({ "length": payload.len(), "payload": payload }).to_string()
}

fn post_drops(body: String) -> Request<Body> {
    Request::post("/resources/emoji-drop")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

/// Read server-sent event frames from a streaming response body until
/// `count` complete frames have arrived.
async fn read_sse_frames(body: Body, count: usize) -> Vec<String> {
    let mut data_stream = body.into_data_stream();
    let mut buffer = String::new();
    let mut frames = Vec::new();

    while frames.len() < count {
        // Unwrap chain: timeout elapsed, stream ended, transport error --
        // each means the test failed anyway.
        let chunk = tokio::time::timeout(Duration::from_secs(5), data_stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        buffer.push_str(&String::from_utf8(chunk.to_vec()).unwrap());

        while let Some(boundary) = buffer.find("\n\n") {
            let frame: String = buffer.drain(..boundary.saturating_add(2)).collect();
            let frame = frame.trim().to_owned();
            // Keep-alive comments are not event frames.
            if !frame.is_empty() && !frame.starts_with(':') {
                frames.push(frame);
            }
        }
    }

    frames
}

/// Extract the JSON payload from one SSE frame's `data:` line.
fn frame_data(frame: &str) -> Value {
    let data_line = frame
        .lines()
        .find_map(|line| line.strip_prefix("data:"))
        .unwrap();
    serde_json::from_str(data_line.trim()).unwrap()
}

// =========================================================================
// Status surface
// =========================================================================

#[tokio::test]
async fn test_index_returns_html() {
    let state = make_test_state().await;
    let router = build_router(state);

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/html"));
}

#[tokio::test]
async fn test_stats_reports_counters() {
    let state = make_test_state().await;
    let router = build_router(state);

    let response = router
        .oneshot(Request::get("/api/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["viewers"], 0);
    assert_eq!(json["drops_published"], 0);
    assert_eq!(json["droppers_registered"], 1);
}

#[tokio::test]
async fn test_nonexistent_route_returns_404() {
    let state = make_test_state().await;
    let router = build_router(state);

    let response = router
        .oneshot(
            Request::get("/api/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =========================================================================
// Ingest endpoint
// =========================================================================

#[tokio::test]
async fn test_post_batch_returns_ok_with_no_viewers() {
    let state = make_test_state().await;
    let router = build_router(Arc::clone(&state));

    let response = router
        .oneshot(post_drops(drop_batch(&[("🎉", KNOWN_DROPPER)])))
        .await
        .unwrap();

    // Publishing with zero subscribers succeeds; delivery is
    // fire-and-forget.
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response.into_body()).await, "OK");
    assert_eq!(state.drops_published(), 1);
}

#[tokio::test]
async fn test_wrong_verb_is_rejected_with_allow_header() {
    let state = make_test_state().await;
    let router = build_router(state);

    let response = router
        .oneshot(
            Request::put("/resources/emoji-drop")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let allow = response
        .headers()
        .get(header::ALLOW)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(allow.contains("POST"), "Allow header was: {allow}");
}

#[tokio::test]
async fn test_malformed_batch_is_rejected_without_publishing() {
    let state = make_test_state().await;
    let router = build_router(Arc::clone(&state));

    // Shape error: payload items missing the required droppedBy field.
    let response = router
        .oneshot(post_drops(
            serde_json::json!({ "length": 1, "payload": [{ "bogus": true }] }).to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.drops_published(), 0);
}

#[tokio::test]
async fn test_unparseable_json_is_rejected() {
    let state = make_test_state().await;
    let router = build_router(state);

    let response = router
        .oneshot(post_drops(String::from("this is not json")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =========================================================================
// Stream endpoint
// =========================================================================

#[tokio::test]
async fn test_stream_has_event_stream_content_type() {
    let state = make_test_state().await;
    let router = build_router(state);

    let response = router
        .oneshot(
            Request::get("/resources/emoji-drop")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/event-stream"));
}

#[tokio::test]
async fn test_batch_of_three_is_delivered_in_order() {
    let state = make_test_state().await;
    let router = build_router(Arc::clone(&state));

    let stream_response = router
        .clone()
        .oneshot(
            Request::get("/resources/emoji-drop")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(state.viewer_count(), 1);

    let post_response = router
        .oneshot(post_drops(drop_batch(&[
            ("1️⃣", KNOWN_DROPPER),
            ("2️⃣", KNOWN_DROPPER),
            ("3️⃣", KNOWN_DROPPER),
        ])))
        .await
        .unwrap();
    assert_eq!(post_response.status(), StatusCode::OK);

    let frames = read_sse_frames(stream_response.into_body(), 3).await;
    assert_eq!(frames.len(), 3);

    let emojis: Vec<String> = frames
        .iter()
        .map(|frame| {
            assert!(frame.contains("event: new-emoji-drop"), "frame: {frame}");
            frame_data(frame)["emoji"].as_str().unwrap().to_owned()
        })
        .collect();
    assert_eq!(emojis, vec!["1️⃣", "2️⃣", "3️⃣"]);
}

#[tokio::test]
async fn test_known_dropper_is_resolved() {
    let state = make_test_state().await;
    let router = build_router(Arc::clone(&state));

    let stream_response = router
        .clone()
        .oneshot(
            Request::get("/resources/emoji-drop")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    router
        .oneshot(post_drops(drop_batch(&[("🌊", KNOWN_DROPPER)])))
        .await
        .unwrap();

    let frames = read_sse_frames(stream_response.into_body(), 1).await;
    let data = frame_data(frames.first().unwrap());
    assert_eq!(data["emoji"], "🌊");
    assert_eq!(data["dropper"]["pseudonym"], "Watchful Owl");
    assert_eq!(data["dropper"]["emoji"], "🦉");
}

#[tokio::test]
async fn test_unknown_dropper_degrades_to_null_and_stream_continues() {
    let state = make_test_state().await;
    let router = build_router(Arc::clone(&state));

    let stream_response = router
        .clone()
        .oneshot(
            Request::get("/resources/emoji-drop")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // First drop references an id the directory has never seen; the
    // second resolves normally. Both must arrive, in order.
    router
        .clone()
        .oneshot(post_drops(drop_batch(&[("👻", "nobody-knows-me")])))
        .await
        .unwrap();
    router
        .oneshot(post_drops(drop_batch(&[("🌊", KNOWN_DROPPER)])))
        .await
        .unwrap();

    let frames = read_sse_frames(stream_response.into_body(), 2).await;

    let first = frame_data(frames.first().unwrap());
    assert_eq!(first["emoji"], "👻");
    assert!(first["dropper"].is_null());

    let second = frame_data(frames.get(1).unwrap());
    assert_eq!(second["emoji"], "🌊");
    assert_eq!(second["dropper"]["pseudonym"], "Watchful Owl");
}

#[tokio::test]
async fn test_closing_the_stream_releases_the_bus_slot() {
    let state = make_test_state().await;
    let router = build_router(Arc::clone(&state));

    let stream_response = router
        .clone()
        .oneshot(
            Request::get("/resources/emoji-drop")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(state.viewer_count(), 1);

    let second_stream = router
        .oneshot(
            Request::get("/resources/emoji-drop")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(state.viewer_count(), 2);

    // Client disconnect is modeled by dropping the response: the stream
    // and its bus subscription go with it, promptly.
    drop(stream_response);
    assert_eq!(state.viewer_count(), 1);

    drop(second_stream);
    assert_eq!(state.viewer_count(), 0);
}
