//! Server-sent event client for the drop stream.
//!
//! Opens `GET {base}/resources/emoji-drop` and incrementally parses the
//! `text/event-stream` framing out of the response bytes: `event:` names
//! the frame, `data:` lines accumulate the payload, a blank line
//! dispatches, `:` lines are keep-alive comments. Frames arrive split
//! across chunk boundaries, so the parser buffers the trailing partial
//! line between feeds.

use emojifall_types::{EVENT_NEW_EMOJI_DROP, EnrichedDropEvent};
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

/// Errors that can occur while opening the drop stream.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The HTTP request failed or the server answered with an error
    /// status.
    #[error("drop stream request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// One parsed server-sent event frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// The frame's event name, if an `event:` line was present.
    pub event: Option<String>,
    /// The joined `data:` payload.
    pub data: String,
}

/// Incremental parser for the `text/event-stream` wire format.
#[derive(Debug, Default)]
pub struct FrameParser {
    buffer: String,
    event: Option<String>,
    data: Vec<String>,
}

impl FrameParser {
    /// Create an empty parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of stream text, returning every frame it completes.
    pub fn push(&mut self, chunk: &str) -> Vec<SseFrame> {
        self.buffer.push_str(chunk);
        let mut frames = Vec::new();

        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(frame) = self.take_frame() {
                    frames.push(frame);
                }
            } else if let Some(name) = line.strip_prefix("event:") {
                self.event = Some(name.trim_start().to_owned());
            } else if let Some(payload) = line.strip_prefix("data:") {
                self.data.push(payload.trim_start().to_owned());
            } else if line.starts_with(':') {
                // Comment line (keep-alive); ignored.
            } else {
                debug!(line, "ignoring unrecognized stream line");
            }
        }

        frames
    }

    /// Finish the frame under construction, if it carries any data.
    fn take_frame(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        let data = core::mem::take(&mut self.data);
        if data.is_empty() {
            return None;
        }
        Some(SseFrame {
            event,
            data: data.join("\n"),
        })
    }
}

/// Open the drop event stream and yield one [`EnrichedDropEvent`] per
/// `new-emoji-drop` frame.
///
/// The stream ends when the server closes the connection or the
/// transport fails; a malformed frame is logged and skipped.
///
/// # Errors
///
/// Returns [`StreamError::Http`] if the request cannot be sent or the
/// server answers with an error status.
pub async fn connect(
    base_url: &str,
) -> Result<impl Stream<Item = EnrichedDropEvent>, StreamError> {
    let url = format!("{}/resources/emoji-drop", base_url.trim_end_matches('/'));
    let response = reqwest::Client::new()
        .get(&url)
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await?
        .error_for_status()?;

    debug!(url, "drop stream connected");

    let state = (response.bytes_stream(), FrameParser::new(), Vec::new());
    Ok(futures::stream::unfold(
        state,
        |(mut bytes, mut parser, mut pending): (_, FrameParser, Vec<SseFrame>)| async move {
            loop {
                if let Some(frame) = next_drop_frame(&mut pending) {
                    return Some((frame, (bytes, parser, pending)));
                }

                match bytes.next().await {
                    Some(Ok(chunk)) => {
                        let text = String::from_utf8_lossy(&chunk).into_owned();
                        pending.extend(parser.push(&text));
                    }
                    Some(Err(error)) => {
                        warn!(%error, "drop stream transport error");
                        return None;
                    }
                    None => {
                        debug!("drop stream closed by server");
                        return None;
                    }
                }
            }
        },
    ))
}

/// Pop the next decodable `new-emoji-drop` frame from the pending queue.
fn next_drop_frame(pending: &mut Vec<SseFrame>) -> Option<EnrichedDropEvent> {
    while !pending.is_empty() {
        let frame = pending.remove(0);
        if frame.event.as_deref() != Some(EVENT_NEW_EMOJI_DROP) {
            continue;
        }
        match serde_json::from_str::<EnrichedDropEvent>(&frame.data) {
            Ok(event) => return Some(event),
            Err(error) => {
                warn!(%error, "skipping undecodable drop event");
            }
        }
    }
    None
}
