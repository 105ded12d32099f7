//! Stream endpoint: the long-lived read path of the drop pipeline.
//!
//! Each viewer holds one `GET /resources/emoji-drop` connection open and
//! receives a named server-sent event (`new-emoji-drop`) per drop. The
//! connection lifecycle is:
//!
//! - **Open**: subscribe a handler on the `drop` topic that forwards raw
//!   events into this connection's bounded channel. The handler only
//!   `try_send`s, so a slow viewer can never block the bus's publish.
//! - **Streaming**: this connection's own task drains the channel,
//!   resolves the dropper identity per event, and writes the enriched
//!   event. A slow lookup here delays only this viewer.
//! - **Closed**: dropping the response stream drops the [`Subscription`],
//!   which unregisters the handler. That holds on every exit path --
//!   client disconnect, network error, or server shutdown.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use emojifall_bus::Subscription;
use emojifall_directory::DropperDirectory;
use emojifall_types::{DropEvent, EVENT_NEW_EMOJI_DROP, EnrichedDropEvent, TOPIC_DROP};
use futures::Stream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::state::{AppState, FORWARD_CAPACITY};

/// Everything one viewer's stream owns.
///
/// The subscription rides inside the stream state so the bus slot is
/// released exactly when the connection's stream is dropped.
struct ViewerStream {
    rx: mpsc::Receiver<DropEvent>,
    directory: Arc<DropperDirectory>,
    _subscription: Subscription,
}

/// Handle `GET /resources/emoji-drop`.
///
/// Opens a server-sent event stream that stays up until the client
/// disconnects, delivering one `new-emoji-drop` event per published drop.
// Axum's routing requires handlers to be async even though setup here
// completes without awaiting.
#[allow(clippy::unused_async)]
pub async fn stream_drops(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<DropEvent>(FORWARD_CAPACITY);

    let subscription = state.bus.subscribe(
        TOPIC_DROP,
        Arc::new(move |event: &DropEvent| {
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // Best-effort delivery: a viewer this far behind loses
                    // the event rather than stalling the bus.
                    warn!("viewer channel full, drop event skipped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    // Connection is tearing down; the subscription drop
                    // will unregister this handler momentarily.
                }
            }
        }),
    );

    debug!(viewers = state.viewer_count(), "viewer stream opened");

    let viewer = ViewerStream {
        rx,
        directory: Arc::clone(&state.directory),
        _subscription: subscription,
    };

    let stream = futures::stream::unfold(viewer, |mut viewer| async move {
        loop {
            let event = viewer.rx.recv().await?;
            let sse_event = enrich_and_encode(&viewer.directory, event).await;
            match sse_event {
                Some(sse_event) => return Some((Ok::<_, Infallible>(sse_event), viewer)),
                // Serialization failure skips this event; the stream
                // itself stays open.
                None => continue,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Resolve the dropper identity and encode one wire event.
///
/// Identity resolution failure is not an error: the event degrades to
/// `dropper: null` and delivery continues.
async fn enrich_and_encode(directory: &DropperDirectory, event: DropEvent) -> Option<Event> {
    let dropper = directory.lookup(&event.dropped_by).await;
    if dropper.is_none() {
        debug!(id = %event.dropped_by, "dropper unknown, delivering anonymous drop");
    }

    let enriched = EnrichedDropEvent::from_drop(event, dropper);
    match Event::default().event(EVENT_NEW_EMOJI_DROP).json_data(&enriched) {
        Ok(sse_event) => Some(sse_event),
        Err(error) => {
            warn!(%error, "failed to serialize enriched drop event, skipping");
            None
        }
    }
}
