//! Terminal viewer binary for the Emojifall drop stream.
//!
//! Connects to a running drop server, consumes the `new-emoji-drop`
//! event stream, and renders a live gravity world in the terminal: every
//! received drop spawns a falling emoji that bounces off the ground, the
//! walls, and the QR obstacle at world center, then disappears when its
//! lifetime ends.
//!
//! # Usage
//!
//! ```text
//! emojifall-viewer [BASE_URL]
//! ```
//!
//! `BASE_URL` defaults to `$EMOJIFALL_URL`, then `http://127.0.0.1:8080`.

mod render;
mod sse;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use emojifall_sim::{SimulationWorld, WorldConfig, schedule_removal, share, spawn_runner, with_world};
use futures::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Size of the QR obstacle at world center, in pixels.
const OBSTACLE_SIZE: f64 = 144.0;

/// Output grid size in cells.
const GRID_COLUMNS: usize = 72;
const GRID_ROWS: usize = 24;

/// How often the frame is redrawn.
const REDRAW_INTERVAL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let base_url = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("EMOJIFALL_URL").ok())
        .unwrap_or_else(|| String::from("http://127.0.0.1:8080"));

    let config = WorldConfig::default();
    let ttl = config.body_ttl();
    let world = share(
        SimulationWorld::new(config.clone())
            .context("failed to build simulation world")?
            .with_center_obstacle(OBSTACLE_SIZE, OBSTACLE_SIZE),
    );
    let runner = spawn_runner(Arc::clone(&world), config.tick_interval());

    let events = sse::connect(&base_url)
        .await
        .with_context(|| format!("failed to open drop stream at {base_url}"))?;
    let mut events = Box::pin(events);
    info!(base_url, "watching for drops");

    let mut redraw = tokio::time::interval(REDRAW_INTERVAL);
    loop {
        tokio::select! {
            maybe_event = events.next() => {
                let Some(event) = maybe_event else {
                    info!("drop stream ended");
                    break;
                };
                handle_drop(&world, &event.emoji, event_label(&event), ttl);
            }
            _ = redraw.tick() => {
                draw(&world, &config)?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down");
                break;
            }
        }
    }

    runner.shutdown().await;
    Ok(())
}

/// Spawn one dropped emoji into the world and schedule its removal.
fn handle_drop(world: &emojifall_sim::SharedWorld, emoji: &str, label: String, ttl: Duration) {
    match with_world(world, |w| w.spawn_emoji(emoji)) {
        Ok(id) => {
            // The timer task runs detached; removal is idempotent.
            drop(schedule_removal(world, id, ttl));
            info!(emoji, dropper = label, "drop received");
        }
        Err(error) => {
            warn!(%error, "ignoring undroppable event");
        }
    }
}

/// Human-readable source of a drop for the log line.
fn event_label(event: &emojifall_types::EnrichedDropEvent) -> String {
    event.dropper.as_ref().map_or_else(
        || String::from("anonymous"),
        |dropper| format!("{} {}", dropper.emoji, dropper.pseudonym),
    )
}

/// Render the current world snapshot to the terminal.
fn draw(world: &emojifall_sim::SharedWorld, config: &WorldConfig) -> Result<()> {
    let snapshot = with_world(world, |w| w.snapshot());
    let frame = render::render_frame(
        &snapshot,
        config,
        Some((OBSTACLE_SIZE, OBSTACLE_SIZE)),
        GRID_COLUMNS,
        GRID_ROWS,
    );

    let mut stdout = std::io::stdout().lock();
    // Clear screen, cursor home, then the frame.
    write!(stdout, "\u{1b}[2J\u{1b}[H{frame}").context("failed to write frame")?;
    stdout.flush().context("failed to flush frame")?;
    Ok(())
}
