//! Periodic tick task driving a shared [`SimulationWorld`].
//!
//! The render loop owns drawing; this module owns time. A runner ticks
//! the world at a fixed interval on a background task until its handle is
//! shut down (bound to the viewing session's lifetime), and each spawned
//! body gets exactly one removal timer so it leaves the world when its
//! lifetime ends even if ticking stalls.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::body::BodyId;
use crate::world::SimulationWorld;

/// A world shared between the tick task, removal timers, and the
/// event-consuming render loop.
pub type SharedWorld = Arc<Mutex<SimulationWorld>>;

/// Wrap a world for sharing across tasks.
pub fn share(world: SimulationWorld) -> SharedWorld {
    Arc::new(Mutex::new(world))
}

/// Run `f` against the locked world.
///
/// The mutex cannot be poisoned by the simulation itself (no panics occur
/// while it is held), so a poisoned lock still contains consistent data
/// and is recovered rather than propagated.
pub fn with_world<T>(world: &SharedWorld, f: impl FnOnce(&mut SimulationWorld) -> T) -> T {
    let mut guard = world.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}

/// Handle to a running tick task.
///
/// Dropping the handle without calling [`shutdown`](Self::shutdown) also
/// stops the task: the watch sender closes and the tick loop exits on the
/// next tick.
#[derive(Debug)]
pub struct RunnerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RunnerHandle {
    /// Stop the tick task and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}

/// Spawn the periodic tick task for `world`.
///
/// Each tick advances the simulation by `interval` (fixed-step). The task
/// runs until [`RunnerHandle::shutdown`] is called or the handle is
/// dropped; event arrival never pauses or resumes it.
pub fn spawn_runner(world: SharedWorld, interval: Duration) -> RunnerHandle {
    let (stop, mut stopped) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = timer.tick() => {
                    with_world(&world, |world| world.step(interval));
                    trace!("world ticked");
                }
                changed = stopped.changed() => {
                    if changed.is_err() || *stopped.borrow() {
                        debug!("tick task stopping");
                        return;
                    }
                }
            }
        }
    });

    RunnerHandle { stop, task }
}

/// Schedule the one removal of a spawned body, `ttl` after now.
///
/// The timer fires exactly once; if the body is already gone the removal
/// is a no-op. This is the primary lifetime bound -- it holds even when
/// simulation ticks are delayed or the runner is stopped.
pub fn schedule_removal(world: &SharedWorld, id: BodyId, ttl: Duration) -> JoinHandle<()> {
    let world = Arc::clone(world);
    tokio::spawn(async move {
        tokio::time::sleep(ttl).await;
        let removed = with_world(&world, |world| world.remove_body(id));
        if removed {
            debug!(body = %id, "body lifetime expired");
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;

    fn test_world() -> SharedWorld {
        let config = WorldConfig {
            seed: Some(11),
            ..WorldConfig::default()
        };
        share(SimulationWorld::new(config).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn body_is_gone_after_its_lifetime_even_without_ticks() {
        let world = test_world();
        let ttl = with_world(&world, |w| w.config().body_ttl());
        let id = with_world(&world, |w| w.spawn_emoji("🕰️")).unwrap();
        let timer = schedule_removal(&world, id, ttl);

        // No runner is ticking this world at all. Advance past the
        // lifetime; the removal timer alone must clear the body.
        tokio::time::advance(ttl.checked_add(Duration::from_secs(1)).unwrap()).await;
        timer.await.unwrap();

        assert!(!with_world(&world, |w| w.contains(id)));
        assert_eq!(with_world(&world, |w| w.body_count()), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn removal_timer_is_a_noop_for_an_already_removed_body() {
        let world = test_world();
        let ttl = with_world(&world, |w| w.config().body_ttl());
        let id = with_world(&world, |w| w.spawn_emoji("🧹")).unwrap();
        let timer = schedule_removal(&world, id, ttl);

        assert!(with_world(&world, |w| w.remove_body(id)));

        tokio::time::advance(ttl.checked_add(Duration::from_secs(1)).unwrap()).await;
        timer.await.unwrap();
        assert_eq!(with_world(&world, |w| w.body_count()), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn runner_ticks_the_world_until_shutdown() {
        let world = test_world();
        let id = with_world(&world, |w| w.spawn_emoji("🍐")).unwrap();
        let start_y = with_world(&world, |w| {
            w.bodies().find(|b| b.id == id).map(|b| b.position.y)
        })
        .unwrap();

        let runner = spawn_runner(Arc::clone(&world), Duration::from_millis(16));
        tokio::time::advance(Duration::from_millis(500)).await;
        // Let the spawned tick task run its due ticks.
        tokio::task::yield_now().await;

        let mid_y = with_world(&world, |w| {
            w.bodies().find(|b| b.id == id).map(|b| b.position.y)
        })
        .unwrap();
        assert!(mid_y > start_y, "runner should advance the fall");

        runner.shutdown().await;

        let stopped_y = with_world(&world, |w| {
            w.bodies().find(|b| b.id == id).map(|b| b.position.y)
        })
        .unwrap();
        tokio::time::advance(Duration::from_millis(500)).await;
        tokio::task::yield_now().await;
        let after_y = with_world(&world, |w| {
            w.bodies().find(|b| b.id == id).map(|b| b.position.y)
        })
        .unwrap();
        assert!(
            (after_y - stopped_y).abs() < 1e-9,
            "world must not advance after shutdown"
        );
    }
}
