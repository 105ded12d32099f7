//! Stress tests for concurrent subscribe/publish/unsubscribe interleavings.
//!
//! The registration arena must survive many viewer lifecycles churning at
//! once without corrupting state, and cancelling one subscription must
//! change the subscriber count by exactly one no matter how much
//! connect/disconnect traffic surrounds it.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use emojifall_bus::EventBus;

const CHURNING_VIEWERS: usize = 100;
const CYCLES_PER_VIEWER: u64 = 50;

#[test]
fn cancelling_one_subscription_under_churn_of_100_viewers() {
    let bus: EventBus<u64> = EventBus::new();

    // A handful of long-lived viewers that stay connected throughout.
    let persistent: Vec<_> = (0..5)
        .map(|_| bus.subscribe("drop", Arc::new(|_event: &u64| {})))
        .collect();
    let victim = bus.subscribe("drop", Arc::new(|_event: &u64| {}));

    let churners: Vec<_> = (0..CHURNING_VIEWERS)
        .map(|_| {
            let bus = bus.clone();
            thread::spawn(move || {
                for value in 0..CYCLES_PER_VIEWER {
                    let sub = bus.subscribe("drop", Arc::new(|_event: &u64| {}));
                    bus.publish("drop", &value);
                    sub.cancel();
                }
            })
        })
        .collect();

    // Disconnect the victim while churn is in full swing.
    let before = bus.subscriber_count("drop");
    assert!(before >= 6);
    victim.cancel();

    for churner in churners {
        churner.join().unwrap();
    }

    // All churners and the victim are gone; only the persistent viewers
    // remain registered.
    assert_eq!(bus.subscriber_count("drop"), persistent.len());
    drop(persistent);
    assert_eq!(bus.subscriber_count("drop"), 0);
}

#[test]
fn concurrent_publishers_and_subscribers_do_not_lose_deliveries_to_stable_handlers() {
    let bus: EventBus<u64> = EventBus::new();
    let received = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&received);
    let _stable = bus.subscribe(
        "drop",
        Arc::new(move |_event: &u64| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    let publishers: Vec<_> = (0..8)
        .map(|_| {
            let bus = bus.clone();
            thread::spawn(move || {
                for value in 0..CYCLES_PER_VIEWER {
                    bus.publish("drop", &value);
                }
            })
        })
        .collect();

    let churners: Vec<_> = (0..8)
        .map(|_| {
            let bus = bus.clone();
            thread::spawn(move || {
                for _ in 0..CYCLES_PER_VIEWER {
                    let sub = bus.subscribe("drop", Arc::new(|_event: &u64| {}));
                    sub.cancel();
                }
            })
        })
        .collect();

    for handle in publishers {
        handle.join().unwrap();
    }
    for handle in churners {
        handle.join().unwrap();
    }

    // The stable handler was registered for the whole run, so it saw every
    // one of the 8 * CYCLES_PER_VIEWER publishes.
    let received = u64::try_from(received.load(Ordering::SeqCst)).unwrap();
    assert_eq!(received, 8 * CYCLES_PER_VIEWER);
}
