//! In-process publish/subscribe bus for fanning events out to live viewers.
//!
//! The bus bridges a stateless write path (batch ingest over HTTP) to a
//! stateful many-reader broadcast path (long-lived viewer streams). It is
//! an explicitly constructed service object: the server builds one
//! [`EventBus`] at startup and injects it into the ingest and stream
//! components, so tests can construct a fresh bus in isolation.
//!
//! # Delivery contract
//!
//! - [`EventBus::publish`] invokes every handler currently registered under
//!   the topic, in registration order, passing the event by reference.
//!   Publishing to a topic with no subscribers is a silent no-op.
//! - [`EventBus::subscribe`] returns a [`Subscription`] handle. Dropping
//!   the handle (or calling [`Subscription::cancel`]) unregisters the
//!   handler; once `cancel` returns, the handler is not invoked again.
//! - No delivery guarantee: there is no buffering, no replay, and no
//!   per-subscriber delivery tracking.
//!
//! # Concurrency
//!
//! Registrations live in a per-topic ordered arena keyed by monotonically
//! increasing slot ids, so removal never splices an array a publisher is
//! iterating. `publish` snapshots the topic's slots, releases the registry
//! lock, and re-checks each slot's registration immediately before the
//! call, with a per-slot call gate so an unsubscribe racing an in-flight
//! delivery blocks until that delivery completes. Handlers therefore must
//! be cheap and non-blocking; a subscriber that needs to do slow work
//! forwards the event into its own channel and processes it on its own
//! task.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::thread::{self, ThreadId};

use tracing::trace;

/// Handler invoked synchronously for every event published on a topic.
pub type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Slot identifier inside a topic's registration arena.
///
/// Ids increase monotonically per bus, so iterating a topic's slots in id
/// order reproduces registration order.
type SlotId = u64;

/// One registered handler plus its call gate.
struct Slot<E> {
    handler: Handler<E>,
    gate: Arc<CallGate>,
}

/// Synchronizes an in-flight handler invocation with unsubscription.
///
/// `call` is held for the duration of one handler invocation. `invoking`
/// records the invoking thread so a handler that cancels its own
/// subscription from inside the call does not wait on itself.
struct CallGate {
    call: Mutex<()>,
    invoking: Mutex<Option<ThreadId>>,
}

impl CallGate {
    fn new() -> Self {
        Self {
            call: Mutex::new(()),
            invoking: Mutex::new(None),
        }
    }

    fn set_invoking(&self, value: Option<ThreadId>) {
        *self
            .invoking
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = value;
    }

    fn invoking(&self) -> Option<ThreadId> {
        *self.invoking.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Topic-keyed registration arena.
struct Registry<E> {
    topics: HashMap<String, BTreeMap<SlotId, Slot<E>>>,
    next_slot: SlotId,
}

impl<E> Registry<E> {
    fn new() -> Self {
        Self {
            topics: HashMap::new(),
            next_slot: 0,
        }
    }
}

/// Process-wide publish/subscribe channel carrying events from writers to
/// readers.
///
/// Cloning is cheap and clones share the same registry, so the bus can be
/// handed to any number of ingest and stream tasks.
pub struct EventBus<E> {
    registry: Arc<Mutex<Registry<E>>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> core::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let topics = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .topics
            .len();
        f.debug_struct("EventBus").field("topics", &topics).finish()
    }
}

impl<E> EventBus<E> {
    /// Create an empty bus with no topics and no subscribers.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::new())),
        }
    }

    /// Register `handler` under `topic`.
    ///
    /// The handler is invoked synchronously from [`publish`](Self::publish)
    /// for every event on the topic until the returned [`Subscription`] is
    /// cancelled or dropped.
    pub fn subscribe(&self, topic: &str, handler: Handler<E>) -> Subscription
    where
        E: 'static,
    {
        let gate = Arc::new(CallGate::new());
        let id = {
            let mut registry = self
                .registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let id = registry.next_slot;
            // Slot ids are never reused; u64 cannot be exhausted by any
            // realistic subscriber churn.
            registry.next_slot = registry.next_slot.saturating_add(1);
            registry.topics.entry(topic.to_owned()).or_default().insert(
                id,
                Slot {
                    handler,
                    gate: Arc::clone(&gate),
                },
            );
            id
        };

        trace!(topic, slot = id, "handler subscribed");

        let weak = Arc::downgrade(&self.registry);
        let topic = topic.to_owned();
        Subscription {
            cancel: Some(Box::new(move || {
                remove_slot(&weak, &topic, id);
            })),
        }
    }

    /// Deliver `event` to every handler currently registered under `topic`,
    /// in registration order. Returns the number of handlers invoked.
    ///
    /// A topic with zero subscribers drops the event silently and returns 0.
    /// Handlers run on the publishing thread; the registry lock is not held
    /// across calls, so a handler may subscribe or unsubscribe (itself
    /// included) without deadlocking the bus or disturbing delivery to the
    /// remaining handlers. A handler must not publish on a topic it is
    /// itself registered under: the nested delivery would wait on the
    /// handler's own in-flight call.
    pub fn publish(&self, topic: &str, event: &E) -> usize {
        let snapshot: Vec<(SlotId, Handler<E>, Arc<CallGate>)> = {
            let registry = self
                .registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            registry.topics.get(topic).map_or_else(Vec::new, |slots| {
                slots
                    .iter()
                    .map(|(id, slot)| (*id, Arc::clone(&slot.handler), Arc::clone(&slot.gate)))
                    .collect()
            })
        };

        let mut delivered: usize = 0;
        for (id, handler, gate) in snapshot {
            let _call = gate.call.lock().unwrap_or_else(PoisonError::into_inner);
            // The slot may have been unsubscribed between the snapshot and
            // this point; skip it rather than invoking a cancelled handler.
            let registered = {
                let registry = self
                    .registry
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                registry
                    .topics
                    .get(topic)
                    .is_some_and(|slots| slots.contains_key(&id))
            };
            if !registered {
                continue;
            }
            gate.set_invoking(Some(thread::current().id()));
            handler(event);
            gate.set_invoking(None);
            delivered = delivered.saturating_add(1);
        }

        trace!(topic, delivered, "event published");
        delivered
    }

    /// Number of handlers currently registered under `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .topics
            .get(topic)
            .map_or(0, BTreeMap::len)
    }
}

/// Remove a slot from the registry and wait out any in-flight delivery.
fn remove_slot<E>(registry: &Weak<Mutex<Registry<E>>>, topic: &str, id: SlotId) {
    let Some(registry) = registry.upgrade() else {
        // Bus already dropped; nothing to unregister.
        return;
    };

    let removed = {
        let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
        let removed = registry
            .topics
            .get_mut(topic)
            .and_then(|slots| slots.remove(&id));
        if registry.topics.get(topic).is_some_and(BTreeMap::is_empty) {
            registry.topics.remove(topic);
        }
        removed
    };

    if let Some(slot) = removed {
        // A publish on another thread may be mid-invocation of this
        // handler. Waiting on the call gate makes the guarantee strict:
        // once cancellation returns, the handler is never invoked again.
        // The invoking thread itself skips the wait, which is the case of
        // a handler cancelling its own subscription from inside the call.
        if slot.gate.invoking() != Some(thread::current().id()) {
            drop(slot.gate.call.lock().unwrap_or_else(PoisonError::into_inner));
        }
        trace!(topic, slot = id, "handler unsubscribed");
    }
}

/// Opaque handle representing one active registration on the bus.
///
/// Cancelling (explicitly or by dropping) unregisters the handler. Every
/// stream lifecycle must let this handle drop on all exit paths; leaking
/// it leaks the registration.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Unregister the handler now.
    ///
    /// When this returns, the handler will not be invoked again by any
    /// subsequent or in-flight publish.
    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
