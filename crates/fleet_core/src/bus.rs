//! In-process event bus with channel-scoped subscriptions.
//!
//! One process-wide broadcaster, best-effort and at-most-once: subscribers
//! registered before a broadcast receive it synchronously in registration
//! order, later subscribers see nothing (no replay). A failing subscriber is
//! marked closed and skipped from then on instead of unwinding into the
//! broadcaster. Dropping a [Subscription] unsubscribes deterministically, so
//! a cancelled connection cannot leak its registration.

use std::sync::{Arc, Mutex};

use bevy_ecs::prelude::Resource;

use crate::events::{channels, RealtimeEvent};

/// Returned by a subscriber callback to signal its connection is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberGone;

type Callback = Box<dyn Fn(&RealtimeEvent) -> Result<(), SubscriberGone> + Send + Sync>;

struct SubscriberEntry {
    id: u64,
    channel: String,
    callback: Callback,
    closed: bool,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    subscribers: Vec<SubscriberEntry>,
}

#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback on `channel`. Subscribing to [channels::ALL]
    /// receives every broadcast. The returned handle unsubscribes on drop.
    pub fn subscribe<F>(&self, channel: &str, callback: F) -> Subscription
    where
        F: Fn(&RealtimeEvent) -> Result<(), SubscriberGone> + Send + Sync + 'static,
    {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.next_id += 1;
        let id = inner.next_id;
        inner.subscribers.push(SubscriberEntry {
            id,
            channel: channel.to_string(),
            callback: Box::new(callback),
            closed: false,
        });
        Subscription {
            bus: self.clone(),
            id,
            active: true,
        }
    }

    /// Fan `event` out to `channel`'s subscribers plus the all-channel
    /// listeners, in registration order. Broadcasting on [channels::ALL]
    /// reaches everyone. Returns the number of successful deliveries.
    pub fn broadcast(&self, channel: &str, event: &RealtimeEvent) -> usize {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut delivered = 0;
        for entry in inner.subscribers.iter_mut() {
            if entry.closed {
                continue;
            }
            let matches = entry.channel == channels::ALL
                || channel == channels::ALL
                || entry.channel == channel;
            if !matches {
                continue;
            }
            match (entry.callback)(event) {
                Ok(()) => delivered += 1,
                Err(SubscriberGone) => entry.closed = true,
            }
        }
        inner.subscribers.retain(|entry| !entry.closed);
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        match self.inner.lock() {
            Ok(guard) => guard.subscribers.len(),
            Err(poisoned) => poisoned.into_inner().subscribers.len(),
        }
    }

    fn unsubscribe_id(&self, id: u64) {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.subscribers.retain(|entry| entry.id != id);
    }
}

/// Handle for one registration. Unsubscribes on drop or via
/// [Subscription::unsubscribe]; after either, no further deliveries happen.
pub struct Subscription {
    bus: EventBus,
    id: u64,
    active: bool,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.active {
            self.active = false;
            self.bus.unsubscribe_id(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// The bus as an ECS resource; systems clone the inner handle to broadcast.
#[derive(Clone, Default, Resource)]
pub struct EventBusResource(pub EventBus);
