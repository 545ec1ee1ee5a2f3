//! Named publish/subscribe events raised by protocol clients.
//!
//! A protocol client pumps its transport on a background task and announces
//! unsolicited traffic, such as I2C replies, by publishing on its bus.
//! Consumers register a one-shot handler that fires for the next matching
//! event only, and may withdraw it if they stop waiting.
//!
//! Handlers run on the publisher's task, so they must not block. The usual
//! consumer just forwards the payload into a `oneshot` channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;

/// Event raised when the board answers an I2C read request.
pub const I2C_REPLY: &str = "I2cReply";

/// Reply to an I2C read request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I2cReply {
    pub address: u8,
    pub register: u8,
    pub data: Bytes,
}

/// Payload delivered with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventData {
    I2cReply(I2cReply),
}

/// Handle to a registered handler, used to withdraw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type OnceHandler = Box<dyn FnOnce(&EventData) + Send>;

/// Event bus keyed by event name.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<HashMap<String, Vec<(SubscriptionId, OnceHandler)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for the next `name` event only.
    pub fn once<F>(&self, name: &str, handler: F) -> SubscriptionId
    where
        F: FnOnce(&EventData) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .lock()
            .entry(name.to_string())
            .or_default()
            .push((id, Box::new(handler)));
        id
    }

    /// Withdraw a handler that has not fired yet. Returns whether it was
    /// still registered.
    pub fn cancel(&self, name: &str, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let Some(handlers) = subscribers.get_mut(name) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(registered, _)| *registered != id);
        before != handlers.len()
    }

    /// Deliver `data` to every subscriber of `name`.
    ///
    /// Handlers are removed before they run. Returns the number of handlers
    /// invoked; an event nobody listens for is dropped.
    pub fn publish(&self, name: &str, data: EventData) -> usize {
        // Handlers are invoked outside the lock so they may subscribe again.
        let handlers = match self.subscribers.lock().get_mut(name) {
            Some(handlers) => std::mem::take(handlers),
            None => return 0,
        };

        let delivered = handlers.len();
        for (_, handler) in handlers {
            handler(&data);
        }
        delivered
    }

    /// Number of handlers currently waiting on `name`.
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.subscribers.lock().get(name).map_or(0, Vec::len)
    }

    /// Drop every registered handler.
    pub fn clear(&self) {
        self.subscribers.lock().clear();
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscribers = self.subscribers.lock();
        let mut map = f.debug_map();
        for (name, handlers) in subscribers.iter() {
            map.entry(name, &handlers.len());
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn reply(data: &'static [u8]) -> EventData {
        EventData::I2cReply(I2cReply {
            address: 0x48,
            register: 0,
            data: Bytes::from_static(data),
        })
    }

    #[test]
    fn once_handler_fires_a_single_time() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        bus.once(I2C_REPLY, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(bus.publish(I2C_REPLY, reply(b"\x01")), 1);
        assert_eq!(bus.publish(I2C_REPLY, reply(b"\x02")), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(I2C_REPLY), 0);
    }

    #[test]
    fn events_are_keyed_by_name() {
        let bus = EventBus::new();
        bus.once(I2C_REPLY, |_| {});
        assert_eq!(bus.publish("StringData", reply(b"")), 0);
        assert_eq!(bus.subscriber_count(I2C_REPLY), 1);
    }

    #[test]
    fn handler_may_resubscribe_while_running() {
        let bus = Arc::new(EventBus::new());
        let inner = bus.clone();
        bus.once(I2C_REPLY, move |_| {
            inner.once(I2C_REPLY, |_| {});
        });

        bus.publish(I2C_REPLY, reply(b""));
        assert_eq!(bus.subscriber_count(I2C_REPLY), 1);
    }

    #[test]
    fn cancelled_handler_never_fires() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let (first, second) = (hits.clone(), hits.clone());
        let withdrawn = bus.once(I2C_REPLY, move |_| {
            first.fetch_add(1, Ordering::SeqCst);
        });
        bus.once(I2C_REPLY, move |_| {
            second.fetch_add(10, Ordering::SeqCst);
        });

        assert!(bus.cancel(I2C_REPLY, withdrawn));
        assert!(!bus.cancel(I2C_REPLY, withdrawn));
        assert_eq!(bus.publish(I2C_REPLY, reply(b"")), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn cancel_after_delivery_reports_nothing_removed() {
        let bus = EventBus::new();
        let id = bus.once(I2C_REPLY, |_| {});
        bus.publish(I2C_REPLY, reply(b""));
        assert!(!bus.cancel(I2C_REPLY, id));
        assert!(!bus.cancel("StringData", id));
    }

    #[test]
    fn clear_drops_pending_handlers() {
        let bus = EventBus::new();
        let (tx, mut rx) = tokio::sync::oneshot::channel::<()>();
        bus.once(I2C_REPLY, move |_| {
            let _ = tx.send(());
        });
        bus.clear();
        assert_eq!(bus.subscriber_count(I2C_REPLY), 0);
        assert_eq!(
            rx.try_recv(),
            Err(tokio::sync::oneshot::error::TryRecvError::Closed)
        );
    }
}
