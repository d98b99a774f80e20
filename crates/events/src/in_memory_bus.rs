//! In-process pub/sub bus.

use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::bus::{EventBus, Subscription};

#[derive(Debug)]
pub enum InMemoryBusError {
    /// Publish failed due to internal lock poisoning.
    Poisoned,
}

/// In-memory fan-out bus.
///
/// - Unbounded per-subscriber queues (publishing never waits)
/// - Dropped subscriptions are pruned on the next publish
/// - Usable from sync and async code alike
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions as of the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|subs| subs.len()).unwrap_or(0)
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| InMemoryBusError::Poisoned)?;

        subs.retain(|tx| tx.send(message.clone()).is_ok());
        tracing::trace!(subscribers = subs.len(), "published bus message");

        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::unbounded_channel();

        // A poisoned lock still hands out a subscription; it just never fires.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }

        Subscription::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_receives_each_message() {
        let bus = InMemoryEventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(1u32).unwrap();
        bus.publish(2u32).unwrap();

        assert_eq!(a.drain(), vec![1, 2]);
        assert_eq!(b.drain(), vec![1, 2]);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let bus = InMemoryEventBus::new();
        let keep = bus.subscribe();
        drop(bus.subscribe());

        bus.publish("x").unwrap();
        assert_eq!(bus.subscriber_count(), 1);
        drop(keep);
    }

    #[test]
    fn late_subscribers_miss_earlier_messages() {
        let bus = InMemoryEventBus::new();
        bus.publish(1u8).unwrap();
        let mut late = bus.subscribe();
        assert!(late.try_recv().is_err());
    }

    #[tokio::test]
    async fn recv_waits_for_the_next_message() {
        let bus = std::sync::Arc::new(InMemoryEventBus::new());
        let mut sub = bus.subscribe();

        let publisher = bus.clone();
        tokio::spawn(async move {
            publisher.publish("changed".to_string()).unwrap();
        });

        assert_eq!(sub.recv().await.as_deref(), Some("changed"));
    }

    #[tokio::test]
    async fn recv_ends_when_bus_is_dropped() {
        let bus: InMemoryEventBus<u8> = InMemoryEventBus::new();
        let mut sub = bus.subscribe();
        drop(bus);
        assert_eq!(sub.recv().await, None);
    }
}
