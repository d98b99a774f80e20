//! Publish/subscribe abstraction (mechanics only).
//!
//! The bus is deliberately small:
//!
//! - **Broadcast**: every subscriber receives its own copy of each message
//! - **No persistence**: the bus distributes notifications; the publisher's
//!   backing store stays the source of truth, so a consumer that misses a
//!   message re-reads the store instead of replaying the bus
//! - **Idempotent consumers**: a change notification only says "go look
//!   again", so handling the same message twice must be harmless

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::error::TryRecvError;

/// A subscription to a message stream.
///
/// ## Usage Pattern
///
/// ```ignore
/// let mut subscription = store.subscribe();
///
/// loop {
///     tokio::select! {
///         _ = shutdown.notified() => break,
///         message = subscription.recv() => match message {
///             Some(change) => state.handle_store_change(&change),
///             None => break, // bus dropped
///         },
///     }
/// }
/// ```
///
/// Messages from a single publisher arrive in publish order. Ordering between
/// concurrent publishers is whatever order they acquired the bus in.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: UnboundedReceiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: UnboundedReceiver<M>) -> Self {
        Self { receiver }
    }

    /// Wait for the next message; `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<M> {
        self.receiver.recv().await
    }

    /// Try to receive a message without waiting.
    pub fn try_recv(&mut self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Take every message that is already queued.
    pub fn drain(&mut self) -> Vec<M> {
        let mut out = Vec::new();
        while let Ok(message) = self.receiver.try_recv() {
            out.push(message);
        }
        out
    }
}

/// Transport-agnostic pub/sub contract.
///
/// `publish()` can fail (e.g. a poisoned lock); failures go back to the
/// caller, which in this workspace always logs and carries on because the
/// published change is already durable.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
