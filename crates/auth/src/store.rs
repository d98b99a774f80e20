//! Durable session storage contract and an in-memory implementation.

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use isperp_core::ContextId;
use isperp_events::{EventBus, InMemoryEventBus, Subscription};

use crate::session::StoredSession;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session store holds unreadable data: {0}")]
    Corrupt(String),
    #[error("session store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChangeKind {
    Saved,
    Cleared,
    /// Modified outside this process; contents unknown until re-read.
    External,
}

/// Notification that the stored session changed.
///
/// `origin` is the context that wrote, or `None` when the writer is unknown
/// (another process).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreChange {
    pub origin: Option<ContextId>,
    pub kind: StoreChangeKind,
}

impl StoreChange {
    pub fn new(origin: Option<ContextId>, kind: StoreChangeKind) -> Self {
        Self { origin, kind }
    }

    pub fn external() -> Self {
        Self::new(None, StoreChangeKind::External)
    }

    /// True when `context` did not make this change itself.
    pub fn is_foreign_to(&self, context: ContextId) -> bool {
        self.origin != Some(context)
    }
}

/// Durable key/value slot for the session, shared by every client context.
///
/// Writes must publish a [`StoreChange`] to subscribers after they are
/// durable.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<StoredSession>, StoreError>;

    fn save(&self, origin: ContextId, session: &StoredSession) -> Result<(), StoreError>;

    fn clear(&self, origin: ContextId) -> Result<(), StoreError>;

    fn subscribe(&self) -> Subscription<StoreChange>;
}

impl<S> SessionStore for Arc<S>
where
    S: SessionStore + ?Sized,
{
    fn load(&self) -> Result<Option<StoredSession>, StoreError> {
        (**self).load()
    }

    fn save(&self, origin: ContextId, session: &StoredSession) -> Result<(), StoreError> {
        (**self).save(origin, session)
    }

    fn clear(&self, origin: ContextId) -> Result<(), StoreError> {
        (**self).clear(origin)
    }

    fn subscribe(&self) -> Subscription<StoreChange> {
        (**self).subscribe()
    }
}

/// Process-local store. Several `AuthState`s sharing one of these behave like
/// browser tabs sharing `localStorage`.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<StoredSession>>,
    changes: InMemoryEventBus<StoreChange>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: StoredSession) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
            changes: InMemoryEventBus::new(),
        }
    }

    /// Replace the slot as an out-of-process writer would.
    pub fn write_external(&self, session: Option<StoredSession>) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = session;
        self.notify(StoreChange::external());
    }

    fn notify(&self, change: StoreChange) {
        if let Err(err) = self.changes.publish(change) {
            tracing::warn!(error = ?err, "failed to publish session store change");
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<StoredSession>, StoreError> {
        let slot = self.slot.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(slot.clone())
    }

    fn save(&self, origin: ContextId, session: &StoredSession) -> Result<(), StoreError> {
        {
            let mut slot = self.slot.lock().map_err(|_| StoreError::Poisoned)?;
            *slot = Some(session.clone());
        }
        self.notify(StoreChange::new(Some(origin), StoreChangeKind::Saved));
        Ok(())
    }

    fn clear(&self, origin: ContextId) -> Result<(), StoreError> {
        {
            let mut slot = self.slot.lock().map_err(|_| StoreError::Poisoned)?;
            *slot = None;
        }
        self.notify(StoreChange::new(Some(origin), StoreChangeKind::Cleared));
        Ok(())
    }

    fn subscribe(&self) -> Subscription<StoreChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_returns_the_session() {
        let store = MemorySessionStore::new();
        let ctx = ContextId::new();
        store.save(ctx, &StoredSession::new("t1", None)).unwrap();
        assert_eq!(store.load().unwrap().unwrap().token, "t1");
        store.clear(ctx).unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn writes_are_announced_with_their_origin() {
        let store = MemorySessionStore::new();
        let mut changes = store.subscribe();
        let ctx = ContextId::new();

        store.save(ctx, &StoredSession::new("t1", None)).unwrap();
        store.clear(ctx).unwrap();
        store.write_external(None);

        let seen = changes.drain();
        assert_eq!(
            seen,
            vec![
                StoreChange::new(Some(ctx), StoreChangeKind::Saved),
                StoreChange::new(Some(ctx), StoreChangeKind::Cleared),
                StoreChange::external(),
            ]
        );
        assert!(!seen[0].is_foreign_to(ctx));
        assert!(seen[2].is_foreign_to(ctx));
    }

    #[test]
    fn last_write_wins() {
        let store = MemorySessionStore::new();
        store.save(ContextId::new(), &StoredSession::new("a", None)).unwrap();
        store.save(ContextId::new(), &StoredSession::new("b", None)).unwrap();
        assert_eq!(store.load().unwrap().unwrap().token, "b");
    }
}
