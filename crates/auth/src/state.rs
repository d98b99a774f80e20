//! `AuthState`: the session manager of one client context.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use isperp_core::{ContextId, FieldError};
use isperp_events::{EventBus, InMemoryEventBus, Subscription};

use crate::backend::{AuthBackend, BackendError};
use crate::credentials::Credentials;
use crate::gate::AuthStatus;
use crate::session::{SessionEvent, SessionSnapshot, StoredSession, UserIdentity};
use crate::shutdown::Shutdown;
use crate::store::{SessionStore, StoreChange, StoreError};

const DEFAULT_REJECTION: &str = "invalid credentials";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("a login attempt is already in progress")]
    LoginInProgress,
    #[error("{0}")]
    Validation(FieldError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated(UserIdentity),
    /// The backend refused the credentials. The session is unchanged.
    Rejected { message: String },
}

#[derive(Debug, Default)]
struct SessionSlot {
    resolved: bool,
    session: Option<StoredSession>,
}

/// Authentication state for one context (window, process, test).
///
/// Holds the in-memory session and keeps it in step with the shared
/// [`SessionStore`]. Reads are synchronous; only `login` awaits the backend.
pub struct AuthState {
    context: ContextId,
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn SessionStore>,
    slot: RwLock<SessionSlot>,
    login_guard: Mutex<()>,
    events: InMemoryEventBus<SessionEvent>,
    shutdown: Arc<Shutdown>,
}

impl AuthState {
    pub fn new(backend: Arc<dyn AuthBackend>, store: Arc<dyn SessionStore>) -> Self {
        Self::with_context(ContextId::new(), backend, store)
    }

    pub fn with_context(
        context: ContextId,
        backend: Arc<dyn AuthBackend>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            context,
            backend,
            store,
            slot: RwLock::new(SessionSlot::default()),
            login_guard: Mutex::new(()),
            events: InMemoryEventBus::new(),
            shutdown: Arc::new(Shutdown::new()),
        }
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Re-derive the session from the store and mark the auth check resolved.
    ///
    /// An unreadable store counts as "no session".
    pub fn restore(&self) -> AuthStatus {
        let authenticated = {
            let mut slot = self.write_slot();
            let session = self.load_or_none();
            self.backend.set_bearer(session.as_ref().map(|s| s.token.as_str()));
            slot.session = session;
            slot.resolved = true;
            slot.session.is_some()
        };

        tracing::debug!(context = %self.context, authenticated, "session restored");
        self.publish(SessionEvent::Restored { authenticated });
        self.status()
    }

    pub fn status(&self) -> AuthStatus {
        let slot = self.read_slot();
        match (slot.resolved, slot.session.is_some()) {
            (false, _) => AuthStatus::Unknown,
            (true, false) => AuthStatus::Anonymous,
            (true, true) => AuthStatus::Authenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_slot().session.is_some()
    }

    pub fn user(&self) -> Option<UserIdentity> {
        self.read_slot()
            .session
            .as_ref()
            .and_then(|s| s.user.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.read_slot().session.as_ref().map(|s| s.token.clone())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::from_session(self.read_slot().session.as_ref())
    }

    pub fn subscribe(&self) -> Subscription<SessionEvent> {
        self.events.subscribe()
    }

    /// Authenticate against the backend.
    ///
    /// Only one attempt may be in flight per `AuthState`; a second one fails
    /// with [`AuthError::LoginInProgress`] instead of queueing.
    ///
    /// Every store access happens under the slot lock, so memory always
    /// mirrors the last write to the store.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, AuthError> {
        credentials.validate().map_err(AuthError::Validation)?;

        let _guard = self
            .login_guard
            .try_lock()
            .map_err(|_| AuthError::LoginInProgress)?;

        let response = self.backend.login(credentials).await?;

        let Some(session) = StoredSession::from_login(&response, &credentials.email) else {
            let message = response
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REJECTION.to_string());
            tracing::info!(context = %self.context, email = %credentials.email.trim(), "login rejected");
            return Ok(LoginOutcome::Rejected { message });
        };

        let user = session.user.clone().unwrap_or_else(|| UserIdentity {
            name: credentials.email.trim().to_string(),
            role: None,
        });

        {
            let mut slot = self.write_slot();
            self.store.save(self.context, &session)?;
            self.backend.set_bearer(Some(&session.token));
            slot.session = Some(session);
            slot.resolved = true;
        }

        tracing::info!(
            context = %self.context,
            user = %user.name,
            role = user.role.as_ref().map(|r| r.as_str()).unwrap_or("-"),
            "logged in"
        );
        self.publish(SessionEvent::LoggedIn {
            user: Some(user.clone()),
        });

        Ok(LoginOutcome::Authenticated(user))
    }

    /// Drop the session here and in the store. Safe to call repeatedly.
    pub fn logout(&self) {
        let previous = {
            let mut slot = self.write_slot();
            self.backend.set_bearer(None);
            if let Err(err) = self.store.clear(self.context) {
                tracing::warn!(context = %self.context, error = %err, "failed to clear stored session");
            }
            slot.resolved = true;
            slot.session.take()
        };

        if let Some(previous) = previous {
            tracing::info!(
                context = %self.context,
                user = previous.user.as_ref().map(|u| u.name.as_str()).unwrap_or("-"),
                "logged out"
            );
            self.publish(SessionEvent::LoggedOut);
        }
    }

    /// React to a change in the shared store.
    ///
    /// Changes written by this context are ignored. Anything else re-reads
    /// the store; the store content wins over what is held in memory.
    /// Returns the event that was published, if the session changed.
    pub fn handle_store_change(&self, change: &StoreChange) -> Option<SessionEvent> {
        if !change.is_foreign_to(self.context) {
            tracing::trace!(context = %self.context, ?change, "ignoring own store change");
            return None;
        }

        let event = {
            let mut slot = self.write_slot();
            let stored = self.load_or_none();
            slot.resolved = true;
            let event = match (&slot.session, &stored) {
                (Some(_), None) => Some(SessionEvent::Invalidated),
                (held, Some(new)) if held.as_ref().map(|h| &h.token) != Some(&new.token) => {
                    Some(SessionEvent::Replaced {
                        user: new.user.clone(),
                    })
                }
                _ => None,
            };
            if event.is_some() {
                self.backend
                    .set_bearer(stored.as_ref().map(|s| s.token.as_str()));
            }
            slot.session = stored;
            event
        };

        let event = event?;
        tracing::info!(context = %self.context, ?change, ?event, "session changed by another context");
        self.publish(event.clone());
        Some(event)
    }

    /// Keep this state in step with the store until [`shutdown`](Self::shutdown).
    ///
    /// The subscription is taken before this returns, so no change written
    /// after the call is missed.
    pub fn watch_store(self: &Arc<Self>) -> JoinHandle<()> {
        let mut changes = self.store.subscribe();
        let shutdown = self.shutdown.clone();
        let state = Arc::clone(self);

        tokio::spawn(async move {
            tracing::debug!(context = %state.context, "session store watcher started");
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    change = changes.recv() => match change {
                        Some(change) => {
                            state.handle_store_change(&change);
                        }
                        None => break,
                    },
                }
            }
            tracing::debug!(context = %state.context, "session store watcher stopped");
        })
    }

    /// Stop every watcher started by [`watch_store`](Self::watch_store).
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    fn load_or_none(&self) -> Option<StoredSession> {
        self.store.load().unwrap_or_else(|err| {
            tracing::warn!(context = %self.context, error = %err, "session store unreadable; treating as logged out");
            None
        })
    }

    fn publish(&self, event: SessionEvent) {
        if let Err(err) = self.events.publish(event) {
            tracing::warn!(context = %self.context, error = ?err, "failed to publish session event");
        }
    }

    fn read_slot(&self) -> RwLockReadGuard<'_, SessionSlot> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, SessionSlot> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("context", &self.context)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
