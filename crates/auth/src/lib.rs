//! `isperp-auth`: session state and route gating for the ERP client.
//!
//! This crate is decoupled from HTTP and from any concrete storage: the
//! authentication service, the setup-status service and the durable session
//! store are injected as trait objects, so each test (or each window) can own
//! an independent session.

pub mod app;
pub mod backend;
pub mod credentials;
pub mod gate;
pub mod role;
pub mod session;
pub mod shutdown;
pub mod state;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use app::{AppGate, SetupError, SetupOutcome};
pub use backend::{AuthBackend, BackendError, LoginResponse, SetupBackend, SetupResponse, SetupStatus};
pub use credentials::Credentials;
pub use gate::{AuthStatus, Navigation, Route, RouteState};
pub use role::Role;
pub use session::{SessionEvent, SessionSnapshot, StoredSession, UserIdentity};
pub use shutdown::Shutdown;
pub use state::{AuthError, AuthState, LoginOutcome};
pub use store::{MemorySessionStore, SessionStore, StoreChange, StoreChangeKind, StoreError};
