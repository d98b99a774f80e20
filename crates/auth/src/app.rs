//! `AppGate`: setup status plus session, combined into a route state.

use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use isperp_core::{FieldError, SetupRequest};

use crate::backend::{BackendError, SetupBackend};
use crate::gate::{self, Navigation, RouteState};
use crate::state::AuthState;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("{0}")]
    Validation(FieldError),
    #[error("initial setup has already been completed")]
    AlreadyCompleted,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    Completed,
    Rejected { message: String },
}

/// Top-level gate of a client context.
///
/// Owns the setup-completion flag; the session lives in the shared
/// [`AuthState`].
pub struct AppGate {
    auth: Arc<AuthState>,
    setup: Arc<dyn SetupBackend>,
    setup_completed: RwLock<Option<bool>>,
}

impl AppGate {
    pub fn new(auth: Arc<AuthState>, setup: Arc<dyn SetupBackend>) -> Self {
        Self {
            auth,
            setup,
            setup_completed: RwLock::new(None),
        }
    }

    pub fn auth(&self) -> &Arc<AuthState> {
        &self.auth
    }

    /// Ask the backend whether setup is done.
    ///
    /// Never fails: an unreachable or broken backend counts as "not
    /// completed", which routes the user to the wizard.
    pub async fn check_setup_status(&self) -> bool {
        let completed = match self.setup.status().await {
            Ok(status) => status.is_setup_completed,
            Err(err) => {
                tracing::warn!(error = %err, "setup status check failed; assuming setup is not completed");
                false
            }
        };
        *self
            .setup_completed
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(completed);
        tracing::debug!(completed, "setup status resolved");
        completed
    }

    /// Run the setup check and the auth check together.
    ///
    /// On return neither check is pending, so the state is past `Loading`.
    pub async fn start(&self) -> RouteState {
        let ((), _) = tokio::join!(
            async {
                self.check_setup_status().await;
            },
            async { self.auth.restore() },
        );
        let state = self.state();
        tracing::info!(?state, context = %self.auth.context(), "client started");
        state
    }

    pub fn setup_completed(&self) -> Option<bool> {
        *self
            .setup_completed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> RouteState {
        RouteState::derive(self.setup_completed(), self.auth.status())
    }

    /// Gate a location against the current state.
    pub fn navigate(&self, location: &str) -> Navigation {
        let navigation = gate::resolve(location, self.state());
        tracing::debug!(path = location, ?navigation, "route resolved");
        navigation
    }

    /// Submit the first-run wizard.
    ///
    /// Validates every step first. When the backend accepts, the status is
    /// checked again so the gate leaves `SetupRequired` on its own.
    pub async fn perform_setup(&self, request: &SetupRequest) -> Result<SetupOutcome, SetupError> {
        request.validate_all().map_err(SetupError::Validation)?;

        if self.setup_completed() == Some(true) {
            return Err(SetupError::AlreadyCompleted);
        }

        let response = self.setup.perform_setup(request).await?;
        let accepted = response.success == Some(true) || response.completed();
        if !accepted {
            let message = response
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "setup was not accepted".to_string());
            tracing::warn!(%message, "setup rejected");
            return Ok(SetupOutcome::Rejected { message });
        }

        if !self.check_setup_status().await {
            tracing::warn!("setup accepted but status still reports it incomplete");
        }
        tracing::info!(company = %request.company_name, "initial setup completed");
        Ok(SetupOutcome::Completed)
    }
}

impl std::fmt::Debug for AppGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppGate")
            .field("auth", &self.auth)
            .field("setup_completed", &self.setup_completed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Credentials;
    use crate::gate::Route;
    use crate::session::StoredSession;
    use crate::store::MemorySessionStore;
    use crate::testing::{FakeAuthBackend, FakeSetupBackend};

    fn gate_with(setup: Arc<FakeSetupBackend>, store: Arc<MemorySessionStore>) -> AppGate {
        let auth = AuthState::new(Arc::new(FakeAuthBackend::accepting("jwt")), store);
        AppGate::new(Arc::new(auth), setup)
    }

    fn valid_request() -> SetupRequest {
        SetupRequest {
            admin_name: "Admin".into(),
            admin_email: "admin@isp.com".into(),
            admin_password: "secret1".into(),
            confirm_password: "secret1".into(),
            company_name: "Fibra Net".into(),
            site_title: "Fibra Net ERP".into(),
            ..SetupRequest::default()
        }
    }

    #[tokio::test]
    async fn loading_until_started() {
        let gate = gate_with(
            Arc::new(FakeSetupBackend::completed(true)),
            Arc::new(MemorySessionStore::new()),
        );
        assert_eq!(gate.state(), RouteState::Loading);
        assert_eq!(gate.navigate("/dashboard"), Navigation::Loading);

        assert_eq!(gate.start().await, RouteState::Unauthenticated);
        assert_eq!(gate.navigate("/dashboard"), Navigation::Redirect(Route::Login));
    }

    #[tokio::test]
    async fn unreachable_setup_service_means_setup_required() {
        let gate = gate_with(
            Arc::new(FakeSetupBackend::unreachable()),
            Arc::new(MemorySessionStore::new()),
        );
        assert!(!gate.check_setup_status().await);
        assert_eq!(gate.setup_completed(), Some(false));
        gate.auth().restore();
        assert_eq!(gate.navigate("/login"), Navigation::Redirect(Route::Setup));
    }

    #[tokio::test]
    async fn persisted_session_starts_authenticated() {
        let store = Arc::new(MemorySessionStore::with_session(StoredSession::new("t", None)));
        let gate = gate_with(Arc::new(FakeSetupBackend::completed(true)), store);
        assert_eq!(gate.start().await, RouteState::Authenticated);
        assert_eq!(gate.navigate("/customers/new"), Navigation::Render(Route::CustomerNew));
    }

    #[tokio::test]
    async fn login_and_logout_move_the_gate() {
        let gate = gate_with(
            Arc::new(FakeSetupBackend::completed(true)),
            Arc::new(MemorySessionStore::new()),
        );
        gate.start().await;

        gate.auth()
            .login(&Credentials::new("admin@isp.com", "secret"))
            .await
            .unwrap();
        assert_eq!(gate.state(), RouteState::Authenticated);

        gate.auth().logout();
        assert_eq!(gate.state(), RouteState::Unauthenticated);
    }

    #[tokio::test]
    async fn accepted_setup_rechecks_status() {
        let setup = Arc::new(FakeSetupBackend::completed(false));
        let gate = gate_with(setup.clone(), Arc::new(MemorySessionStore::new()));
        assert_eq!(gate.start().await, RouteState::SetupRequired);

        let outcome = gate.perform_setup(&valid_request()).await.unwrap();

        assert_eq!(outcome, SetupOutcome::Completed);
        assert_eq!(setup.status_calls(), 2);
        assert_eq!(gate.state(), RouteState::Unauthenticated);
        assert_eq!(gate.navigate("/setup"), Navigation::Redirect(Route::Root));
    }

    #[tokio::test]
    async fn refused_setup_keeps_the_wizard() {
        let setup = Arc::new(FakeSetupBackend::completed(false).refusing_setup());
        let gate = gate_with(setup, Arc::new(MemorySessionStore::new()));
        gate.start().await;

        let outcome = gate.perform_setup(&valid_request()).await.unwrap();

        assert!(matches!(outcome, SetupOutcome::Rejected { .. }));
        assert_eq!(gate.state(), RouteState::SetupRequired);
    }

    #[tokio::test]
    async fn invalid_wizard_input_is_not_submitted() {
        let setup = Arc::new(FakeSetupBackend::completed(false));
        let gate = gate_with(setup.clone(), Arc::new(MemorySessionStore::new()));
        let mut request = valid_request();
        request.confirm_password = "different".into();

        let err = gate.perform_setup(&request).await.unwrap_err();

        assert!(matches!(err, SetupError::Validation(_)));
        assert_eq!(setup.submissions(), 0);
    }

    #[tokio::test]
    async fn completed_setup_cannot_be_repeated() {
        let setup = Arc::new(FakeSetupBackend::completed(true));
        let gate = gate_with(setup.clone(), Arc::new(MemorySessionStore::new()));
        gate.start().await;

        let err = gate.perform_setup(&valid_request()).await.unwrap_err();
        assert!(matches!(err, SetupError::AlreadyCompleted));
        assert_eq!(setup.submissions(), 0);
    }
}
