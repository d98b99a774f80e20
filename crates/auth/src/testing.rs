//! Scripted collaborators for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use isperp_core::SetupRequest;

use crate::backend::{
    AuthBackend, BackendError, LoginResponse, SetupBackend, SetupResponse, SetupStatus,
};
use crate::credentials::Credentials;
use crate::role::Role;

pub(crate) struct FakeAuthBackend {
    reply: Result<LoginResponse, BackendError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    called: Notify,
    bearer: Mutex<Option<String>>,
}

impl FakeAuthBackend {
    fn with_reply(reply: Result<LoginResponse, BackendError>) -> Self {
        Self {
            reply,
            delay: None,
            calls: AtomicUsize::new(0),
            called: Notify::new(),
            bearer: Mutex::new(None),
        }
    }

    pub(crate) fn accepting(token: &str) -> Self {
        Self::with_reply(Ok(LoginResponse {
            success: true,
            token: Some(token.to_string()),
            username: Some("admin@isp.com".to_string()),
            role: Some(Role::ADMIN),
            message: Some("Login realizado com sucesso".to_string()),
        }))
    }

    pub(crate) fn rejecting(message: &str) -> Self {
        Self::with_reply(Ok(LoginResponse::rejected(message)))
    }

    pub(crate) fn failing(err: BackendError) -> Self {
        Self::with_reply(Err(err))
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn login_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) async fn wait_for_login_call(&self) {
        self.called.notified().await;
    }

    pub(crate) fn bearer(&self) -> Option<String> {
        self.bearer.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthBackend for FakeAuthBackend {
    async fn login(&self, _credentials: &Credentials) -> Result<LoginResponse, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.called.notify_one();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone()
    }

    fn set_bearer(&self, token: Option<&str>) {
        *self.bearer.lock().unwrap() = token.map(str::to_string);
    }
}

/// Setup service whose status flips to completed once a setup is accepted.
pub(crate) struct FakeSetupBackend {
    completed: Mutex<Result<bool, BackendError>>,
    accept: bool,
    status_calls: AtomicUsize,
    submitted: Mutex<Vec<SetupRequest>>,
}

impl FakeSetupBackend {
    pub(crate) fn completed(done: bool) -> Self {
        Self {
            completed: Mutex::new(Ok(done)),
            accept: true,
            status_calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn unreachable() -> Self {
        Self {
            completed: Mutex::new(Err(BackendError::Network("connection refused".into()))),
            ..Self::completed(false)
        }
    }

    pub(crate) fn refusing_setup(mut self) -> Self {
        self.accept = false;
        self
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn submissions(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }
}

#[async_trait]
impl SetupBackend for FakeSetupBackend {
    async fn status(&self) -> Result<SetupStatus, BackendError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.completed
            .lock()
            .unwrap()
            .clone()
            .map(|is_setup_completed| SetupStatus { is_setup_completed })
    }

    async fn perform_setup(&self, request: &SetupRequest) -> Result<SetupResponse, BackendError> {
        self.submitted.lock().unwrap().push(request.clone());
        if !self.accept {
            return Ok(SetupResponse {
                success: Some(false),
                is_setup_completed: Some(false),
                message: Some("Erro ao realizar setup".into()),
            });
        }
        *self.completed.lock().unwrap() = Ok(true);
        Ok(SetupResponse {
            success: Some(true),
            is_setup_completed: Some(true),
            message: Some("Setup realizado com sucesso".into()),
        })
    }
}
