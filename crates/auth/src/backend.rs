//! Contracts for the remote collaborators: authentication and setup status.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use isperp_core::SetupRequest;

use crate::credentials::Credentials;
use crate::role::Role;

/// Transport or server failure talking to the backend.
///
/// Distinct from a *rejected* login: bad credentials come back as a
/// [`LoginResponse`] with `success == false`, never as a `BackendError`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Body of the backend's login answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub message: Option<String>,
}

impl LoginResponse {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            token: None,
            username: None,
            role: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupStatus {
    pub is_setup_completed: bool,
}

/// Answer to a setup submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub is_setup_completed: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

impl SetupResponse {
    /// The backend reports the wizard as done.
    pub fn completed(&self) -> bool {
        self.is_setup_completed == Some(true)
    }
}

/// Authentication service.
///
/// Implementations perform the actual credential check and own the bearer
/// token attached to later authenticated requests.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, BackendError>;

    /// Attach (`Some`) or detach (`None`) the bearer token for later requests.
    fn set_bearer(&self, token: Option<&str>);
}

/// First-run setup service.
#[async_trait]
pub trait SetupBackend: Send + Sync {
    async fn status(&self) -> Result<SetupStatus, BackendError>;

    async fn perform_setup(&self, request: &SetupRequest) -> Result<SetupResponse, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_response_tolerates_missing_optionals() {
        let resp: LoginResponse =
            serde_json::from_str(r#"{"success":false,"message":"Credenciais inválidas"}"#).unwrap();
        assert!(!resp.success);
        assert!(resp.token.is_none());
        assert_eq!(resp.message.as_deref(), Some("Credenciais inválidas"));
    }

    #[test]
    fn setup_status_uses_camel_case() {
        let status: SetupStatus = serde_json::from_str(r#"{"isSetupCompleted":true}"#).unwrap();
        assert!(status.is_setup_completed);
    }

    #[test]
    fn setup_response_completion_requires_explicit_flag() {
        let ok: SetupResponse =
            serde_json::from_str(r#"{"success":true,"isSetupCompleted":true}"#).unwrap();
        let rejected: SetupResponse =
            serde_json::from_str(r#"{"success":false,"message":"already done"}"#).unwrap();
        assert!(ok.completed());
        assert!(!rejected.completed());
    }
}
