//! Authentication and setup services over HTTP.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use isperp_auth::{
    AuthBackend, BackendError, Credentials, LoginResponse, SetupBackend, SetupResponse,
    SetupStatus,
};
use isperp_core::SetupRequest;

use crate::error::ClientError;
use crate::http::{ApiClient, api_error};

/// Login body. The backend calls the e-mail `username`.
#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// `POST /auth/login`.
#[derive(Debug, Clone)]
pub struct HttpAuthBackend {
    api: ApiClient,
}

impl HttpAuthBackend {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, BackendError> {
        let body = LoginRequest {
            username: credentials.email.trim(),
            password: &credentials.password,
        };
        let req = self.api.request(Method::POST, "/auth/login").json(&body);

        let response: LoginResponse =
            send_with_rejection(req, &[StatusCode::BAD_REQUEST, StatusCode::UNAUTHORIZED]).await?;
        tracing::debug!(success = response.success, "login response received");
        Ok(response)
    }

    fn set_bearer(&self, token: Option<&str>) {
        self.api.set_token(token);
    }
}

/// `GET /initial-setup/status`, `POST /initial-setup`.
#[derive(Debug, Clone)]
pub struct HttpSetupBackend {
    api: ApiClient,
}

impl HttpSetupBackend {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SetupBackend for HttpSetupBackend {
    async fn status(&self) -> Result<SetupStatus, BackendError> {
        let req = self.api.request(Method::GET, "/initial-setup/status");
        Ok(self.api.send_json(req).await?)
    }

    async fn perform_setup(&self, request: &SetupRequest) -> Result<SetupResponse, BackendError> {
        let req = self.api.request(Method::POST, "/initial-setup").json(request);
        send_with_rejection(req, &[StatusCode::BAD_REQUEST]).await
    }
}

/// Send a request whose refusal is part of the contract.
///
/// A 2xx body decodes as `T`. A `rejection` status whose body also decodes as
/// `T` is returned as `Ok` so the caller sees the backend's own answer; any
/// other outcome is an error.
async fn send_with_rejection<T: DeserializeOwned>(
    req: reqwest::RequestBuilder,
    rejection: &[StatusCode],
) -> Result<T, BackendError> {
    let resp = req.send().await.map_err(ClientError::from)?;
    let status = resp.status();
    let body = resp.text().await.map_err(ClientError::from)?;

    if status.is_success() {
        return serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()));
    }

    if rejection.contains(&status) {
        if let Ok(decoded) = serde_json::from_str::<T>(&body) {
            tracing::debug!(status = status.as_u16(), "backend refused request");
            return Ok(decoded);
        }
    }

    Err(api_error(status, &body).into())
}
