//! Shared HTTP plumbing: base URL, bearer token, response decoding.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// reqwest client bound to one backend.
///
/// Clones share the bearer-token slot, so attaching a token through one
/// handle (e.g. after login) affects every collaborator built from it.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::new(&config.api_url, config.http_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn set_token(&self, token: Option<&str>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token.map(str::to_string);
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Start a request; the bearer token is attached when one is set.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self.http.request(method, self.url(path));
        if let Some(token) = self.token() {
            req = req.bearer_auth(token);
        }
        req
    }

    /// Send and decode a 2xx JSON body; anything else becomes an error.
    pub async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(error_from(resp).await);
        }
        Ok(resp.json::<T>().await?)
    }

    /// Send and ignore the body of a 2xx response.
    pub async fn send_empty(&self, req: RequestBuilder) -> Result<(), ClientError> {
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(error_from(resp).await);
        }
        Ok(())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("has_token", &self.token().is_some())
            .finish()
    }
}

/// Turn a non-success response into [`ClientError::Api`].
pub(crate) async fn error_from(resp: Response) -> ClientError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    api_error(status, &body)
}

pub(crate) fn api_error(status: StatusCode, body: &str) -> ClientError {
    ClientError::Api {
        status: status.as_u16(),
        message: message_from_body(status, body),
    }
}

/// Best human-readable message in an error body.
///
/// The backend answers either `{"message": ...}` JSON or plain text.
pub(crate) fn message_from_body(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }
    let text = body.trim();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let api = ApiClient::new("http://localhost:8080/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(api.base_url(), "http://localhost:8080/api");
        assert_eq!(api.url("/auth/login"), "http://localhost:8080/api/auth/login");
    }

    #[test]
    fn clones_share_the_token_slot() {
        let api = ApiClient::new("http://localhost:8080/api", Duration::from_secs(1)).unwrap();
        let other = api.clone();
        api.set_token(Some("jwt"));
        assert_eq!(other.token().as_deref(), Some("jwt"));
        other.set_token(None);
        assert_eq!(api.token(), None);
    }

    #[test]
    fn error_messages_prefer_json_then_text_then_reason() {
        assert_eq!(
            message_from_body(StatusCode::BAD_REQUEST, r#"{"success":false,"message":"CPF já cadastrado"}"#),
            "CPF já cadastrado"
        );
        assert_eq!(
            message_from_body(StatusCode::BAD_REQUEST, "Cliente não encontrado\n"),
            "Cliente não encontrado"
        );
        assert_eq!(
            message_from_body(StatusCode::INTERNAL_SERVER_ERROR, ""),
            "Internal Server Error"
        );
    }
}
