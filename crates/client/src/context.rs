//! Wiring of one client context: HTTP collaborators, session file, gate.

use std::sync::Arc;

use isperp_auth::{AppGate, AuthState};

use crate::backends::{HttpAuthBackend, HttpSetupBackend};
use crate::config::ClientConfig;
use crate::customers::CustomerApi;
use crate::error::ClientError;
use crate::file_store::FileSessionStore;
use crate::http::ApiClient;

/// Everything one running client needs, built from a [`ClientConfig`].
///
/// The auth backend and the customer API share one [`ApiClient`], so the
/// bearer token attached on login or restore is used by customer calls too.
#[derive(Debug)]
pub struct ClientContext {
    pub config: ClientConfig,
    pub api: ApiClient,
    pub store: Arc<FileSessionStore>,
    pub gate: AppGate,
    pub customers: CustomerApi,
}

impl ClientContext {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let api = ApiClient::from_config(&config)?;
        let store = Arc::new(FileSessionStore::new(config.session_file.clone()));

        let auth = Arc::new(AuthState::new(
            Arc::new(HttpAuthBackend::new(api.clone())),
            store.clone(),
        ));
        let gate = AppGate::new(auth, Arc::new(HttpSetupBackend::new(api.clone())));
        let customers = CustomerApi::new(api.clone());

        tracing::debug!(
            api_url = %config.api_url,
            session_file = %config.session_file.display(),
            "client context built"
        );

        Ok(Self {
            config,
            api,
            store,
            gate,
            customers,
        })
    }

    pub fn auth(&self) -> &Arc<AuthState> {
        self.gate.auth()
    }
}
