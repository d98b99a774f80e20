use thiserror::Error;

use isperp_auth::BackendError;

/// Errors from talking to the ERP backend over HTTP.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<ClientError> for BackendError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Network(msg) | ClientError::Config(msg) => BackendError::Network(msg),
            ClientError::Api { status, message } => BackendError::Server { status, message },
            ClientError::Decode(msg) => BackendError::Decode(msg),
        }
    }
}
