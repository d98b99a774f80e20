//! `isperp-client`: HTTP collaborators, file session store and wiring for
//! the ISP ERP client.
//!
//! The traits these types implement live in `isperp-auth`; this crate is the
//! only place that knows about reqwest or the filesystem.

pub mod backends;
pub mod config;
pub mod context;
pub mod customers;
pub mod error;
pub mod file_store;
pub mod http;

pub use backends::{HttpAuthBackend, HttpSetupBackend};
pub use config::{ClientConfig, ConfigError};
pub use context::ClientContext;
pub use customers::{CustomerApi, CustomerApiError, CustomerSearch};
pub use error::ClientError;
pub use file_store::FileSessionStore;
pub use http::ApiClient;
