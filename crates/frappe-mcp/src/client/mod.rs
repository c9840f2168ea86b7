//! Client for the Frappe REST API.
//!
//! - `config`: site URL, credentials and timeouts
//! - `credentials`: pluggable token credential providers
//! - `http`: the request/response adapter
//! - `response`: normalisation of response envelopes
//! - `error`: error types and classification of failed exchanges
//! - `resource`: the REST implementation of [`crate::backend::FrappeBackend`]

pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod resource;
pub mod response;

pub use config::{ConfigError, FrappeConfig};
pub use credentials::{CredentialProvider, Credentials, StaticCredentials};
pub use error::{ApiError, FrappeError, FrappeResult};
pub use http::FrappeClient;
pub use response::ApiPayload;
