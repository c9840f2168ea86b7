//! HTTP adapter for the Frappe REST API.
//!
//! Wraps a `reqwest` client with the site's base URL and token
//! authentication, logs every exchange, and hands failures to the error
//! classifier. Retries are the caller's responsibility.

use super::config::FrappeConfig;
use super::credentials::{CredentialProvider, Credentials, StaticCredentials};
use super::error::{classify, FailedExchange, FrappeError, FrappeResult};
use super::response::ApiPayload;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, Request, RequestBuilder, Url};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Frappe site client.
#[derive(Clone)]
pub struct FrappeClient {
    /// HTTP client instance.
    client: Client,

    /// Site configuration.
    config: FrappeConfig,

    /// Source of the token credentials.
    credentials: Arc<dyn CredentialProvider>,
}

impl FrappeClient {
    /// Create a client using the credentials from the configuration.
    pub fn new(config: FrappeConfig) -> FrappeResult<Self> {
        let credentials = Arc::new(StaticCredentials::from_config(&config));
        Self::with_credentials(config, credentials)
    }

    /// Create a client with a custom credential provider.
    pub fn with_credentials(
        config: FrappeConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> FrappeResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| FrappeError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    /// Site configuration.
    pub fn config(&self) -> &FrappeConfig {
        &self.config
    }

    /// Send a GET request with query parameters.
    pub async fn get(
        &self,
        operation: &str,
        url: Url,
        query: &[(String, String)],
    ) -> FrappeResult<ApiPayload> {
        let request = self.client.get(url.clone()).query(query);
        self.send(operation, Method::GET, url, request, None).await
    }

    /// Send a POST request with a JSON body.
    pub async fn post(&self, operation: &str, url: Url, body: &Value) -> FrappeResult<ApiPayload> {
        let request = self.client.post(url.clone()).json(body);
        self.send(operation, Method::POST, url, request, Some(body)).await
    }

    /// Send a PUT request with a JSON body.
    pub async fn put(&self, operation: &str, url: Url, body: &Value) -> FrappeResult<ApiPayload> {
        let request = self.client.put(url.clone()).json(body);
        self.send(operation, Method::PUT, url, request, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, operation: &str, url: Url) -> FrappeResult<ApiPayload> {
        let request = self.client.delete(url.clone());
        self.send(operation, Method::DELETE, url, request, None).await
    }

    async fn send(
        &self,
        operation: &str,
        method: Method,
        url: Url,
        request: RequestBuilder,
        body: Option<&Value>,
    ) -> FrappeResult<ApiPayload> {
        let credentials = self.credentials.credentials();

        let exchange = |status: Option<u16>, body: Option<Value>, cause: String| FailedExchange {
            endpoint: Some(url.to_string()),
            status,
            body,
            cause,
            api_key_present: credentials.api_key.is_some(),
            api_secret_present: credentials.api_secret.is_some(),
        };

        let request = match authorized(request, &credentials) {
            Ok(request) => request,
            Err(e) => return Err(classify(&exchange(None, None, e.to_string()), operation)),
        };

        debug!(
            operation,
            method = %method,
            url = %url,
            headers = ?loggable_headers(request.headers()),
            body = ?body,
            "Frappe request"
        );

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(operation, url = %url, error = %e, "Frappe request failed without response");
                return Err(classify(&exchange(None, None, e.to_string()), operation));
            }
        };

        let status = response.status();
        let headers = loggable_headers(response.headers());
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                return Err(classify(
                    &exchange(Some(status.as_u16()), None, e.to_string()),
                    operation,
                ))
            }
        };

        debug!(
            operation,
            status = status.as_u16(),
            headers = ?headers,
            body = %text,
            "Frappe response"
        );

        if !status.is_success() {
            let body = serde_json::from_str::<Value>(&text)
                .unwrap_or_else(|_| Value::String(text.clone()));
            let cause = format!("HTTP {}", status);
            let error = classify(&exchange(Some(status.as_u16()), Some(body), cause), operation);
            warn!(operation, status = status.as_u16(), error = %error, "Frappe API error");
            return Err(error);
        }

        ApiPayload::from_body(&text).map_err(|e| {
            FrappeError::InvalidResponse(format!("{} returned non-JSON body: {}", url, e))
        })
    }
}

/// Attach the token and content negotiation headers.
fn authorized(request: RequestBuilder, credentials: &Credentials) -> reqwest::Result<Request> {
    request
        .header(AUTHORIZATION, credentials.authorization_header())
        .header(ACCEPT, "application/json")
        .build()
}

/// Headers as name/value pairs, without credentials or cookies.
fn loggable_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter(|(name, _)| *name != AUTHORIZATION && name.as_str() != "set-cookie")
        .map(|(name, value)| {
            (
                name.to_string(),
                value.to_str().unwrap_or("<binary>").to_string(),
            )
        })
        .collect()
}
