//! Authenticated HTTP transport shared by the rules clients.
//!
//! Every request carries a bearer token from the configured [`Credential`]
//! and the `X-Client-Version` header. Non-2xx responses become
//! [`TransportError::Status`] with the response body preserved.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info_span, Instrument};

use crate::config::RulesConfig;
use crate::credential::Credential;
use crate::error::{RulesError, RulesResult, TransportError};
use crate::metrics::record_request;

pub const CLIENT_VERSION_HEADER: &str = "x-client-version";

/// Value of the `X-Client-Version` header.
pub const CLIENT_VERSION: &str = concat!("Rust/Admin/", env!("CARGO_PKG_VERSION"));

/// Request body variants.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    /// Sent verbatim as `text/plain`.
    Text(String),
    Json(serde_json::Value),
}

impl RequestBody {
    pub fn json<T: Serialize>(value: &T) -> Result<Self, TransportError> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }
}

/// HTTP transport bound to one base URL.
#[derive(Clone)]
pub struct HttpTransport {
    http: Client,
    base_url: String,
    credential: Arc<dyn Credential>,
}

impl HttpTransport {
    pub fn new(
        base_url: impl Into<String>,
        credential: Arc<dyn Credential>,
        config: &RulesConfig,
    ) -> RulesResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(CLIENT_VERSION_HEADER),
            HeaderValue::from_static(CLIENT_VERSION),
        );

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("fbrules/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| RulesError::config_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            credential,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue one request and return the response body as text.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: RequestBody,
    ) -> Result<String, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        let token = self.credential.access_token().await?;

        let mut request = self.http.request(method.clone(), &url).bearer_auth(token);
        if !query.is_empty() {
            request = request.query(query);
        }
        request = match body {
            RequestBody::Empty => request,
            RequestBody::Text(text) => request
                .header(CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(text),
            RequestBody::Json(value) => request.json(&value),
        };

        debug!(%method, %url, "Sending rules request");
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

/// Decode a successful response body. An empty body decodes as JSON `null`.
pub fn decode_json<T: DeserializeOwned>(body: &str) -> Result<T, serde_json::Error> {
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body)
}

/// Run one rules API call inside a tracing span and record its metrics.
pub(crate) async fn execute_request<T, F>(
    operation: &str,
    resource: &str,
    fut: F,
) -> RulesResult<T>
where
    F: Future<Output = RulesResult<T>>,
{
    let span = info_span!("rules_request", operation = %operation, resource = %resource);

    let start = Instant::now();
    let result = fut.instrument(span).await;
    let latency_ms = start.elapsed().as_millis() as f64;

    let status = match &result {
        Ok(_) => 200,
        // The backend answered 2xx with an unexpected body.
        Err(RulesError::InvalidResponse(_)) => 200,
        Err(e) => e.http_status().unwrap_or(500),
    };
    record_request(operation, status, latency_ms);

    result
}
