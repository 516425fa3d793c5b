//! HTTP client for the client-management API.
//!
//! One request per call, no retries, no caching. The only thing added to a
//! request is the bearer token when one is supplied.

mod error;

use std::time::Duration;

use anyhow::{Context, Result};
pub use error::{ApiError, ApiErrorKind, ApiResult};
pub use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;

/// Standard User-Agent header for clientdesk API requests.
pub const USER_AGENT: &str = concat!("clientdesk/", env!("CARGO_PKG_VERSION"));

/// A 2xx response with its body decoded.
///
/// Empty bodies decode to `Value::Null`; bodies that are not JSON are kept
/// as `Value::String`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

/// API client bound to one base address.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Creates a client with default transport settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(base_url, reqwest::Client::new())
    }

    pub fn with_http(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Builds a client from config, honoring the base URL override and timeout.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the transport cannot be built.
    pub fn from_config(config: &Config, base_url_override: Option<&str>) -> Result<Self> {
        let base_url = config.effective_base_url(base_url_override)?;
        Self::build(base_url, config.request_timeout())
    }

    /// # Errors
    /// Returns an error if the transport cannot be built.
    pub fn build(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("build HTTP client")?;
        Ok(Self::with_http(base_url, http))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    /// Issues one request.
    ///
    /// # Errors
    /// `HttpStatus` for any non-2xx answer, `Timeout`/`Transport` when no
    /// answer arrived, `Parse` when the body could not be read.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        auth_token: Option<&str>,
    ) -> ApiResult<ApiResponse> {
        let url = self.url(path);
        tracing::debug!(%method, path, authenticated = auth_token.is_some(), "api request");

        let mut builder = self.http.request(method.clone(), &url);
        if let Some(token) = auth_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            let err = ApiError::transport(&e);
            tracing::warn!(%method, path, kind = %err.kind, "api request failed: {err}");
            err
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::parse(format!("Failed to read response body: {e}")))?;

        if !status.is_success() {
            let err = ApiError::http_status(status.as_u16(), &text);
            tracing::warn!(%method, path, status = status.as_u16(), "api request rejected");
            return Err(err);
        }

        tracing::debug!(%method, path, status = status.as_u16(), "api response");
        Ok(ApiResponse {
            status: status.as_u16(),
            body: decode_body(&text),
        })
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn get(&self, path: &str, auth_token: Option<&str>) -> ApiResult<ApiResponse> {
        self.request(Method::GET, path, None, auth_token).await
    }

    /// # Errors
    /// See [`ApiClient::request`]; `Parse` if the body cannot be encoded.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        auth_token: Option<&str>,
    ) -> ApiResult<ApiResponse> {
        let body = encode_body(body)?;
        self.request(Method::POST, path, Some(&body), auth_token)
            .await
    }

    /// # Errors
    /// See [`ApiClient::request`]; `Parse` if the body cannot be encoded.
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        auth_token: Option<&str>,
    ) -> ApiResult<ApiResponse> {
        let body = encode_body(body)?;
        self.request(Method::PUT, path, Some(&body), auth_token)
            .await
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn delete(&self, path: &str, auth_token: Option<&str>) -> ApiResult<ApiResponse> {
        self.request(Method::DELETE, path, None, auth_token).await
    }
}

fn encode_body<B: Serialize + ?Sized>(body: &B) -> ApiResult<Value> {
    serde_json::to_value(body)
        .map_err(|e| ApiError::parse(format!("Failed to encode request body: {e}")))
}

fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
