//! HTTP transport seam.
//!
//! Remote clients talk to a [`Transport`], never to `reqwest` directly, so the
//! reconciliation logic can run against an in-memory catalog in tests.

use crate::credentials::BearerToken;
use crate::error::{Result, SyncError};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub use reqwest::{Method, Url};

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Status, reason phrase, and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub reason: String,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            reason: reason_phrase(status).to_string(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| SyncError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

pub trait Transport {
    /// Send one request. `Err` only when no response was received; every
    /// status code, including failures, comes back as a [`RawResponse`].
    fn send(&self, method: Method, url: &str, body: Option<&serde_json::Value>)
        -> Result<RawResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<RawResponse> {
        (**self).send(method, url, body)
    }
}

/// Blocking `reqwest` transport with bearer auth and JSON content type on
/// every request.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(token: &BearerToken, timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
            .map_err(|e| anyhow::anyhow!("access token is not a valid header value: {e}"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build http client: {e}"))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<RawResponse> {
        tracing::debug!(%method, url, "sending request");
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let resp = request.send().map_err(|e| SyncError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let status = resp.status();
        let body = resp.bytes().map_err(|e| SyncError::Transport {
            url: url.to_string(),
            message: format!("failed to read response body: {e}"),
        })?;
        Ok(RawResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            body: body.to_vec(),
        })
    }
}

/// Append `segments` to the path of `base` and `query` as form pairs. Every
/// segment and query value is percent-encoded.
pub fn resource_url<I>(base: &str, segments: I, query: &[(&str, &str)]) -> Result<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let bad_base = |message: String| SyncError::Transport {
        url: base.to_string(),
        message,
    };
    let mut url = Url::parse(base).map_err(|e| bad_base(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| bad_base("base URL cannot carry a path".to_string()))?
        .pop_if_empty()
        .extend(segments);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url.into())
}

fn reason_phrase(status: u16) -> &'static str {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}
